//! Process configuration, read once at startup.
//!
//! Only the auth token is optional at this stage: a missing token fails each
//! tool call with a configuration error instead of refusing to start.

use crate::constants::{network, protocols::ALLOWED_HTTP, retry, spec};
use crate::errors::{ConfigError, ToolError};
use crate::services::logger::LogLevel;
use crate::utils::feature_flags::flag_or;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Which upstream service a tool talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    ServiceStage,
    Cae,
    FunctionGraph,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub auth_token: Option<String>,
    pub servicestage_base: String,
    pub cae_base: String,
    pub functiongraph_base: String,
    pub verify_tls: bool,
    pub proxy: Option<String>,
    pub timeout: Duration,
    pub max_retries: usize,
    pub spec_path: Option<PathBuf>,
    /// Path parameter every generated endpoint is scoped under; `None` disables the implicit parameter.
    pub tenant_param: Option<String>,
    pub log_level: LogLevel,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auth_token: None,
            servicestage_base: network::SERVICESTAGE_BASE.to_string(),
            cae_base: network::CAE_BASE.to_string(),
            functiongraph_base: network::FUNCTIONGRAPH_BASE.to_string(),
            verify_tls: true,
            proxy: None,
            timeout: Duration::from_secs(network::TIMEOUT_HTTP_SECS),
            max_retries: retry::MAX_RETRIES,
            spec_path: None,
            tenant_param: Some(spec::DEFAULT_TENANT_PARAM.to_string()),
            log_level: LogLevel::Info,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup so tests never touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Settings::default();

        let timeout = match read("HTTP_TIMEOUT") {
            Some(raw) => {
                let secs = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|secs| secs.is_finite() && *secs > 0.0)
                    .ok_or(ConfigError::InvalidValue {
                        key: "HTTP_TIMEOUT",
                        expected: "a positive number of seconds",
                        value: raw.clone(),
                    })?;
                Duration::from_secs_f64(secs)
            }
            None => defaults.timeout,
        };

        let max_retries = match read("HTTP_MAX_RETRIES") {
            Some(raw) => raw.parse::<usize>().map_err(|_| ConfigError::InvalidValue {
                key: "HTTP_MAX_RETRIES",
                expected: "a non-negative integer",
                value: raw.clone(),
            })?,
            None => defaults.max_retries,
        };

        let tenant_param = match lookup("SS_TENANT_PARAM") {
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) => Some(raw.trim().to_string()),
            None => defaults.tenant_param,
        };

        let settings = Settings {
            auth_token: read("HW_AUTH_TOKEN"),
            servicestage_base: read("SERVICESTAGE_BASE").unwrap_or(defaults.servicestage_base),
            cae_base: read("CAE_BASE").unwrap_or(defaults.cae_base),
            functiongraph_base: read("FG_BASE").unwrap_or(defaults.functiongraph_base),
            verify_tls: flag_or(read("HTTP_VERIFY").as_deref(), true),
            proxy: read("HTTP_PROXY").or_else(|| read("HTTPS_PROXY")),
            timeout,
            max_retries,
            spec_path: read("SS_SPEC_PATH").map(PathBuf::from),
            tenant_param,
            log_level: read("LOG_LEVEL")
                .map(|raw| LogLevel::parse(&raw))
                .unwrap_or(defaults.log_level),
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("SERVICESTAGE_BASE", &self.servicestage_base),
            ("CAE_BASE", &self.cae_base),
            ("FG_BASE", &self.functiongraph_base),
        ] {
            let parsed = Url::parse(value).map_err(|_| ConfigError::InvalidUrl {
                key,
                value: value.clone(),
            })?;
            let scheme = format!("{}:", parsed.scheme());
            if !ALLOWED_HTTP.contains(&scheme.as_str()) {
                return Err(ConfigError::InvalidUrl {
                    key,
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn base_url(&self, backend: Backend) -> &str {
        match backend {
            Backend::ServiceStage => &self.servicestage_base,
            Backend::Cae => &self.cae_base,
            Backend::FunctionGraph => &self.functiongraph_base,
        }
    }

    /// The token is checked per call, so a server started without it still lists tools.
    pub fn auth_token(&self) -> Result<&str, ToolError> {
        self.auth_token.as_deref().ok_or_else(|| {
            ToolError::configuration("HW_AUTH_TOKEN is not set")
                .with_hint("Export HW_AUTH_TOKEN with a valid IAM token and restart the server.")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_env_is_empty() {
        let settings = Settings::from_lookup(lookup(&[])).expect("settings");
        assert!(settings.auth_token.is_none());
        assert!(settings.verify_tls);
        assert_eq!(settings.timeout, Duration::from_secs(60));
        assert_eq!(settings.max_retries, 2);
        assert_eq!(settings.tenant_param.as_deref(), Some("project_id"));
        assert_eq!(
            settings.base_url(Backend::Cae),
            "https://cae.cn-north-4.myhuaweicloud.com"
        );
    }

    #[test]
    fn env_overrides_are_applied() {
        let settings = Settings::from_lookup(lookup(&[
            ("HW_AUTH_TOKEN", "tok"),
            ("HTTP_VERIFY", "false"),
            ("HTTPS_PROXY", "http://proxy:3128"),
            ("HTTP_TIMEOUT", "5"),
            ("SS_SPEC_PATH", "/tmp/api.yaml"),
            ("SS_TENANT_PARAM", ""),
            ("FG_BASE", "http://localhost:9000"),
        ]))
        .expect("settings");
        assert_eq!(settings.auth_token().expect("token"), "tok");
        assert!(!settings.verify_tls);
        assert_eq!(settings.proxy.as_deref(), Some("http://proxy:3128"));
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert_eq!(settings.spec_path, Some(PathBuf::from("/tmp/api.yaml")));
        assert!(settings.tenant_param.is_none());
        assert_eq!(
            settings.base_url(Backend::FunctionGraph),
            "http://localhost:9000"
        );
    }

    #[test]
    fn invalid_timeout_and_base_url_fail() {
        assert!(Settings::from_lookup(lookup(&[("HTTP_TIMEOUT", "soon")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("CAE_BASE", "ftp://cae")])).is_err());
    }

    #[test]
    fn missing_token_is_a_configuration_error() {
        let settings = Settings::default();
        let err = settings.auth_token().expect_err("no token");
        assert_eq!(err.kind, crate::errors::ToolErrorKind::Configuration);
    }
}

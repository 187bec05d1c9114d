use thiserror::Error;

/// Startup configuration that cannot be used as given.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be {expected}, got {value:?}")]
    InvalidValue {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("{key} is not a valid http(s) URL: {value}")]
    InvalidUrl { key: &'static str, value: String },
}

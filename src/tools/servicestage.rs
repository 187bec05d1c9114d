//! Hand-written ServiceStage environment tools, including the
//! create-environment-with-RDS flow.

use crate::config::Backend;
use crate::constants::poll;
use crate::errors::ToolError;
use crate::http::poll::{mentions_success, poll_until};
use crate::http::result::{is_error_payload, RequestResult};
use crate::mcp::catalog::ToolDef;
use crate::services::validation::Validation;
use crate::tools::context::ToolContext;
use crate::tools::OpsManager;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use std::time::Duration;

const ENVIRONMENTS: &str = "/v3/{project_id}/cas/environments";
const IAC_RESOURCES: &str = "/v3/{project_id}/cas/environments/{environment_id}/iac-resources";
const PROVISION: &str = "/v3/{project_id}/cas/environments/{environment_id}/iac-resources/provision";
const PROVISION_EVENTS: &str =
    "/v3/{project_id}/cas/environments/{environment_id}/iac-resources/latest-provision/events";
const RECORDS: &str = "/v3/{project_id}/cas/environments/{environment_id}/records";
const ROLLBACK: &str = "/v3/{project_id}/cas/environments/{environment_id}/rollback";
const EXPORT: &str = "/v3/{project_id}/cas/environments/{environment_id}/export";

const DEFAULT_RDS_FLAVOR: &str = "db.m1.small";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SnapshotAction {
    ListRecords,
    Rollback,
    Export,
}

impl SnapshotAction {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "list_records" => Some(Self::ListRecords),
            "rollback" => Some(Self::Rollback),
            "export" => Some(Self::Export),
            _ => None,
        }
    }
}

pub struct ServiceStageManager {
    ctx: ToolContext,
    validation: Validation,
    provision_interval: Duration,
    provision_timeout: Duration,
}

impl ServiceStageManager {
    pub fn new(ctx: ToolContext) -> Self {
        Self {
            ctx,
            validation: Validation::new(),
            provision_interval: Duration::from_millis(poll::PROVISION_INTERVAL_MS),
            provision_timeout: Duration::from_millis(poll::PROVISION_TIMEOUT_MS),
        }
    }

    pub fn with_provision_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.provision_interval = interval;
        self.provision_timeout = timeout;
        self
    }

    fn env_url(&self, template: &str, project_id: &str, environment_id: &str) -> Result<String, ToolError> {
        self.ctx.url(
            Backend::ServiceStage,
            template,
            &[
                ("project_id", project_id.to_string()),
                ("environment_id", environment_id.to_string()),
            ],
        )
    }

    pub async fn list_environments(&self, args: &Value) -> Result<Value, ToolError> {
        let project_id = self.validation.ensure_string(args, "project_id")?;
        let mut query = Vec::new();
        if let Some(name) = self.validation.optional_string(args, "name")? {
            query.push(("name".to_string(), name));
        }
        query.push((
            "limit".to_string(),
            self.validation.integer_or(args, "limit", 100)?.to_string(),
        ));
        query.push((
            "offset".to_string(),
            self.validation.integer_or(args, "offset", 0)?.to_string(),
        ));
        let url = self.ctx.url(
            Backend::ServiceStage,
            ENVIRONMENTS,
            &[("project_id", project_id)],
        )?;
        self.ctx.get(url, query).await
    }

    pub async fn create_environment(
        &self,
        project_id: &str,
        name: &str,
        cluster_id: &str,
        description: &str,
    ) -> Result<Value, ToolError> {
        let url = self.ctx.url(
            Backend::ServiceStage,
            ENVIRONMENTS,
            &[("project_id", project_id.to_string())],
        )?;
        let body = json!({
            "name": name,
            "description": description,
            "type": "cce",
            "cluster_id": cluster_id,
        });
        self.ctx.send_json(Method::POST, url, body).await
    }

    pub async fn add_env_resource(
        &self,
        project_id: &str,
        environment_id: &str,
        kind: &str,
        spec: Value,
    ) -> Result<Value, ToolError> {
        let url = self.env_url(IAC_RESOURCES, project_id, environment_id)?;
        self.ctx
            .send_json(Method::POST, url, json!({"kind": kind, "spec": spec}))
            .await
    }

    pub async fn provision(&self, project_id: &str, environment_id: &str) -> Result<Value, ToolError> {
        let url = self.env_url(PROVISION, project_id, environment_id)?;
        self.ctx.post_empty(url).await
    }

    pub async fn provision_logs(&self, project_id: &str, environment_id: &str) -> Result<Value, ToolError> {
        let url = self.env_url(PROVISION_EVENTS, project_id, environment_id)?;
        self.ctx.get(url, Vec::new()).await
    }

    async fn snapshot(
        &self,
        project_id: &str,
        environment_id: &str,
        action: &str,
        record_id: Option<String>,
        template_uri: Option<String>,
    ) -> Result<Value, ToolError> {
        let Some(parsed) = SnapshotAction::parse(action) else {
            return Ok(RequestResult::error(
                400,
                json!({"message": format!("unknown action: {}", action)}),
            )
            .into_payload());
        };
        match parsed {
            SnapshotAction::ListRecords => {
                let url = self.env_url(RECORDS, project_id, environment_id)?;
                self.ctx.get(url, Vec::new()).await
            }
            SnapshotAction::Rollback => {
                let url = self.env_url(ROLLBACK, project_id, environment_id)?;
                let body = json!({"record_id": record_id.unwrap_or_default()});
                self.ctx.send_json(Method::POST, url, body).await
            }
            SnapshotAction::Export => {
                let url = self.env_url(EXPORT, project_id, environment_id)?;
                let body = match template_uri {
                    Some(uri) => json!({"template_uri": uri}),
                    None => json!({}),
                };
                self.ctx.send_json(Method::POST, url, body).await
            }
        }
    }

    /// Create environment, add an RDS resource, provision, then wait for the
    /// provision events to report success. Stops at the first error payload.
    pub async fn create_env_with_rds(&self, args: &Value) -> Result<Value, ToolError> {
        let project_id = self.validation.ensure_string(args, "project_id")?;
        let env_name = self.validation.ensure_string(args, "env_name")?;
        let cluster_id = self.validation.ensure_string(args, "cluster_id")?;
        let rds_flavor = self
            .validation
            .optional_string(args, "rds_flavor")?
            .unwrap_or_else(|| DEFAULT_RDS_FLAVOR.to_string());
        let logger = self.ctx.logger.child("ss_create_env_with_rds");

        let env = self
            .create_environment(&project_id, &env_name, &cluster_id, "")
            .await?;
        if is_error_payload(&env) {
            return Ok(env);
        }
        let Some(environment_id) = environment_id_of(&env) else {
            return Ok(RequestResult::error(
                500,
                json!({"message": "missing environment id", "raw": env}),
            )
            .into_payload());
        };
        logger.info(
            "Environment created",
            Some(&json!({"environment_id": environment_id})),
        );

        let rds_spec = json!({"engine": "MySQL", "flavor": rds_flavor});
        let add_resource = self
            .add_env_resource(&project_id, &environment_id, "rds", rds_spec)
            .await?;
        if is_error_payload(&add_resource) {
            return Ok(add_resource);
        }

        let provision = self.provision(&project_id, &environment_id).await?;
        if is_error_payload(&provision) {
            return Ok(provision);
        }

        logger.debug(
            "Waiting for provisioning",
            Some(&json!({
                "interval_ms": self.provision_interval.as_millis() as u64,
                "timeout_ms": self.provision_timeout.as_millis() as u64,
            })),
        );
        let logs = poll_until(
            || self.provision_logs(&project_id, &environment_id),
            self.provision_interval,
            self.provision_timeout,
            mentions_success,
        )
        .await?;

        Ok(json!({
            "environment_id": environment_id,
            "add_resource": add_resource,
            "provision": provision,
            "logs": logs,
        }))
    }

    pub fn tool_defs() -> Vec<ToolDef> {
        let project_id = json!({"type": "string", "description": "Project id"});
        let environment_id = json!({"type": "string", "description": "Environment id"});
        vec![
            ToolDef::new(
                "ss_list_environments",
                "List ServiceStage environments, optionally filtered by name.",
                json!({
                    "type": "object",
                    "properties": {
                        "project_id": project_id,
                        "name": {"type": "string"},
                        "limit": {"type": "integer", "minimum": 0, "default": 100},
                        "offset": {"type": "integer", "minimum": 0, "default": 0}
                    },
                    "required": ["project_id"],
                    "additionalProperties": false
                }),
            ),
            ToolDef::new(
                "ss_create_environment",
                "Create a CCE-backed environment bound to an existing cluster.",
                json!({
                    "type": "object",
                    "properties": {
                        "project_id": project_id,
                        "environment_name": {"type": "string"},
                        "cluster_id": {"type": "string"},
                        "description": {"type": "string"}
                    },
                    "required": ["project_id", "environment_name", "cluster_id"],
                    "additionalProperties": false
                }),
            ),
            ToolDef::new(
                "ss_add_env_resource",
                "Add an IaC resource (rds, dcs, cce-cluster, ...) to an environment.",
                json!({
                    "type": "object",
                    "properties": {
                        "project_id": project_id,
                        "environment_id": environment_id,
                        "resource_kind": {"type": "string"},
                        "spec": {"type": "object"}
                    },
                    "required": ["project_id", "environment_id", "resource_kind", "spec"],
                    "additionalProperties": false
                }),
            ),
            ToolDef::new(
                "ss_provision_env_resources",
                "Provision the resources declared in an environment.",
                env_scoped_schema(&project_id, &environment_id),
            ),
            ToolDef::new(
                "ss_get_env_provision_logs",
                "Events of the latest provisioning run of an environment.",
                env_scoped_schema(&project_id, &environment_id),
            ),
            ToolDef::new(
                "ss_snapshot_and_rollback",
                "Environment records: action list_records, rollback (record_id) or export (template_uri).",
                json!({
                    "type": "object",
                    "properties": {
                        "project_id": project_id,
                        "environment_id": environment_id,
                        "action": {"type": "string", "description": "list_records | rollback | export"},
                        "record_id": {"type": "string"},
                        "template_uri": {"type": "string"}
                    },
                    "required": ["project_id", "environment_id", "action"],
                    "additionalProperties": false
                }),
            ),
            ToolDef::new(
                "ss_rollback_env",
                "Roll an environment back to a deployment record.",
                json!({
                    "type": "object",
                    "properties": {
                        "project_id": project_id,
                        "environment_id": environment_id,
                        "record_id": {"type": "string"}
                    },
                    "required": ["project_id", "environment_id", "record_id"],
                    "additionalProperties": false
                }),
            ),
            ToolDef::new(
                "ss_create_env_with_rds",
                "Create an environment, add an RDS instance, provision it and wait for success.",
                json!({
                    "type": "object",
                    "properties": {
                        "project_id": project_id,
                        "env_name": {"type": "string"},
                        "cluster_id": {"type": "string"},
                        "rds_flavor": {"type": "string", "default": DEFAULT_RDS_FLAVOR}
                    },
                    "required": ["project_id", "env_name", "cluster_id"],
                    "additionalProperties": false
                }),
            ),
        ]
    }
}

fn env_scoped_schema(project_id: &Value, environment_id: &Value) -> Value {
    json!({
        "type": "object",
        "properties": {"project_id": project_id, "environment_id": environment_id},
        "required": ["project_id", "environment_id"],
        "additionalProperties": false
    })
}

fn environment_id_of(env: &Value) -> Option<String> {
    ["id", "environment_id"]
        .iter()
        .filter_map(|key| env.get(*key).and_then(Value::as_str))
        .find(|id| !id.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl OpsManager for ServiceStageManager {
    async fn call(&self, tool: &str, args: Value) -> Result<Value, ToolError> {
        let v = &self.validation;
        match tool {
            "ss_list_environments" => self.list_environments(&args).await,
            "ss_create_environment" => {
                let description = v.optional_string(&args, "description")?.unwrap_or_default();
                self.create_environment(
                    &v.ensure_string(&args, "project_id")?,
                    &v.ensure_string(&args, "environment_name")?,
                    &v.ensure_string(&args, "cluster_id")?,
                    &description,
                )
                .await
            }
            "ss_add_env_resource" => {
                let spec = Value::Object(v.ensure_object(&args, "spec")?);
                self.add_env_resource(
                    &v.ensure_string(&args, "project_id")?,
                    &v.ensure_string(&args, "environment_id")?,
                    &v.ensure_string(&args, "resource_kind")?,
                    spec,
                )
                .await
            }
            "ss_provision_env_resources" => {
                self.provision(
                    &v.ensure_string(&args, "project_id")?,
                    &v.ensure_string(&args, "environment_id")?,
                )
                .await
            }
            "ss_get_env_provision_logs" => {
                self.provision_logs(
                    &v.ensure_string(&args, "project_id")?,
                    &v.ensure_string(&args, "environment_id")?,
                )
                .await
            }
            "ss_snapshot_and_rollback" => {
                let action = args
                    .get("action")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                self.snapshot(
                    &v.ensure_string(&args, "project_id")?,
                    &v.ensure_string(&args, "environment_id")?,
                    &action,
                    v.optional_string(&args, "record_id")?,
                    v.optional_string(&args, "template_uri")?,
                )
                .await
            }
            "ss_rollback_env" => {
                self.snapshot(
                    &v.ensure_string(&args, "project_id")?,
                    &v.ensure_string(&args, "environment_id")?,
                    "rollback",
                    Some(v.ensure_string(&args, "record_id")?),
                    None,
                )
                .await
            }
            "ss_create_env_with_rds" => self.create_env_with_rds(&args).await,
            other => Err(ToolError::not_found(format!("Unknown ServiceStage tool: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_id_prefers_id_then_environment_id() {
        assert_eq!(environment_id_of(&json!({"id": "a", "environment_id": "b"})).as_deref(), Some("a"));
        assert_eq!(environment_id_of(&json!({"id": "", "environment_id": "b"})).as_deref(), Some("b"));
        assert_eq!(environment_id_of(&json!({"name": "x"})), None);
    }

    #[test]
    fn snapshot_actions_parse() {
        assert_eq!(SnapshotAction::parse("export"), Some(SnapshotAction::Export));
        assert_eq!(SnapshotAction::parse("Export"), None);
    }

    #[test]
    fn every_definition_has_an_object_schema() {
        for def in ServiceStageManager::tool_defs() {
            assert_eq!(def.input_schema["type"], "object", "{}", def.name);
        }
    }
}

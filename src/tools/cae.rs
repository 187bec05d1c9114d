use crate::config::Backend;
use crate::constants::headers::ENVIRONMENT_ID;
use crate::errors::ToolError;
use crate::http::OutgoingRequest;
use crate::mcp::catalog::ToolDef;
use crate::services::validation::Validation;
use crate::tools::context::ToolContext;
use crate::tools::OpsManager;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};

const APPLICATIONS: &str = "/v1/{project_id}/cae/applications";
const COMPONENTS: &str = "/v1/{project_id}/cae/applications/{application_id}/components";
const COMPONENT: &str =
    "/v1/{project_id}/cae/applications/{application_id}/components/{component_id}";

/// Cloud Application Engine: applications and their components.
pub struct CaeManager {
    ctx: ToolContext,
    validation: Validation,
}

impl CaeManager {
    pub fn new(ctx: ToolContext) -> Self {
        Self {
            ctx,
            validation: Validation::new(),
        }
    }

    async fn create_application(&self, args: &Value) -> Result<Value, ToolError> {
        let v = &self.validation;
        let project_id = v.ensure_string(args, "project_id")?;
        let environment_id = v.ensure_string(args, "environment_id")?;
        let app_name = v.ensure_string(args, "app_name")?;
        let description = v.optional_string(args, "description")?.unwrap_or_default();

        let url = self.ctx.url(Backend::Cae, APPLICATIONS, &[("project_id", project_id)])?;
        let headers = self
            .ctx
            .headers_with(true, &[(ENVIRONMENT_ID, environment_id.as_str())])?;
        let body = json!({
            "apiVersion": "v1",
            "kind": "Application",
            "metadata": {"name": app_name, "annotations": {"description": description}},
        });
        Ok(self
            .ctx
            .call(OutgoingRequest::new(Method::POST, url, headers).with_body(Some(body)))
            .await)
    }

    async fn create_component(&self, args: &Value) -> Result<Value, ToolError> {
        let v = &self.validation;
        let project_id = v.ensure_string(args, "project_id")?;
        let application_id = v.ensure_string(args, "application_id")?;
        let comp_name = v.ensure_string(args, "comp_name")?;
        let image = v.ensure_string(args, "image")?;
        let replicas = v.integer_or(args, "replicas", 1)?;

        let url = self.ctx.url(
            Backend::Cae,
            COMPONENTS,
            &[("project_id", project_id), ("application_id", application_id)],
        )?;
        let body = json!({
            "apiVersion": "v1",
            "kind": "Component",
            "metadata": {"name": comp_name},
            "spec": {
                "replicas": replicas,
                "template": {"containers": [{"name": comp_name, "image": image}]},
            },
        });
        self.ctx.send_json(Method::POST, url, body).await
    }

    async fn scale_component(&self, args: &Value) -> Result<Value, ToolError> {
        let v = &self.validation;
        let url = self.ctx.url(
            Backend::Cae,
            COMPONENT,
            &[
                ("project_id", v.ensure_string(args, "project_id")?),
                ("application_id", v.ensure_string(args, "application_id")?),
                ("component_id", v.ensure_string(args, "component_id")?),
            ],
        )?;
        let replicas = v.ensure_integer(args, "replicas")?;
        self.ctx
            .send_json(Method::PUT, url, json!({"spec": {"replicas": replicas}}))
            .await
    }

    pub fn tool_defs() -> Vec<ToolDef> {
        vec![
            ToolDef::new(
                "cae_create_application",
                "Create a CAE application in an environment.",
                json!({
                    "type": "object",
                    "properties": {
                        "project_id": {"type": "string"},
                        "environment_id": {"type": "string", "description": "Sent as X-Environment-ID"},
                        "app_name": {"type": "string"},
                        "description": {"type": "string"}
                    },
                    "required": ["project_id", "environment_id", "app_name"],
                    "additionalProperties": false
                }),
            ),
            ToolDef::new(
                "cae_create_component",
                "Create a container component under a CAE application.",
                json!({
                    "type": "object",
                    "properties": {
                        "project_id": {"type": "string"},
                        "application_id": {"type": "string"},
                        "comp_name": {"type": "string"},
                        "image": {"type": "string"},
                        "replicas": {"type": "integer", "minimum": 0, "default": 1}
                    },
                    "required": ["project_id", "application_id", "comp_name", "image"],
                    "additionalProperties": false
                }),
            ),
            ToolDef::new(
                "cae_scale_component",
                "Set the replica count of a CAE component.",
                json!({
                    "type": "object",
                    "properties": {
                        "project_id": {"type": "string"},
                        "application_id": {"type": "string"},
                        "component_id": {"type": "string"},
                        "replicas": {"type": "integer", "minimum": 0}
                    },
                    "required": ["project_id", "application_id", "component_id", "replicas"],
                    "additionalProperties": false
                }),
            ),
        ]
    }
}

#[async_trait]
impl OpsManager for CaeManager {
    async fn call(&self, tool: &str, args: Value) -> Result<Value, ToolError> {
        match tool {
            "cae_create_application" => self.create_application(&args).await,
            "cae_create_component" => self.create_component(&args).await,
            "cae_scale_component" => self.scale_component(&args).await,
            other => Err(ToolError::not_found(format!("Unknown CAE tool: {}", other))),
        }
    }
}

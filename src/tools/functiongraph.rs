use crate::config::Backend;
use crate::errors::ToolError;
use crate::mcp::catalog::ToolDef;
use crate::services::validation::Validation;
use crate::tools::context::ToolContext;
use crate::tools::OpsManager;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};

const FUNCTIONS: &str = "/v2/{project_id}/fgs/functions";
const INVOKE_SYNC: &str = "/v2/{project_id}/fgs/functions/{function_urn}/invocations";
const INVOKE_ASYNC: &str = "/v2/{project_id}/fgs/functions/{function_urn}/invocations-async";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeSource {
    Inline,
    Obs,
}

impl CodeSource {
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("obs") => Self::Obs,
            _ => Self::Inline,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Obs => "obs",
        }
    }
}

pub struct FunctionGraphManager {
    ctx: ToolContext,
    validation: Validation,
}

impl FunctionGraphManager {
    pub fn new(ctx: ToolContext) -> Self {
        Self {
            ctx,
            validation: Validation::new(),
        }
    }

    async fn create_function(&self, args: &Value) -> Result<Value, ToolError> {
        let v = &self.validation;
        let url = self.ctx.url(
            Backend::FunctionGraph,
            FUNCTIONS,
            &[("project_id", v.ensure_string(args, "project_id")?)],
        )?;
        let source = CodeSource::parse(args.get("code_type").and_then(Value::as_str));
        let code = args
            .get("code")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let body = function_body(
            v.ensure_string(args, "func_name")?,
            v.ensure_string(args, "runtime")?,
            v.ensure_string(args, "handler")?,
            source,
            code,
            v.integer_or(args, "memory_size", 256)?,
            v.integer_or(args, "timeout", 30)?,
            v.optional_string(args, "package")?
                .unwrap_or_else(|| "default".to_string()),
        );
        self.ctx.send_json(Method::POST, url, body).await
    }

    async fn invoke(&self, args: &Value) -> Result<Value, ToolError> {
        let v = &self.validation;
        let template = if v.bool_or(args, "async_invoke", false)? {
            INVOKE_ASYNC
        } else {
            INVOKE_SYNC
        };
        let url = self.ctx.url(
            Backend::FunctionGraph,
            template,
            &[
                ("project_id", v.ensure_string(args, "project_id")?),
                ("function_urn", v.ensure_string(args, "function_urn")?),
            ],
        )?;
        let payload = args.get("payload").cloned().unwrap_or_else(|| json!({}));
        self.ctx
            .send_json(Method::POST, url, json!({"body": payload}))
            .await
    }

    pub fn tool_defs() -> Vec<ToolDef> {
        vec![
            ToolDef::new(
                "fg_create_function",
                "Create a FunctionGraph function from inline code or an OBS package URL.",
                json!({
                    "type": "object",
                    "properties": {
                        "project_id": {"type": "string"},
                        "func_name": {"type": "string"},
                        "runtime": {"type": "string", "description": "e.g. Python3.9, Node.js16.17"},
                        "handler": {"type": "string", "description": "e.g. index.handler"},
                        "code_type": {"type": "string", "enum": ["inline", "obs"], "default": "inline"},
                        "code": {"type": "string", "description": "Source for inline, OBS URL for obs"},
                        "memory_size": {"type": "integer", "minimum": 1, "default": 256},
                        "timeout": {"type": "integer", "minimum": 1, "default": 30},
                        "package": {"type": "string", "default": "default"}
                    },
                    "required": ["project_id", "func_name", "runtime", "handler"],
                    "additionalProperties": false
                }),
            ),
            ToolDef::new(
                "fg_invoke",
                "Invoke a FunctionGraph function synchronously or asynchronously.",
                json!({
                    "type": "object",
                    "properties": {
                        "project_id": {"type": "string"},
                        "function_urn": {"type": "string"},
                        "payload": {"type": "object"},
                        "async_invoke": {"type": "boolean", "default": false}
                    },
                    "required": ["project_id", "function_urn", "payload"],
                    "additionalProperties": false
                }),
            ),
        ]
    }
}

#[allow(clippy::too_many_arguments)]
fn function_body(
    func_name: String,
    runtime: String,
    handler: String,
    source: CodeSource,
    code: String,
    memory_size: u64,
    timeout: u64,
    package: String,
) -> Value {
    let mut body = json!({
        "func_name": func_name,
        "runtime": runtime,
        "handler": handler,
        "memory_size": memory_size,
        "timeout": timeout,
        "package": package,
        "code_type": source.as_str(),
    });
    if let Some(map) = body.as_object_mut() {
        match source {
            CodeSource::Inline => {
                map.insert(
                    "func_code".to_string(),
                    json!({"file": "index.zip", "link": "", "code": code}),
                );
            }
            CodeSource::Obs => {
                map.insert("code_url".to_string(), Value::String(code));
            }
        }
    }
    body
}

#[async_trait]
impl OpsManager for FunctionGraphManager {
    async fn call(&self, tool: &str, args: Value) -> Result<Value, ToolError> {
        match tool {
            "fg_create_function" => self.create_function(&args).await,
            "fg_invoke" => self.invoke(&args).await,
            other => Err(ToolError::not_found(format!("Unknown FunctionGraph tool: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_code_is_wrapped_in_func_code() {
        let body = function_body(
            "f".into(),
            "Python3.9".into(),
            "index.handler".into(),
            CodeSource::Inline,
            "def handler(e, c): return 1".into(),
            256,
            30,
            "default".into(),
        );
        assert_eq!(body["code_type"], "inline");
        assert_eq!(body["func_code"]["file"], "index.zip");
        assert!(body.get("code_url").is_none());
    }

    #[test]
    fn obs_code_becomes_code_url() {
        let body = function_body(
            "f".into(),
            "Node.js16.17".into(),
            "index.handler".into(),
            CodeSource::parse(Some("obs")),
            "https://bucket.obs.example.com/f.zip".into(),
            128,
            10,
            "default".into(),
        );
        assert_eq!(body["code_type"], "obs");
        assert_eq!(body["code_url"], "https://bucket.obs.example.com/f.zip");
        assert!(body.get("func_code").is_none());
    }
}

use crate::config::Backend;
use crate::errors::ToolError;
use crate::mcp::catalog::ToolDef;
use crate::openapi::GeneratedTool;
use crate::services::tool_executor::ToolHandler;
use crate::tools::context::ToolContext;
use async_trait::async_trait;
use serde_json::Value;

/// A tool derived from the API document; requests go to the ServiceStage base URL.
pub struct OpenApiTool {
    tool: GeneratedTool,
    ctx: ToolContext,
}

impl OpenApiTool {
    pub fn new(tool: GeneratedTool, ctx: ToolContext) -> Self {
        Self { tool, ctx }
    }

    pub fn definition(&self) -> ToolDef {
        ToolDef::new(&self.tool.name, &self.tool.description, self.tool.input_schema())
    }
}

#[async_trait]
impl ToolHandler for OpenApiTool {
    async fn handle(&self, args: Value) -> Result<Value, ToolError> {
        let token = self.ctx.settings.auth_token()?;
        let base = self.ctx.settings.base_url(Backend::ServiceStage);
        let request = self.tool.prepare(base, &args, token)?;
        Ok(self.ctx.call(request).await)
    }
}

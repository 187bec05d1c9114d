//! Tool handlers: generated OpenAPI tools plus the hand-written ServiceStage,
//! CAE and FunctionGraph operations.

pub mod cae;
pub mod context;
pub mod functiongraph;
pub mod generated;
pub mod servicestage;

use crate::errors::ToolError;
use crate::services::tool_executor::ToolHandler;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub use cae::CaeManager;
pub use context::ToolContext;
pub use functiongraph::FunctionGraphManager;
pub use generated::OpenApiTool;
pub use servicestage::ServiceStageManager;

/// A manager serving several named tools.
#[async_trait]
pub trait OpsManager: Send + Sync {
    async fn call(&self, tool: &str, args: Value) -> Result<Value, ToolError>;
}

/// Binds one tool name of a manager to the [`ToolHandler`] interface.
pub struct ManagedTool {
    name: String,
    manager: Arc<dyn OpsManager>,
}

impl ManagedTool {
    pub fn new(name: impl Into<String>, manager: Arc<dyn OpsManager>) -> Self {
        Self {
            name: name.into(),
            manager,
        }
    }
}

#[async_trait]
impl ToolHandler for ManagedTool {
    async fn handle(&self, args: Value) -> Result<Value, ToolError> {
        self.manager.call(&self.name, args).await
    }
}

mod config_error;
mod mcp_error;
mod spec_error;
mod tool_error;

pub use config_error::ConfigError;
pub use mcp_error::{ErrorCode, McpError};
pub use spec_error::SpecError;
pub use tool_error::{ToolError, ToolErrorKind};

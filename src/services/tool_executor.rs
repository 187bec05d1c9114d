use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::errors::ToolError;
use crate::http::result::is_error_payload;
use crate::mcp::catalog::ToolCatalog;
use crate::services::logger::Logger;
use crate::utils::suggest::suggest;

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, args: Value) -> Result<Value, ToolError>;
}

/// Name to handler registry plus the catalog describing each handler.
#[derive(Clone)]
pub struct ToolExecutor {
    logger: Logger,
    catalog: Arc<ToolCatalog>,
    handlers: Arc<HashMap<String, Arc<dyn ToolHandler>>>,
}

impl ToolExecutor {
    pub fn new(
        logger: Logger,
        catalog: ToolCatalog,
        handlers: HashMap<String, Arc<dyn ToolHandler>>,
    ) -> Result<Self, ToolError> {
        let mut missing: Vec<String> = catalog
            .names()
            .into_iter()
            .filter(|name| !handlers.contains_key(name))
            .collect();
        if !missing.is_empty() {
            missing.sort();
            return Err(ToolError::internal("Tool wiring is incomplete")
                .with_details(json!({ "missing_tools": missing })));
        }
        Ok(Self {
            logger: logger.child("executor"),
            catalog: Arc::new(catalog),
            handlers: Arc::new(handlers),
        })
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Runs a tool whose arguments were already validated against its schema.
    pub async fn execute(&self, tool: &str, args: Value) -> Result<Value, ToolError> {
        let Some(handler) = self.handlers.get(tool).cloned() else {
            let known: Vec<String> = self.handlers.keys().cloned().collect();
            let suggestions = suggest(tool, &known, 3);
            let mut err = ToolError::not_found(format!("Unknown tool: {}", tool));
            if !suggestions.is_empty() {
                err = err.with_hint(format!("Did you mean: {}?", suggestions.join(", ")));
            }
            return Err(err);
        };

        let trace_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();
        self.logger.debug(
            "Tool call started",
            Some(&json!({ "tool": tool, "trace_id": trace_id })),
        );

        let result = handler.handle(args).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(payload) => {
                let upstream_error = is_error_payload(payload);
                let meta = json!({
                    "tool": tool,
                    "trace_id": trace_id,
                    "duration_ms": duration_ms,
                    "status_code": payload.get("status_code").filter(|_| upstream_error),
                });
                if upstream_error {
                    self.logger.warn("Tool call returned an error payload", Some(&meta));
                } else {
                    self.logger.info("Tool call finished", Some(&meta));
                }
            }
            Err(err) => self.logger.warn(
                "Tool call failed",
                Some(&json!({
                    "tool": tool,
                    "trace_id": trace_id,
                    "duration_ms": duration_ms,
                    "kind": err.kind,
                    "message": err.message,
                })),
            ),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::catalog::ToolDef;

    struct Echo;

    #[async_trait]
    impl ToolHandler for Echo {
        async fn handle(&self, args: Value) -> Result<Value, ToolError> {
            Ok(args)
        }
    }

    fn executor() -> ToolExecutor {
        let mut catalog = ToolCatalog::new();
        catalog
            .register(ToolDef::new("echo", "Echo", json!({"type": "object"})))
            .expect("register");
        let mut handlers: HashMap<String, Arc<dyn ToolHandler>> = HashMap::new();
        handlers.insert("echo".to_string(), Arc::new(Echo));
        ToolExecutor::new(Logger::new("test"), catalog, handlers).expect("executor")
    }

    #[tokio::test]
    async fn dispatches_by_name() {
        let out = executor().execute("echo", json!({"a": 1})).await.expect("ok");
        assert_eq!(out, json!({"a": 1}));
    }

    #[tokio::test]
    async fn unknown_tool_suggests_close_names() {
        let err = executor().execute("ecko", json!({})).await.expect_err("unknown");
        assert_eq!(err.kind, crate::errors::ToolErrorKind::NotFound);
        assert_eq!(err.hint.as_deref(), Some("Did you mean: echo?"));
    }

    #[test]
    fn catalog_entries_without_handlers_are_rejected() {
        let mut catalog = ToolCatalog::new();
        catalog
            .register(ToolDef::new("orphan", "x", json!({"type": "object"})))
            .expect("register");
        let err = ToolExecutor::new(Logger::new("test"), catalog, HashMap::new())
            .err()
            .expect("wiring error");
        assert_eq!(err.details, Some(json!({"missing_tools": ["orphan"]})));
    }
}

use crate::config::Settings;
use crate::errors::ToolError;
use crate::http::{HttpClient, HttpTransport, ReqwestTransport};
use crate::mcp::catalog::{ToolCatalog, ToolDef};
use crate::openapi::{extract_operations, generate_tools, ApiDocument, GeneratorOptions};
use crate::services::logger::Logger;
use crate::services::tool_executor::{ToolExecutor, ToolHandler};
use crate::tools::{
    CaeManager, FunctionGraphManager, ManagedTool, OpenApiTool, OpsManager, ServiceStageManager,
    ToolContext,
};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Everything a running server needs, wired once at startup.
pub struct App {
    pub settings: Arc<Settings>,
    pub logger: Logger,
    pub http: Arc<HttpClient>,
    pub tool_executor: Arc<ToolExecutor>,
}

struct Registry {
    catalog: ToolCatalog,
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl Registry {
    fn new() -> Self {
        Self {
            catalog: ToolCatalog::new(),
            handlers: HashMap::new(),
        }
    }

    fn add(&mut self, def: ToolDef, handler: Arc<dyn ToolHandler>) -> Result<(), ToolError> {
        let name = def.name.clone();
        self.catalog.register(def)?;
        self.handlers.insert(name, handler);
        Ok(())
    }

    fn add_managed(&mut self, defs: Vec<ToolDef>, manager: Arc<dyn OpsManager>) -> Result<(), ToolError> {
        for def in defs {
            let handler = Arc::new(ManagedTool::new(def.name.clone(), manager.clone()));
            self.add(def, handler)?;
        }
        Ok(())
    }
}

impl App {
    pub fn initialize(settings: Settings) -> Result<Self, ToolError> {
        let transport = Arc::new(ReqwestTransport::new(&settings)?);
        Self::with_transport(settings, transport)
    }

    /// Same wiring as [`App::initialize`] over an arbitrary transport.
    pub fn with_transport(
        settings: Settings,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ToolError> {
        let logger = Logger::with_level("servicestage", settings.log_level);
        let settings = Arc::new(settings);

        let document = match settings.spec_path.as_deref() {
            Some(path) => ApiDocument::load(path)?,
            None => ApiDocument::bundled()?,
        };
        let operations = extract_operations(&document)?;

        let http = Arc::new(HttpClient::new(
            transport,
            logger.clone(),
            settings.max_retries,
        ));
        let ctx = ToolContext::new(settings.clone(), http.clone(), logger.clone());

        let mut registry = Registry::new();
        registry.add_managed(
            ServiceStageManager::tool_defs(),
            Arc::new(ServiceStageManager::new(ctx.clone())),
        )?;
        registry.add_managed(CaeManager::tool_defs(), Arc::new(CaeManager::new(ctx.clone())))?;
        registry.add_managed(
            FunctionGraphManager::tool_defs(),
            Arc::new(FunctionGraphManager::new(ctx.clone())),
        )?;

        let reserved: HashSet<String> = registry.catalog.names().into_iter().collect();
        let options = GeneratorOptions {
            tenant_param: settings.tenant_param.clone(),
        };
        let generated = generate_tools(&operations, &options, &reserved);
        for tool in generated {
            let unbound = tool.unbound_placeholders();
            if !unbound.is_empty() {
                logger.warn(
                    "Generated tool has path placeholders without parameters",
                    Some(&json!({ "tool": tool.name, "placeholders": unbound })),
                );
            }
            let handler = OpenApiTool::new(tool, ctx.clone());
            registry.add(handler.definition(), Arc::new(handler))?;
        }

        logger.info(
            "Tools registered",
            Some(&json!({
                "document": document.title(),
                "operations": operations.len(),
                "tools": registry.catalog.len(),
            })),
        );

        let tool_executor = ToolExecutor::new(logger.clone(), registry.catalog, registry.handlers)?;
        Ok(Self {
            settings,
            logger,
            http,
            tool_executor: Arc::new(tool_executor),
        })
    }

    pub fn catalog(&self) -> &ToolCatalog {
        self.tool_executor.catalog()
    }

    /// Releases the shared HTTP client. Safe to call more than once.
    pub async fn shutdown(&self) {
        self.http.close().await;
    }
}

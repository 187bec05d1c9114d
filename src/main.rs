use clap::Parser;
use servicestage_mcp::app::App;
use servicestage_mcp::config::Settings;
use servicestage_mcp::errors::ToolError;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "servicestage-mcp", version, about = "ServiceStage MCP server over stdio")]
struct Cli {
    /// OpenAPI document (YAML or JSON) to generate tools from; overrides SS_SPEC_PATH.
    #[arg(long, value_name = "PATH")]
    spec: Option<PathBuf>,

    /// Print the registered tools as JSON and exit.
    #[arg(long)]
    list_tools: bool,
}

async fn run(cli: Cli) -> Result<(), ToolError> {
    let mut settings = Settings::from_env()?;
    if let Some(spec) = cli.spec {
        settings.spec_path = Some(spec);
    }
    if cli.list_tools {
        let app = App::initialize(settings)?;
        let listing = serde_json::to_string_pretty(app.catalog().list())
            .map_err(|err| ToolError::internal(err.to_string()))?;
        println!("{}", listing);
        app.shutdown().await;
        return Ok(());
    }
    servicestage_mcp::mcp::server::run_stdio(settings).await
}

#[tokio::main]
async fn main() {
    if let Err(err) = run(Cli::parse()).await {
        eprintln!("servicestage-mcp: {}", err);
        if let Some(hint) = &err.hint {
            eprintln!("hint: {}", hint);
        }
        std::process::exit(1);
    }
}

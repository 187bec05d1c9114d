use crate::app::App;
use crate::config::Settings;
use crate::errors::{ErrorCode, McpError, ToolError, ToolErrorKind};
use crate::http::result::is_error_payload;
use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

const PROTOCOL_VERSION: &str = "2025-06-18";
const SERVER_NAME: &str = "servicestage-mcp";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

fn map_tool_error(tool: &str, error: &ToolError) -> McpError {
    let mut lines = vec![
        "ServiceStageToolError".to_string(),
        format!("tool: {}", tool),
        format!("kind: {:?}", error.kind).to_lowercase(),
        format!("code: {}", error.code),
        format!("message: {}", error.message),
    ];
    if let Some(hint) = &error.hint {
        lines.push(format!("hint: {}", hint));
    }
    if let Some(details) = &error.details {
        lines.push(format!("details: {}", details));
    }
    let message = lines.join("\n");

    match error.kind {
        ToolErrorKind::InvalidParams => McpError::new(ErrorCode::InvalidParams, message),
        ToolErrorKind::Configuration => McpError::new(ErrorCode::ConfigurationMissing, message),
        ToolErrorKind::NotFound => McpError::new(ErrorCode::InvalidRequest, message),
        ToolErrorKind::Internal => McpError::new(ErrorCode::InternalError, message),
    }
}

/// Tool payloads go back as text content; error-shaped payloads set `isError`.
fn tool_result(payload: &Value) -> Value {
    let text = serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string());
    json!({
        "content": [ { "type": "text", "text": text } ],
        "isError": is_error_payload(payload),
    })
}

pub struct McpServer {
    app: Arc<App>,
}

impl McpServer {
    pub fn new(app: Arc<App>) -> Self {
        Self { app }
    }

    fn handle_initialize(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {"tools": {"listChanged": false}},
            "serverInfo": {"name": SERVER_NAME, "version": SERVER_VERSION},
        })
    }

    fn handle_tools_list(&self) -> Value {
        json!({ "tools": self.app.catalog().list() })
    }

    async fn handle_tools_call(app: &App, name: &str, args: Value) -> Result<Value, McpError> {
        let args = if args.is_null() { json!({}) } else { args };
        app.catalog().validate(name, &args)?;
        match app.tool_executor.execute(name, args).await {
            Ok(payload) => Ok(tool_result(&payload)),
            Err(err) => Err(map_tool_error(name, &err)),
        }
    }

    fn send(&self, tx: &mpsc::UnboundedSender<String>, response: JsonRpcResponse) {
        match serde_json::to_string(&response) {
            Ok(line) => {
                if tx.send(line).is_err() {
                    self.app.logger.warn("Response dropped: output closed", None);
                }
            }
            Err(err) => self.app.logger.error(
                "Failed to serialize response",
                Some(&json!({ "error": err.to_string() })),
            ),
        }
    }

    fn dispatch_line(
        &self,
        line: &str,
        tx: &mpsc::UnboundedSender<String>,
        in_flight: &mut JoinSet<()>,
    ) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }
        let parsed: Value = match serde_json::from_str(trimmed) {
            Ok(value) => value,
            Err(_) => {
                self.send(
                    tx,
                    JsonRpcResponse::failure(Value::Null, ErrorCode::ParseError, "Parse error"),
                );
                return;
            }
        };
        let fallback_id = parsed.get("id").cloned().unwrap_or(Value::Null);
        let request: JsonRpcRequest = match serde_json::from_value(parsed) {
            Ok(request) => request,
            Err(_) => {
                self.send(
                    tx,
                    JsonRpcResponse::failure(fallback_id, ErrorCode::InvalidRequest, "Invalid request"),
                );
                return;
            }
        };

        if request.is_notification() {
            return;
        }
        let id = request.id.clone().unwrap_or(Value::Null);
        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, self.handle_initialize()),
            "ping" => JsonRpcResponse::success(id, json!({})),
            method if method.starts_with("notifications/") => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, self.handle_tools_list()),
            "tools/call" => {
                let params = request.params.as_object().cloned().unwrap_or_default();
                let name = params
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string();
                if name.is_empty() {
                    JsonRpcResponse::failure(id, ErrorCode::InvalidParams, "Missing tool name")
                } else {
                    let args = params.get("arguments").cloned().unwrap_or(Value::Null);
                    let app = self.app.clone();
                    let tx = tx.clone();
                    in_flight.spawn(async move {
                        let response = match Self::handle_tools_call(&app, &name, args).await {
                            Ok(result) => JsonRpcResponse::success(id, result),
                            Err(err) => JsonRpcResponse::from_error(id, err),
                        };
                        if let Ok(line) = serde_json::to_string(&response) {
                            let _ = tx.send(line);
                        }
                    });
                    return;
                }
            }
            _ => JsonRpcResponse::failure(id, ErrorCode::MethodNotFound, "Method not found"),
        };
        self.send(tx, response);
    }

    /// Serves newline-delimited JSON-RPC until `reader` hits EOF or `shutdown`
    /// resolves, then closes the shared HTTP client.
    ///
    /// Each `tools/call` runs as its own task, so responses may come back out of
    /// order. EOF lets in-flight calls finish; `shutdown` aborts them.
    pub async fn serve<R, W, S>(&self, reader: R, writer: W, shutdown: S) -> Result<(), ToolError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
        S: Future<Output = ()>,
    {
        let logger = self.app.logger.child("server");
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let writer_task = tokio::spawn(async move {
            let mut writer = BufWriter::new(writer);
            while let Some(line) = rx.recv().await {
                writer.write_all(line.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
            Ok::<(), std::io::Error>(())
        });

        let mut lines = reader.lines();
        let mut in_flight: JoinSet<()> = JoinSet::new();
        tokio::pin!(shutdown);
        let mut interrupted = false;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    interrupted = true;
                    break;
                }
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
                line = lines.next_line() => match line {
                    Ok(Some(line)) => self.dispatch_line(&line, &tx, &mut in_flight),
                    Ok(None) => break,
                    Err(err) => {
                        logger.error("Failed to read input", Some(&json!({ "error": err.to_string() })));
                        break;
                    }
                },
            }
        }

        if !interrupted {
            loop {
                tokio::select! {
                    _ = &mut shutdown => {
                        interrupted = true;
                        break;
                    }
                    next = in_flight.join_next() => {
                        if next.is_none() {
                            break;
                        }
                    }
                }
            }
        }
        if interrupted {
            logger.info(
                "Shutdown requested",
                Some(&json!({ "aborted_calls": in_flight.len() })),
            );
            in_flight.abort_all();
            while in_flight.join_next().await.is_some() {}
        }

        drop(tx);
        let written = writer_task.await;
        self.app.shutdown().await;
        written
            .map_err(|err| ToolError::internal(format!("writer task failed: {}", err)))?
            .map_err(ToolError::from)
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

pub async fn run_stdio(settings: Settings) -> Result<(), ToolError> {
    let app = Arc::new(App::initialize(settings)?);
    let server = McpServer::new(app);
    server
        .serve(
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
            shutdown_signal(),
        )
        .await
}

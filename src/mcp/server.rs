use crate::app::App;
use crate::errors::{ErrorCode, McpError, ToolError};
use crate::mcp::catalog::{tool_by_name, tool_catalog, validate_tool_args};
use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::services::octopus::MeterKind;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};

const PROTOCOL_VERSION: &str = "2025-06-18";
const SERVER_NAME: &str = "octopus-mcp";
const SERVER_VERSION: &str = "1.0.0";

pub struct McpServer {
    app: Arc<App>,
}

impl McpServer {
    pub fn new() -> Self {
        Self {
            app: Arc::new(App::initialize()),
        }
    }

    pub fn with_app(app: App) -> Self {
        Self { app: Arc::new(app) }
    }

    fn handle_initialize(&self) -> Value {
        serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {"tools": {"list": true, "call": true}},
            "serverInfo": {"name": SERVER_NAME, "version": SERVER_VERSION},
        })
    }

    fn handle_tools_list(&self) -> Value {
        serde_json::json!({ "tools": tool_catalog() })
    }

    /// Dispatches one tool call. Protocol problems (unknown tool, argument
    /// shape) surface as JSON-RPC errors; pipeline failures come back as a
    /// textual tool result flagged with `isError`, so the caller sees the
    /// classified message.
    pub async fn handle_tools_call(&self, name: &str, args: Value) -> Result<Value, McpError> {
        let kind = match name {
            "get_electricity_consumption" => MeterKind::Electricity,
            "get_gas_consumption" => MeterKind::Gas,
            _ => {
                if tool_by_name(name).is_none() {
                    return Err(McpError::new(
                        ErrorCode::InvalidParams,
                        format!("Unknown tool: {}", name),
                    ));
                }
                return Err(McpError::new(
                    ErrorCode::InternalError,
                    format!("Tool {} has no handler", name),
                ));
            }
        };

        validate_tool_args(name, &args)?;

        match self.app.octopus.fetch_consumption(kind, &args).await {
            Ok(page) => {
                let text = serde_json::to_string_pretty(&page).map_err(|err| {
                    McpError::new(ErrorCode::InternalError, err.to_string())
                })?;
                Ok(serde_json::json!({
                    "content": [ { "type": "text", "text": text } ]
                }))
            }
            Err(err) => {
                self.app.logger.error(
                    "tool call failed",
                    Some(&serde_json::json!({
                        "tool": name,
                        "kind": err.kind,
                        "code": err.code.clone(),
                    })),
                );
                Ok(error_payload(&err))
            }
        }
    }

    pub async fn run_stdio(&self) -> Result<(), ToolError> {
        let stdin = tokio::io::stdin();
        let stdout = tokio::io::stdout();
        let mut reader = BufReader::new(stdin).lines();
        let mut writer = BufWriter::new(stdout);

        while let Some(line) = reader
            .next_line()
            .await
            .map_err(|err| ToolError::internal(err.to_string()))?
        {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let parsed: Value = match serde_json::from_str(trimmed) {
                Ok(value) => value,
                Err(_) => {
                    write_response(
                        &mut writer,
                        &JsonRpcResponse::failure(
                            Value::Null,
                            ErrorCode::ParseError.as_i32(),
                            "Parse error".to_string(),
                        ),
                    )
                    .await?;
                    continue;
                }
            };

            let request: JsonRpcRequest = match serde_json::from_value(parsed) {
                Ok(req) => req,
                Err(_) => {
                    write_response(
                        &mut writer,
                        &JsonRpcResponse::failure(
                            Value::Null,
                            ErrorCode::InvalidRequest.as_i32(),
                            "Invalid request".to_string(),
                        ),
                    )
                    .await?;
                    continue;
                }
            };

            let response = match request.method.as_str() {
                "notifications/initialized" => request
                    .id
                    .clone()
                    .map(|id| JsonRpcResponse::success(id, serde_json::json!({}))),
                _ if request.method.starts_with("notifications/") && request.id.is_none() => None,
                "initialize" => request
                    .id
                    .clone()
                    .map(|id| JsonRpcResponse::success(id, self.handle_initialize())),
                "tools/list" => request
                    .id
                    .clone()
                    .map(|id| JsonRpcResponse::success(id, self.handle_tools_list())),
                "tools/call" => match request.id.clone() {
                    Some(id) => {
                        let params = request.params.as_object().cloned().unwrap_or_default();
                        let name = params.get("name").and_then(|v| v.as_str()).unwrap_or("");
                        if name.is_empty() {
                            Some(JsonRpcResponse::failure(
                                id,
                                ErrorCode::InvalidParams.as_i32(),
                                "Missing tool name".to_string(),
                            ))
                        } else {
                            let args = params
                                .get("arguments")
                                .cloned()
                                .unwrap_or_else(|| serde_json::json!({}));
                            Some(match self.handle_tools_call(name, args).await {
                                Ok(result) => JsonRpcResponse::success(id, result),
                                Err(err) => {
                                    JsonRpcResponse::failure(id, err.code.as_i32(), err.message)
                                }
                            })
                        }
                    }
                    None => None,
                },
                _ => request.id.clone().map(|id| {
                    JsonRpcResponse::failure(
                        id,
                        ErrorCode::MethodNotFound.as_i32(),
                        "Method not found".to_string(),
                    )
                }),
            };

            if let Some(response) = response {
                write_response(&mut writer, &response).await?;
            }
        }

        Ok(())
    }
}

fn error_payload(err: &ToolError) -> Value {
    let mut text = format!("Error: {}", err.message);
    if let Some(hint) = &err.hint {
        text.push_str(&format!(" ({})", hint));
    }
    serde_json::json!({
        "content": [ { "type": "text", "text": text } ],
        "isError": true,
    })
}

async fn write_response(
    writer: &mut BufWriter<tokio::io::Stdout>,
    response: &JsonRpcResponse,
) -> Result<(), ToolError> {
    let payload = serde_json::to_string(response).unwrap_or_default();
    writer.write_all(payload.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

pub async fn run_stdio() -> Result<(), ToolError> {
    let server = McpServer::new();
    server.run_stdio().await
}

//! Line-delimited JSON-RPC 2.0 tool server over stdio
//!
//! One request per line on stdin, one response per line on stdout. Logs go
//! to stderr so they never interleave with responses.

use crate::tools::MemoryTools;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Protocol version reported on `initialize`
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name reported on `initialize`
pub const SERVER_NAME: &str = "project-memory";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
}

#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

impl JsonRpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Stdio tool server wrapping a `MemoryTools` dispatcher
pub struct ToolServer {
    tools: MemoryTools,
}

impl ToolServer {
    pub fn new(tools: MemoryTools) -> Self {
        Self { tools }
    }

    /// Handle one request line. Returns the serialized response, or `None`
    /// for notifications and blank lines.
    pub fn handle_line(&self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let response = match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => self.handle_request(request)?,
            Err(e) => {
                tracing::warn!(error = %e, "Unparsable request");
                JsonRpcResponse::failure(Value::Null, PARSE_ERROR, format!("Parse error: {e}"))
            }
        };

        match serde_json::to_string(&response) {
            Ok(serialized) => Some(serialized),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response");
                None
            }
        }
    }

    fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(method) = request.method else {
            let id = request.id.unwrap_or(Value::Null);
            return Some(JsonRpcResponse::failure(id, INVALID_REQUEST, "Missing method"));
        };

        // Notifications carry no id and get no reply
        let Some(id) = request.id else {
            tracing::debug!(method = %method, "Notification");
            return None;
        };

        let response = match method.as_str() {
            "initialize" => JsonRpcResponse::success(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": {
                        "name": SERVER_NAME,
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }),
            ),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => {
                JsonRpcResponse::success(id, json!({ "tools": MemoryTools::definitions() }))
            }
            "tools/call" => {
                let params = request.params.unwrap_or(Value::Null);
                match serde_json::from_value::<CallParams>(params) {
                    Ok(call) => {
                        let text = self.tools.call(&call.name, call.arguments);
                        JsonRpcResponse::success(
                            id,
                            json!({
                                "content": [{ "type": "text", "text": text }],
                                "isError": false,
                            }),
                        )
                    }
                    Err(e) => JsonRpcResponse::failure(
                        id,
                        INVALID_PARAMS,
                        format!("Invalid params: {e}"),
                    ),
                }
            }
            other => {
                tracing::debug!(method = other, "Unknown method");
                JsonRpcResponse::failure(id, METHOD_NOT_FOUND, format!("Method not found: {other}"))
            }
        };
        Some(response)
    }

    /// Serve requests from stdin until EOF
    pub async fn serve_stdio(&self) -> crate::error::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        tracing::info!("Tool server listening on stdio");
        while let Some(line) = lines.next_line().await? {
            if let Some(response) = self.handle_line(&line) {
                stdout.write_all(response.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
        }
        tracing::info!("Stdin closed, shutting down");
        Ok(())
    }
}

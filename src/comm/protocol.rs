use crate::comm::error::CommError;
use crate::comm::types::{INVALID_REQUEST, JsonRpcMessage, JsonRpcResponse, PARSE_ERROR};
use crate::executor::{ToolDefinition, ToolOutput};
use serde_json::{Value, json};
use std::result::Result as StdResult;

/// Decode one inbound line.
///
/// On failure returns the error response to send back: `-32700` for invalid
/// JSON, `-32600` for JSON that is not a JSON-RPC 2.0 message.
pub fn decode_message(line: &str) -> StdResult<JsonRpcMessage, JsonRpcResponse> {
    let value: Value = serde_json::from_str(line).map_err(|e| {
        JsonRpcResponse::failure(Value::Null, PARSE_ERROR, format!("Parse error: {e}"))
    })?;

    let id = value.get("id").cloned().unwrap_or(Value::Null);

    let message: JsonRpcMessage = serde_json::from_value(value).map_err(|e| {
        JsonRpcResponse::failure(id.clone(), INVALID_REQUEST, format!("Invalid request: {e}"))
    })?;

    if message.jsonrpc != "2.0" {
        return Err(JsonRpcResponse::failure(
            id,
            INVALID_REQUEST,
            format!("Unsupported jsonrpc version: {}", message.jsonrpc),
        ));
    }

    Ok(message)
}

/// Encode a response as one newline-terminated line
pub fn encode_response(response: &JsonRpcResponse) -> StdResult<Vec<u8>, CommError> {
    let mut buf = serde_json::to_vec(response).map_err(|e| CommError::Encode(e.to_string()))?;
    buf.push(b'\n');
    Ok(buf)
}

/// Result of `initialize`
pub fn initialize_result(
    protocol_version: &str,
    server_name: &str,
    server_version: &str,
) -> Value {
    json!({
        "protocolVersion": protocol_version,
        "capabilities": {
            "tools": { "listChanged": false }
        },
        "serverInfo": {
            "name": server_name,
            "version": server_version
        }
    })
}

/// Result of `tools/list`
pub fn tools_list_result(tools: &[ToolDefinition]) -> Value {
    json!({ "tools": tools })
}

/// Result of `tools/call`
pub fn tool_call_result(output: &ToolOutput) -> Value {
    let mut result = json!({
        "content": [
            { "type": "text", "text": output.content }
        ],
        "isError": output.is_error
    });
    if let Some(structured) = &output.structured {
        result["structuredContent"] = structured.clone();
    }
    result
}

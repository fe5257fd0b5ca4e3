//! Newline-delimited JSON framing for the stdio transport.

use crate::types::{JsonRpcMessage, McpError, McpResult};

/// Parse one line of text as a JSON-RPC message.
pub fn parse_message(line: &str) -> McpResult<JsonRpcMessage> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(McpError::ParseError("Empty message".to_string()));
    }

    serde_json::from_str(trimmed).map_err(|e| McpError::ParseError(e.to_string()))
}

/// Serialize a value to a JSON line (with trailing newline).
pub fn frame_message(value: &serde_json::Value) -> McpResult<String> {
    let mut json = serde_json::to_string(value).map_err(McpError::Json)?;
    json.push('\n');
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::error_codes::PARSE_ERROR;

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = parse_message(r#"{"broken":"#).unwrap_err();
        assert_eq!(err.code(), PARSE_ERROR);
        assert!(parse_message("").is_err());
    }

    #[test]
    fn request_round_trips_through_framing() {
        let msg = parse_message(r#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#).unwrap();
        let JsonRpcMessage::Request(req) = msg else {
            panic!("expected request");
        };
        assert_eq!(req.method, "ping");

        let framed = frame_message(&serde_json::json!({"ok": true})).unwrap();
        assert!(framed.ends_with('\n'));
    }
}

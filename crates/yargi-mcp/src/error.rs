//! Mapping from adapter errors to MCP tool errors.
//!
//! Adapter errors carry a short `kind` and a safe message; both cross the
//! boundary as a structured tool error. Stack traces and upstream bodies do
//! not.

use rmcp::ErrorData as McpError;
use serde_json::json;
use yargi_core::Error;

/// Convert an adapter error into the structured tool error returned to MCP
/// callers.
pub fn to_tool_error(err: &Error) -> McpError {
    let kind = err.kind();
    let data = Some(json!({ "kind": kind }));
    match err {
        Error::InvalidInput(msg) => McpError::invalid_params(msg.clone(), data),
        _ => McpError::internal_error(err.to_string(), data),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_maps_to_invalid_params() {
        let err = Error::InvalidInput("pageSize out of range".into());
        let tool_err = to_tool_error(&err);
        assert_eq!(tool_err.code, rmcp::model::ErrorCode::INVALID_PARAMS);
        assert!(tool_err.message.contains("pageSize"));
    }

    #[test]
    fn upstream_errors_carry_their_kind_without_bodies() {
        let err = Error::Status {
            status: 503,
            body: "<huge upstream body>".into(),
        };
        let tool_err = to_tool_error(&err);
        assert_eq!(tool_err.code, rmcp::model::ErrorCode::INTERNAL_ERROR);
        assert_eq!(
            tool_err.data.as_ref().and_then(|d| d.get("kind")),
            Some(&serde_json::json!("upstream_status"))
        );
        assert!(!tool_err.message.contains("huge upstream body"));
    }
}

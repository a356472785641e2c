//! Registry-level input validation.
//!
//! Everything here runs before an adapter is touched: page ranges and closed
//! enumeration sets. Failures surface as MCP `invalid_params` errors;
//! nothing is silently coerced. Dates are deliberately *not* validated here:
//! a date outside the upstream's grammar is passed through, and whatever the
//! upstream answers is mapped like any other response.

use rmcp::ErrorData as McpError;
use serde_json::json;

fn invalid(message: String) -> McpError {
    McpError::invalid_params(message, Some(json!({ "kind": "invalid_input" })))
}

/// `pageNumber` must be 1-indexed.
pub fn page_number(value: u32) -> Result<(), McpError> {
    if value >= 1 {
        Ok(())
    } else {
        Err(invalid("pageNumber must be >= 1".into()))
    }
}

/// `pageSize` must fall in `[1, 100]`.
pub fn page_size(value: u32) -> Result<(), McpError> {
    if (1..=100).contains(&value) {
        Ok(())
    } else {
        Err(invalid(format!("pageSize must be between 1 and 100, got {value}")))
    }
}

/// A chamber value must be a member of its source's closed set.
pub fn chamber(value: &str, allowed: &[&str], field: &str) -> Result<(), McpError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(invalid(format!("{field}: unknown chamber `{value}`")))
    }
}

/// Optional chamber: `None` means all.
pub fn optional_chamber(
    value: Option<&str>,
    allowed: &[&str],
    field: &str,
) -> Result<(), McpError> {
    match value {
        None => Ok(()),
        Some(v) => chamber(v, allowed, field),
    }
}

/// Sort criterion for the Yargıtay-family endpoints (`1`, `2`, `3`).
pub fn sort_criterion(value: &str) -> Result<(), McpError> {
    if matches!(value, "1" | "2" | "3") {
        Ok(())
    } else {
        Err(invalid(format!("siralama must be 1, 2 or 3, got `{value}`")))
    }
}

/// Sort direction (`asc` or `desc`).
pub fn sort_direction(value: &str) -> Result<(), McpError> {
    if matches!(value, "asc" | "desc") {
        Ok(())
    } else {
        Err(invalid(format!("siralamaDirection must be asc or desc, got `{value}`")))
    }
}

/// A non-empty string field.
pub fn non_empty(value: &str, field: &str) -> Result<(), McpError> {
    if value.trim().is_empty() {
        Err(invalid(format!("{field} must be a non-empty string")))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds() {
        assert!(page_number(1).is_ok());
        assert!(page_number(0).is_err());
        assert!(page_size(1).is_ok());
        assert!(page_size(100).is_ok());
        assert!(page_size(0).is_err());
        assert!(page_size(101).is_err());
    }

    #[test]
    fn chamber_membership() {
        let allowed = ["", "1. Hukuk Dairesi"];
        assert!(chamber("", &allowed, "birim").is_ok());
        assert!(chamber("1. Hukuk Dairesi", &allowed, "birim").is_ok());
        assert!(chamber("99. Daire", &allowed, "birim").is_err());
        assert!(optional_chamber(None, &allowed, "birim").is_ok());
    }

    #[test]
    fn sort_fields() {
        assert!(sort_criterion("3").is_ok());
        assert!(sort_criterion("4").is_err());
        assert!(sort_direction("desc").is_ok());
        assert!(sort_direction("down").is_err());
    }

    #[test]
    fn invalid_errors_carry_the_kind_tag() {
        let err = page_size(101).unwrap_err();
        assert_eq!(
            err.data.as_ref().and_then(|d| d.get("kind")),
            Some(&serde_json::json!("invalid_input"))
        );
    }
}

//! Error types and handling for yargi-core operations.
//!
//! One error enum covers every adapter. Variants map 1:1 onto the tool-level
//! error kinds surfaced over MCP, so the server crate only needs
//! [`Error::kind`] to build its structured tool errors.

use thiserror::Error;

/// The main error type for yargi-core operations.
///
/// All public functions in yargi-core return `Result<T, Error>`. Messages are
/// short and safe to forward to callers; upstream response bodies are
/// truncated before they are embedded.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level failure talking to an upstream source.
    ///
    /// Covers connection errors, TLS failures and request build errors. The
    /// underlying `reqwest::Error` is preserved. Timeouts are reported as
    /// [`Error::Timeout`] instead.
    #[error("upstream network error: {0}")]
    Network(reqwest::Error),

    /// Upstream answered with a non-2xx status.
    #[error("upstream returned HTTP {status}")]
    Status {
        /// HTTP status code returned by the upstream.
        status: u16,
        /// Truncated response body, kept for logging.
        body: String,
    },

    /// Upstream payload could not be decoded (malformed JSON, bad base64,
    /// unexpected charset).
    #[error("decode error: {0}")]
    Decode(String),

    /// Upstream payload decoded but did not match the expected structure
    /// (HTML drift, missing fields).
    #[error("parse error: {0}")]
    Parse(String),

    /// The per-call deadline expired.
    #[error("upstream timeout: {0}")]
    Timeout(String),

    /// The Markdown pipeline failed to convert a document.
    #[error("conversion failure: {0}")]
    Conversion(String),

    /// A targeted fetch found no matching record upstream.
    #[error("not found: {0}")]
    NotFound(String),

    /// Headless browser failure (launch, navigation, evaluation).
    #[error("browser error: {0}")]
    Browser(String),

    /// Caller-supplied value was rejected before any upstream call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Anything that does not fit the categories above.
    #[error("{0}")]
    Internal(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::Network(err)
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl Error {
    /// Stable string identifier for the tool-level error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "upstream_network",
            Self::Status { .. } => "upstream_status",
            Self::Decode(_) | Self::Parse(_) => "upstream_parse",
            Self::Timeout(_) => "upstream_timeout",
            Self::Conversion(_) => "conversion_failure",
            Self::NotFound(_) => "not_found",
            Self::Browser(_) | Self::Internal(_) => "internal_error",
            Self::InvalidInput(_) => "invalid_input",
        }
    }

    /// Whether a retry of the same call might succeed.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout(_) => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_match_tool_error_vocabulary() {
        let cases = vec![
            (
                Error::Status {
                    status: 502,
                    body: String::new(),
                },
                "upstream_status",
            ),
            (Error::Decode("bad json".into()), "upstream_parse"),
            (Error::Parse("structure drift".into()), "upstream_parse"),
            (Error::Timeout("deadline".into()), "upstream_timeout"),
            (Error::Conversion("htmd".into()), "conversion_failure"),
            (Error::NotFound("row".into()), "not_found"),
            (Error::Browser("launch".into()), "internal_error"),
            (Error::InvalidInput("pageSize".into()), "invalid_input"),
            (Error::Internal("oops".into()), "internal_error"),
        ];
        for (err, kind) in cases {
            assert_eq!(err.kind(), kind, "wrong kind for {err:?}");
        }
    }

    #[test]
    fn server_errors_are_recoverable() {
        assert!(
            Error::Status {
                status: 503,
                body: String::new()
            }
            .is_recoverable()
        );
        assert!(
            !Error::Status {
                status: 404,
                body: String::new()
            }
            .is_recoverable()
        );
        assert!(Error::Timeout("t".into()).is_recoverable());
        assert!(!Error::Parse("p".into()).is_recoverable());
    }

    #[test]
    fn display_keeps_messages_short() {
        let err = Error::Status {
            status: 500,
            body: "ignored in display".into(),
        };
        assert_eq!(err.to_string(), "upstream returned HTTP 500");
    }
}

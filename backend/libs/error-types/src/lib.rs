use serde::{Deserialize, Serialize};

/// Unified API error envelope returned by every Brightly backend service.
///
/// Clients route on `error_type` and localize on `code`; `message` is for
/// humans and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short error title (mirrors the HTTP reason phrase)
    pub error: String,

    /// Human-readable description of what went wrong
    pub message: String,

    /// HTTP status code
    pub status: u16,

    /// Error family for client-side routing:
    /// "validation_error", "authentication_error", "authorization_error",
    /// "not_found_error", "conflict_error", "server_error"
    pub error_type: String,

    /// Stable machine code, e.g. "CONVERSATION_LOCKED"
    pub code: String,

    /// Optional structured detail payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// RFC 3339 timestamp of when the error was produced
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str, status: u16, error_type: &str, code: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            status,
            error_type: error_type.to_string(),
            code: code.to_string(),
            details: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Stable error codes shared across services.
pub mod error_codes {
    pub const INVALID_INPUT: &str = "INVALID_INPUT";
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const CONVERSATION_LOCKED: &str = "CONVERSATION_LOCKED";
    pub const MESSAGE_ALREADY_DELETED: &str = "MESSAGE_ALREADY_DELETED";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const INTERNAL_SERVER_ERROR: &str = "INTERNAL_SERVER_ERROR";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_without_empty_details() {
        let resp = ErrorResponse::new(
            "Forbidden",
            "not a participant",
            403,
            "authorization_error",
            error_codes::FORBIDDEN,
        );
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], 403);
        assert_eq!(json["code"], "FORBIDDEN");
        assert!(json.get("details").is_none());
    }
}

use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error body shapes the inventory backend is known to return.
///
/// FastAPI reports `detail` either as a plain string or as a list of
/// `{ "msg": ... }` objects for request validation failures.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorResponse {
    /// Extracts the most specific human-readable message, if any.
    pub fn message(&self) -> Option<String> {
        if let Some(detail) = &self.detail {
            match detail {
                Value::String(text) if !text.trim().is_empty() => return Some(text.clone()),
                Value::Array(items) if !items.is_empty() => {
                    let joined = items
                        .iter()
                        .filter_map(|item| match item {
                            Value::Object(map) => map
                                .get("msg")
                                .and_then(Value::as_str)
                                .map(str::to_string),
                            Value::String(text) => Some(text.clone()),
                            _ => None,
                        })
                        .collect::<Vec<_>>()
                        .join(", ");
                    if !joined.is_empty() {
                        return Some(joined);
                    }
                }
                _ => {}
            }
        }

        self.message
            .clone()
            .or_else(|| self.error.clone())
            .filter(|msg| !msg.trim().is_empty())
    }
}

/// Coarse classification used by callers that only need to branch on the
/// error family (e.g. to force re-authentication).
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Transport,
    Auth,
    Forbidden,
    Validation,
    NotFound,
    Conflict,
    Server,
    Serialization,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::SerializationError(err.to_string())
        } else if err.is_timeout() {
            ServiceError::TransportError(format!("request timed out: {}", err))
        } else {
            ServiceError::TransportError(err.to_string())
        }
    }
}

impl From<crate::cache::CacheError> for ServiceError {
    fn from(err: crate::cache::CacheError) -> Self {
        ServiceError::CacheError(err.to_string())
    }
}

impl ServiceError {
    /// Maps a non-success HTTP response onto the error taxonomy.
    ///
    /// This is the single source of truth for status-to-error mapping.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let parsed = serde_json::from_str::<ErrorResponse>(body)
            .ok()
            .and_then(|resp| resp.message());
        let message = parsed.unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            } else {
                trimmed.to_string()
            }
        });

        match status {
            StatusCode::UNAUTHORIZED => Self::AuthError(message),
            StatusCode::FORBIDDEN => Self::Forbidden(message),
            StatusCode::NOT_FOUND => Self::NotFound(message),
            StatusCode::CONFLICT => Self::Conflict(message),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                Self::ValidationError(message)
            }
            other => Self::ServerError {
                status: other.as_u16(),
                message,
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TransportError(_) => ErrorKind::Transport,
            Self::AuthError(_) => ErrorKind::Auth,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::ValidationError(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::ServerError { .. } => ErrorKind::Server,
            Self::SerializationError(_) => ErrorKind::Serialization,
            Self::CacheError(_) | Self::ConfigError(_) | Self::InternalError(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// True when the session is no longer valid and the caller must
    /// re-authenticate.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthError(_))
    }

    /// Whether a caller may reasonably offer a manual retry. Nothing in this
    /// crate retries automatically.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::TransportError(_) => true,
            Self::ServerError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Human-readable message suitable for a notification.
    /// Internal errors get a generic text so implementation details stay out
    /// of the UI.
    pub fn user_message(&self) -> String {
        match self {
            Self::TransportError(msg) if msg.contains("timed out") => {
                "Request timeout. Please try again.".to_string()
            }
            Self::TransportError(_) => "Network error. Please check your connection.".to_string(),
            Self::AuthError(_) => "Your session has expired. Please log in again.".to_string(),
            Self::Forbidden(_) => "You do not have permission to perform this action.".to_string(),
            Self::ValidationError(msg) => msg.clone(),
            Self::NotFound(_) => "The requested resource was not found.".to_string(),
            Self::Conflict(msg) => msg.clone(),
            Self::ServerError { status, .. } if *status == 503 => {
                "Service temporarily unavailable. Please try again later.".to_string()
            }
            Self::ServerError { .. } => "Server error. Please try again later.".to_string(),
            Self::SerializationError(_)
            | Self::CacheError(_)
            | Self::ConfigError(_)
            | Self::InternalError(_) => {
                "An unexpected error occurred. Please try again.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_mapping() {
        assert!(matches!(
            ServiceError::from_response(StatusCode::UNAUTHORIZED, ""),
            ServiceError::AuthError(_)
        ));
        assert!(matches!(
            ServiceError::from_response(StatusCode::FORBIDDEN, ""),
            ServiceError::Forbidden(_)
        ));
        assert!(matches!(
            ServiceError::from_response(StatusCode::NOT_FOUND, ""),
            ServiceError::NotFound(_)
        ));
        assert!(matches!(
            ServiceError::from_response(StatusCode::UNPROCESSABLE_ENTITY, ""),
            ServiceError::ValidationError(_)
        ));
        assert!(matches!(
            ServiceError::from_response(StatusCode::BAD_REQUEST, ""),
            ServiceError::ValidationError(_)
        ));
        assert!(matches!(
            ServiceError::from_response(StatusCode::CONFLICT, ""),
            ServiceError::Conflict(_)
        ));
        assert!(matches!(
            ServiceError::from_response(StatusCode::BAD_GATEWAY, ""),
            ServiceError::ServerError { status: 502, .. }
        ));
    }

    #[test]
    fn detail_string_is_surfaced_verbatim() {
        let err = ServiceError::from_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail":"Spool with barcode PLA-RED-001 already exists"}"#,
        );
        match err {
            ServiceError::ValidationError(msg) => {
                assert_eq!(msg, "Spool with barcode PLA-RED-001 already exists")
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn detail_list_is_joined() {
        let body = r#"{"detail":[{"loc":["body","brand_name"],"msg":"field required"},{"msg":"value is not a valid float"}]}"#;
        let err = ServiceError::from_response(StatusCode::UNPROCESSABLE_ENTITY, body);
        assert_eq!(
            err.user_message(),
            "field required, value is not a valid float"
        );
    }

    #[test]
    fn falls_back_to_message_then_error_then_raw_body() {
        let err = ServiceError::from_response(StatusCode::NOT_FOUND, r#"{"message":"gone"}"#);
        assert_eq!(err.to_string(), "Not found: gone");

        let err = ServiceError::from_response(StatusCode::CONFLICT, r#"{"error":"dup"}"#);
        assert_eq!(err.to_string(), "Conflict: dup");

        let err = ServiceError::from_response(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert_eq!(err.to_string(), "Server error (500): boom");

        let err = ServiceError::from_response(StatusCode::SERVICE_UNAVAILABLE, "");
        assert_eq!(
            err.to_string(),
            "Server error (503): Service Unavailable"
        );
    }

    #[test]
    fn user_message_hides_internal_details() {
        assert_eq!(
            ServiceError::CacheError("lock poisoned".into()).user_message(),
            "An unexpected error occurred. Please try again."
        );
        assert_eq!(
            ServiceError::SerializationError("missing field `id`".into()).user_message(),
            "An unexpected error occurred. Please try again."
        );
        assert_eq!(
            ServiceError::ValidationError("Base weight must be positive".into()).user_message(),
            "Base weight must be positive"
        );
    }

    #[test]
    fn retry_and_auth_classification() {
        assert!(ServiceError::TransportError("reset".into()).is_retryable());
        assert!(ServiceError::ServerError {
            status: 503,
            message: String::new()
        }
        .is_retryable());
        assert!(!ServiceError::AuthError("expired".into()).is_retryable());
        assert!(ServiceError::AuthError("expired".into()).is_auth());
        assert_eq!(
            ServiceError::NotFound("x".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(ErrorKind::NotFound.to_string(), "not_found");
    }
}

//! Error taxonomy shared by the decoder, the bucket engine and the HTTP surface.
//!
//! Every [`ConsoleError`] knows the status it is served with and the structured
//! payload that goes through content negotiation.

use crate::console::redirect::REDIRECT_STATUSES;
use hyper::StatusCode;
use serde_json::{json, Value};

/// First failure reported by the schema validator for a submitted response archive.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFailure {
    /// Schema keyword that rejected the document (`required`, `type`, ...)
    pub code: String,
    pub message: String,
    /// Keyword-specific context, e.g. the missing property name
    pub params: Value,
    /// JSON pointer into the submitted document
    pub data_path: String,
    /// JSON pointer into the schema
    pub schema_path: String,
}

/// Failure talking to the bucket store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[cfg(feature = "redis-backend")]
impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("response archive failed validation: {}", .0.message)]
    Validation(ValidationFailure),
    #[error("Not Found")]
    NotFound,
    #[error("malformed request body: {0}")]
    MalformedBody(String),
    #[error("failed to read request body: {0}")]
    BodyRead(String),
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),
    #[error("invalid redirect status code {0}")]
    InvalidRedirectStatus(i64),
    #[error("invalid status code: {0}")]
    InvalidStatusCode(String),
    #[error("bucket {id} holds an unreadable archive: {reason}")]
    CorruptBucket { id: String, reason: String },
    #[error("failed to render response: {0}")]
    Render(String),
}

impl ConsoleError {
    /// HTTP status the error is served with.
    ///
    /// An invalid redirect status is a successful response carrying an error
    /// payload, not a protocol fault.
    pub fn status(&self) -> StatusCode {
        match self {
            ConsoleError::Validation(_)
            | ConsoleError::MalformedBody(_)
            | ConsoleError::BodyRead(_)
            | ConsoleError::InvalidStatusCode(_) => StatusCode::BAD_REQUEST,
            ConsoleError::NotFound => StatusCode::NOT_FOUND,
            ConsoleError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ConsoleError::InvalidRedirectStatus(_) => StatusCode::OK,
            ConsoleError::CorruptBucket { .. } | ConsoleError::Render(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Name of the HTML view used when the client negotiates markup.
    pub fn view(&self) -> &'static str {
        match self {
            ConsoleError::NotFound => "404",
            ConsoleError::InvalidRedirectStatus(_) => "default",
            _ => "error",
        }
    }

    /// Structured payload rendered through content negotiation.
    pub fn payload(&self) -> Value {
        match self {
            ConsoleError::Validation(failure) => json!({
                "error": {
                    "code": failure.code,
                    "message": failure.message,
                    "params": failure.params,
                    "dataPath": failure.data_path,
                    "schemaPath": failure.schema_path,
                }
            }),
            ConsoleError::InvalidRedirectStatus(_) => {
                let valid: Vec<String> = REDIRECT_STATUSES.iter().map(u16::to_string).collect();
                json!({
                    "error": format!("invalid status code, must be one of {}", valid.join(","))
                })
            }
            // Store details stay in the logs.
            ConsoleError::StoreUnavailable(_) => json!({
                "error": {"code": "503", "message": "Service Unavailable"}
            }),
            other => json!({
                "error": {
                    "code": other.status().as_str(),
                    "message": other.to_string(),
                }
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_payload() {
        let err = ConsoleError::NotFound;
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            err.payload(),
            json!({"error": {"code": "404", "message": "Not Found"}})
        );
        assert_eq!(err.view(), "404");
    }

    #[test]
    fn test_invalid_redirect_is_success_level() {
        let err = ConsoleError::InvalidRedirectStatus(999);
        assert_eq!(err.status(), StatusCode::OK);
        assert_eq!(
            err.payload()["error"],
            "invalid status code, must be one of 300,301,302,303,307,308"
        );
    }

    #[test]
    fn test_validation_payload_carries_paths() {
        let err = ConsoleError::Validation(ValidationFailure {
            code: "required".to_string(),
            message: "\"status\" is a required property".to_string(),
            params: json!({"key": "status"}),
            data_path: "".to_string(),
            schema_path: "/required".to_string(),
        });
        let payload = err.payload();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(payload["error"]["code"], "required");
        assert_eq!(payload["error"]["params"]["key"], "status");
        assert_eq!(payload["error"]["schemaPath"], "/required");
        assert_eq!(payload["error"]["dataPath"], "");
    }

    #[test]
    fn test_store_error_hides_details() {
        let err = ConsoleError::from(StoreError::Unavailable("connection refused".to_string()));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!err.payload().to_string().contains("refused"));
    }
}

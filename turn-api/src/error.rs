//! Mapping of orchestrator failures onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{error, warn};
use turn_runner::error::TurnError;

/// Error returned by handlers; renders as
/// `{ "error": code, "message": text, "retryable": bool }`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    /// Whether the same request may succeed later without changes.
    pub retryable: bool,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: &'a str,
    retryable: bool,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "invalid_request",
            message: message.into(),
            retryable: false,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "not_found",
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message: message.into(),
            retryable: false,
        }
    }
}

impl From<TurnError> for ApiError {
    fn from(err: TurnError) -> Self {
        let status = match &err {
            TurnError::AlreadyRunning => StatusCode::CONFLICT,
            TurnError::Execution { .. } | TurnError::TimedOut { .. } | TurnError::Launch(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            TurnError::Reconciliation(_) => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            code: err.code(),
            message: err.to_string(),
            retryable: err.is_recoverable(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(code = self.code, message = %self.message, "request failed");
        } else {
            warn!(code = self.code, message = %self.message, "request rejected");
        }
        let body = ErrorBody {
            error: self.code,
            message: &self.message,
            retryable: self.retryable,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(ApiError::from(TurnError::AlreadyRunning).status, StatusCode::CONFLICT);
        assert_eq!(
            ApiError::from(TurnError::Execution {
                exit_code: Some(1),
                stderr: "boom".to_string()
            })
            .status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(TurnError::TimedOut {
                timeout_secs: 5,
                stderr: String::new()
            })
            .status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let err = ApiError::from(TurnError::Reconciliation(anyhow!("down")));
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert_eq!(err.code, "reconciliation_failed");
    }

    #[test]
    fn execution_message_keeps_stderr() {
        let err = ApiError::from(TurnError::Execution {
            exit_code: Some(1),
            stderr: "boom".to_string(),
        });
        assert!(err.message.contains("boom"));
        assert_eq!(err.code, "execution_failed");
    }

    #[test]
    fn retryable_follows_recoverability() {
        assert!(ApiError::from(TurnError::AlreadyRunning).retryable);
        assert!(ApiError::from(TurnError::Reconciliation(anyhow!("down"))).retryable);
        assert!(
            !ApiError::from(TurnError::Execution {
                exit_code: Some(1),
                stderr: "boom".to_string()
            })
            .retryable
        );
        assert!(!ApiError::bad_request("turns must be at least 1").retryable);
    }

    #[tokio::test]
    async fn conflict_body_marks_retryable() {
        let response = ApiError::from(TurnError::AlreadyRunning).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body["error"], "already_running");
        assert_eq!(body["retryable"], true);
    }

    #[test]
    fn timeout_message_keeps_stderr() {
        let err = ApiError::from(TurnError::TimedOut {
            timeout_secs: 5,
            stderr: "still thinking".to_string(),
        });
        assert_eq!(err.code, "timed_out");
        assert!(err.message.contains("still thinking"));
        assert!(!err.retryable);
    }
}

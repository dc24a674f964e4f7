use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, Clone, thiserror::Error)]
pub enum InterviewError {
    #[error("Server Misconfiguration: {0}")]
    Configuration(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Malformed report: {0}")]
    MalformedReport(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Camera unavailable: {0}")]
    Permission(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("A submission is already pending")]
    SubmissionPending,
}

impl InterviewError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            InterviewError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            InterviewError::Gateway(_) => StatusCode::BAD_GATEWAY,
            InterviewError::MalformedReport(_) => StatusCode::BAD_GATEWAY,
            InterviewError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            InterviewError::Permission(_) => StatusCode::FORBIDDEN,
            InterviewError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            InterviewError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            InterviewError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            InterviewError::InvalidTransition(_) => StatusCode::CONFLICT,
            InterviewError::SubmissionPending => StatusCode::CONFLICT,
        }
    }

    /// Transient errors can be retried in place; the rest require leaving the flow.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            InterviewError::Gateway(_) | InterviewError::SubmissionPending
        )
    }
}

impl IntoResponse for InterviewError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = serde_json::json!({
            "error": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            InterviewError::Configuration("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            InterviewError::Gateway("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            InterviewError::MethodNotAllowed.status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            InterviewError::SessionNotFound("abc".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            InterviewError::SubmissionPending.status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_only_gateway_failures_are_recoverable() {
        assert!(InterviewError::Gateway("timeout".into()).is_recoverable());
        assert!(!InterviewError::Configuration("no key".into()).is_recoverable());
        assert!(!InterviewError::MalformedReport("bad json".into()).is_recoverable());
    }

    #[test]
    fn test_method_not_allowed_message() {
        assert_eq!(
            InterviewError::MethodNotAllowed.to_string(),
            "Method Not Allowed"
        );
    }
}

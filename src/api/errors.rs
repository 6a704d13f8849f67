use crate::errors::Error;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// JSON error body returned by every endpoint
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub code: u16,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiError({}, {})", self.code, self.error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::Json(self);
        (status, body).into_response()
    }
}

/// Helper function to create API errors
pub fn api_error(status: StatusCode, error: &str) -> ApiError {
    ApiError {
        error: error.to_string(),
        message: None,
        code: status.as_u16(),
    }
}

impl ApiError {
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(msg) => api_error(StatusCode::BAD_REQUEST, &msg),
            Error::NotFound(_) => api_error(StatusCode::NOT_FOUND, "task not found"),
            Error::ProviderUnavailable => {
                api_error(StatusCode::SERVICE_UNAVAILABLE, "service not configured")
                    .with_message("KIE_API_KEY is not set, image generation is unavailable")
            }
            other => api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
                .with_message(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_error_kinds_to_status_codes() {
        let e: ApiError = Error::Validation("missing theme".to_string()).into();
        assert_eq!(e.code, 400);
        assert_eq!(e.error, "missing theme");

        let e: ApiError = Error::NotFound("abc".to_string()).into();
        assert_eq!(e.code, 404);

        let e: ApiError = Error::ProviderUnavailable.into();
        assert_eq!(e.code, 503);
        assert!(e.message.is_some());

        let e: ApiError = Error::Persistence("disk full".to_string()).into();
        assert_eq!(e.code, 500);
        assert!(e.message.unwrap().contains("disk full"));
    }

    #[test]
    fn message_is_omitted_when_absent() {
        let body = serde_json::to_value(api_error(StatusCode::NOT_FOUND, "gone")).unwrap();
        assert_eq!(body, serde_json::json!({"error": "gone", "code": 404}));
    }
}

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{
    application::error::{ConversionError, ErrorReport, UNEXPECTED},
    domain::conversion::MARKDOWN_REQUIRED,
};

pub const INVALID_JSON: &str = "Request body must be valid JSON.";
pub const BODY_TOO_LARGE: &str = "Request body is too large.";
pub const NOT_FOUND: &str = "Not found.";

/// Wire shape of every error response.
#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: &'static str,
    report: ErrorReport,
}

impl ApiError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            status,
            message,
            report: ErrorReport::from_message(source, status, detail),
        }
    }

    pub fn from_conversion(source: &'static str, error: ConversionError) -> Self {
        let status = error.status_code();
        Self {
            status,
            message: error.public_message(),
            report: ErrorReport::from_error(source, status, &error),
        }
    }

    /// Map body extraction failures onto the client-facing messages.
    pub fn from_rejection(source: &'static str, rejection: JsonRejection) -> Self {
        let detail = rejection.body_text();
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::new(source, StatusCode::PAYLOAD_TOO_LARGE, BODY_TOO_LARGE, detail);
        }
        let message = match rejection {
            JsonRejection::JsonSyntaxError(_) => INVALID_JSON,
            _ => MARKDOWN_REQUIRED,
        };
        Self::new(source, StatusCode::BAD_REQUEST, message, detail)
    }

    pub fn not_found(source: &'static str, detail: impl Into<String>) -> Self {
        Self::new(source, StatusCode::NOT_FOUND, NOT_FOUND, detail)
    }

    pub fn unexpected(source: &'static str, detail: impl Into<String>) -> Self {
        Self::new(source, StatusCode::INTERNAL_SERVER_ERROR, UNEXPECTED, detail)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &'static str {
        self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.message.to_string(),
        };
        let mut response = (self.status, Json(body)).into_response();
        self.report.attach(&mut response);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{application::export::pdf::EngineError, domain::error::DomainError};

    #[test]
    fn conversion_errors_keep_their_public_message() {
        let err = ApiError::from_conversion(
            "test",
            ConversionError::from(DomainError::validation(MARKDOWN_REQUIRED)),
        );
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), MARKDOWN_REQUIRED);

        let err = ApiError::from_conversion(
            "test",
            ConversionError::from(EngineError::Launch("boom".to_string())),
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Failed to generate PDF document.");
    }

    #[test]
    fn response_carries_report_but_not_detail() {
        let response = ApiError::unexpected("test", "secret internal detail").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert_eq!(report.messages, vec!["secret internal detail".to_string()]);
    }
}

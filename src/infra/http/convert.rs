//! Conversion endpoints.

use axum::{
    Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use serde::Deserialize;
use serde_json::Value;

use super::{HttpState, error::ApiError};
use crate::domain::conversion::ExportResult;

/// Request body shared by both endpoints. Fields are loosely typed so that a
/// wrong type reads as "missing" rather than as a malformed body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConvertPayload {
    markdown: Option<Value>,
    orientation: Option<Value>,
}

impl ConvertPayload {
    fn markdown(&mut self) -> Option<String> {
        match self.markdown.take() {
            Some(Value::String(text)) => Some(text),
            _ => None,
        }
    }

    /// Falsy values (`null`, `false`, `0`, `""`) select the default.
    /// Other non-string values are passed through so validation rejects them.
    fn orientation(&self) -> Option<String> {
        match self.orientation.as_ref()? {
            Value::Null | Value::Bool(false) => None,
            Value::String(text) => Some(text.clone()),
            Value::Number(number) if number.as_f64() == Some(0.0) => None,
            other => Some(other.to_string()),
        }
    }
}

pub(super) async fn convert_docx(
    State(state): State<HttpState>,
    payload: Result<Json<ConvertPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    const SOURCE: &str = "infra::http::convert::convert_docx";

    let Json(mut payload) = payload.map_err(|rejection| ApiError::from_rejection(SOURCE, rejection))?;
    let result = state
        .conversions
        .convert_docx(payload.markdown())
        .await
        .map_err(|err| ApiError::from_conversion(SOURCE, err))?;

    Ok(attachment(result))
}

pub(super) async fn convert_pdf(
    State(state): State<HttpState>,
    payload: Result<Json<ConvertPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    const SOURCE: &str = "infra::http::convert::convert_pdf";

    let Json(mut payload) = payload.map_err(|rejection| ApiError::from_rejection(SOURCE, rejection))?;
    let orientation = payload.orientation();
    let result = state
        .conversions
        .convert_pdf(payload.markdown(), orientation.as_deref())
        .await
        .map_err(|err| ApiError::from_conversion(SOURCE, err))?;

    Ok(attachment(result))
}

fn attachment(result: ExportResult) -> Response {
    let ExportResult {
        bytes,
        suggested_filename,
        mime_type,
    } = result;

    let len = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(mime_type));
    if let Ok(value) =
        HeaderValue::from_str(&format!("attachment; filename=\"{suggested_filename}\""))
    {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
        headers.insert(header::CONTENT_LENGTH, value);
    }
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

    response
}

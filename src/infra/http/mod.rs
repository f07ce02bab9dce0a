//! HTTP surface: routing, handlers, error framing and middleware.

mod convert;
mod error;
mod middleware;

pub use convert::ConvertPayload;
pub use error::{ApiError, ApiErrorBody, BODY_TOO_LARGE, INVALID_JSON, NOT_FOUND};
pub use middleware::{REQUEST_ID_HEADER, RequestContext};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::Uri,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::{application::convert::ConversionService, infra::assets};

use self::middleware::{catch_panics, log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub conversions: ConversionService,
}

impl HttpState {
    pub fn new(conversions: ConversionService) -> Self {
        Self { conversions }
    }
}

pub fn build_router(state: HttpState, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/", get(assets::serve_index))
        .route("/convert/docx", post(convert::convert_docx))
        .route("/convert/pdf", post(convert::convert_pdf))
        .route("/{*path}", get(assets::serve_static))
        .fallback(not_found)
        .method_not_allowed_fallback(not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(axum_middleware::from_fn(catch_panics))
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn not_found(uri: Uri) -> Response {
    ApiError::not_found(
        "infra::http::not_found",
        format!("no route for `{}`", uri.path()),
    )
    .into_response()
}

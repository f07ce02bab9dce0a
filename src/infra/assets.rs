//! Embedded static client served by the HTTP layer.

use axum::{
    body::Body,
    extract::Path,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use include_dir::{Dir, include_dir};
use mime_guess::Mime;

use crate::infra::http::ApiError;

static STATIC_ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/static");

const INDEX: &str = "index.html";

/// `GET /`: the client page.
pub async fn serve_index() -> Response {
    match resolve_asset(INDEX) {
        Some(asset) => asset.into_response(),
        None => ApiError::unexpected("infra::assets::serve_index", "index.html is not embedded")
            .into_response(),
    }
}

/// `GET /{*path}`: any other embedded file, or a JSON 404.
pub async fn serve_static(Path(path): Path<String>) -> Response {
    match resolve_asset(&path) {
        Some(asset) => asset.into_response(),
        None => ApiError::not_found(
            "infra::assets::serve_static",
            format!("no static asset at `{path}`"),
        )
        .into_response(),
    }
}

struct Asset {
    contents: &'static [u8],
    mime: Mime,
    cache_control: &'static str,
}

fn resolve_asset(path: &str) -> Option<Asset> {
    let candidate = path.trim_start_matches('/');

    // No traversal, no directory listings.
    if candidate.is_empty() || candidate.ends_with('/') || candidate.contains("..") {
        return None;
    }

    let file = STATIC_ASSETS.get_file(candidate)?;
    let cache_control = if candidate == INDEX {
        "no-cache"
    } else {
        "public, max-age=3600"
    };

    Some(Asset {
        contents: file.contents(),
        mime: mime_guess::from_path(candidate).first_or_octet_stream(),
        cache_control,
    })
}

impl IntoResponse for Asset {
    fn into_response(self) -> Response {
        let bytes = Bytes::from_static(self.contents);
        let len = bytes.len();
        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = StatusCode::OK;

        let headers = response.headers_mut();
        if let Ok(value) = HeaderValue::from_str(self.mime.as_ref()) {
            headers.insert(header::CONTENT_TYPE, value);
        }
        if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
            headers.insert(header::CONTENT_LENGTH, value);
        }
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(self.cache_control),
        );

        response
    }
}

//! End-to-end tests of the HTTP surface with an in-process PDF engine.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use markdraft::application::{
    compose::TemplateComposer,
    convert::ConversionService,
    export::{
        docx::HtmlDocxExporter,
        pdf::{EngineError, EngineLauncher, EnginePdfExporter, PrintOptions, RenderEngine},
    },
    render::ComrakRenderService,
};
use markdraft::infra::http::{BODY_TOO_LARGE, HttpState, INVALID_JSON, NOT_FOUND, build_router};

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const MARKDOWN_REQUIRED: &str = "Markdown content is required.";
const ENGINE_TIMEOUT: &str = "PDF generation timed out or the rendering engine failed. The document might be too complex or large for current resources.";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Failure {
    None,
    Launch,
    Load,
    Print,
}

#[derive(Default)]
struct EngineStats {
    launched: AtomicUsize,
    live: AtomicUsize,
    loaded_html: Mutex<Vec<String>>,
    printed: Mutex<Vec<PrintOptions>>,
}

struct StubLauncher {
    failure: Failure,
    message: &'static str,
    stats: Arc<EngineStats>,
}

#[async_trait]
impl EngineLauncher for StubLauncher {
    async fn launch(&self) -> Result<Box<dyn RenderEngine>, EngineError> {
        if self.failure == Failure::Launch {
            return Err(EngineError::Launch(self.message.to_string()));
        }
        self.stats.launched.fetch_add(1, Ordering::SeqCst);
        self.stats.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubEngine {
            failure: self.failure,
            message: self.message,
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct StubEngine {
    failure: Failure,
    message: &'static str,
    stats: Arc<EngineStats>,
}

#[async_trait]
impl RenderEngine for StubEngine {
    async fn load(&mut self, html: &str) -> Result<(), EngineError> {
        if self.failure == Failure::Load {
            return Err(EngineError::Load(self.message.to_string()));
        }
        self.stats
            .loaded_html
            .lock()
            .expect("html lock")
            .push(html.to_string());
        Ok(())
    }

    async fn print(&mut self, options: &PrintOptions) -> Result<Vec<u8>, EngineError> {
        if self.failure == Failure::Print {
            return Err(EngineError::Print(self.message.to_string()));
        }
        self.stats.printed.lock().expect("print lock").push(*options);
        Ok(b"%PDF-1.7\n%stub\n".to_vec())
    }

    async fn close(self: Box<Self>) {
        self.stats.live.fetch_sub(1, Ordering::SeqCst);
    }
}

fn app_with(failure: Failure, message: &'static str, body_limit: usize) -> (Router, Arc<EngineStats>) {
    let stats = Arc::new(EngineStats::default());
    let launcher = StubLauncher {
        failure,
        message,
        stats: Arc::clone(&stats),
    };
    let conversions = ConversionService::new(
        Arc::new(ComrakRenderService::default()),
        Arc::new(TemplateComposer::load().expect("templates load")),
        Arc::new(HtmlDocxExporter::new()),
        Arc::new(EnginePdfExporter::new(Arc::new(launcher))),
    );
    (build_router(HttpState::new(conversions), body_limit), stats)
}

fn app() -> (Router, Arc<EngineStats>) {
    app_with(Failure::None, "", 10 * 1024 * 1024)
}

fn post_json(path: &str, body: Value) -> Request<Body> {
    post_raw(path, body.to_string())
}

fn post_raw(path: &str, body: impl Into<String>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.into()))
        .expect("request builds")
}

async fn send(router: &Router, request: Request<Body>) -> Response {
    router
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond")
}

async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes()
        .to_vec()
}

async fn error_message(response: Response) -> String {
    let body: Value = serde_json::from_slice(&body_bytes(response).await).expect("json error body");
    body["error"].as_str().expect("error field").to_string()
}

fn header_str<'a>(response: &'a Response, name: header::HeaderName) -> &'a str {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn docx_endpoint_returns_a_word_attachment() {
    let (router, stats) = app();
    let response = send(
        &router,
        post_json("/convert/docx", json!({ "markdown": "# Report\n\n- one\n- two" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, header::CONTENT_TYPE), DOCX_MIME);
    assert_eq!(
        header_str(&response, header::CONTENT_DISPOSITION),
        "attachment; filename=\"MarkDraft_converted.docx\""
    );
    assert!(response.headers().contains_key("x-request-id"));

    let bytes = body_bytes(response).await;
    assert!(bytes.starts_with(b"PK"));
    assert_eq!(stats.launched.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn docx_endpoint_ignores_orientation() {
    let (router, _) = app();
    let response = send(
        &router,
        post_json("/convert/docx", json!({ "markdown": "text", "orientation": "sideways" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn docx_endpoint_survives_deeply_nested_input() {
    let (router, _) = app();
    let inputs = [
        format!("{}x", "> ".repeat(5000)),
        "<div>".repeat(5000),
        format!("{}item", "- ".repeat(2000)),
    ];
    for markdown in inputs {
        let response = send(&router, post_json("/convert/docx", json!({ "markdown": markdown }))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_bytes(response).await.starts_with(b"PK"));
    }
}

#[tokio::test]
async fn pdf_endpoint_names_the_file_after_the_orientation() {
    let (router, stats) = app();

    let response = send(
        &router,
        post_json("/convert/pdf", json!({ "markdown": "# Wide", "orientation": "Landscape" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, header::CONTENT_TYPE), "application/pdf");
    assert_eq!(
        header_str(&response, header::CONTENT_DISPOSITION),
        "attachment; filename=\"MarkDraft_landscape.pdf\""
    );
    assert!(body_bytes(response).await.starts_with(b"%PDF"));

    let response = send(&router, post_json("/convert/pdf", json!({ "markdown": "# Tall" }))).await;
    assert_eq!(
        header_str(&response, header::CONTENT_DISPOSITION),
        "attachment; filename=\"MarkDraft_portrait.pdf\""
    );

    let printed = stats.printed.lock().expect("print lock").clone();
    assert_eq!(printed.len(), 2);
    assert!(printed[0].landscape);
    assert!(!printed[1].landscape);
    assert_eq!(stats.launched.load(Ordering::SeqCst), 2);
    assert_eq!(stats.live.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn pdf_engine_receives_the_styled_document_with_raw_html_intact() {
    let (router, stats) = app();
    let markdown = "# Title\n\n<div class=\"note\"><script>window.marker = 1;</script></div>\n";
    let response = send(&router, post_json("/convert/pdf", json!({ "markdown": markdown }))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let loaded = stats.loaded_html.lock().expect("html lock").clone();
    assert_eq!(loaded.len(), 1);
    assert!(loaded[0].starts_with("<!DOCTYPE html>"));
    assert!(loaded[0].contains("<h1>Title</h1>"));
    assert!(loaded[0].contains("<script>window.marker = 1;</script>"));
}

#[tokio::test]
async fn invalid_input_never_launches_an_engine() {
    let (router, stats) = app();

    let cases = [
        json!({}),
        json!({ "markdown": "" }),
        json!({ "markdown": "  \n\t " }),
        json!({ "markdown": 42 }),
        json!({ "markdown": null }),
    ];
    for body in cases {
        for path in ["/convert/docx", "/convert/pdf"] {
            let response = send(&router, post_json(path, body.clone())).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{path} {body}");
            assert_eq!(error_message(response).await, MARKDOWN_REQUIRED);
        }
    }

    let response = send(
        &router,
        post_json("/convert/pdf", json!({ "markdown": "# x", "orientation": "diagonal" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_message(response).await,
        "Orientation must be either \"portrait\" or \"landscape\"."
    );

    assert_eq!(stats.launched.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_bodies_get_json_errors() {
    let (router, _) = app();

    let response = send(&router, post_raw("/convert/docx", "{ not json")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, INVALID_JSON);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/convert/pdf")
        .body(Body::from("markdown=hello"))
        .expect("request builds");
    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, MARKDOWN_REQUIRED);
}

#[tokio::test]
async fn oversized_bodies_are_refused() {
    let (router, stats) = app_with(Failure::None, "", 256);
    let markdown = "a".repeat(1024);
    let response = send(&router, post_json("/convert/pdf", json!({ "markdown": markdown }))).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(error_message(response).await, BODY_TOO_LARGE);
    assert_eq!(stats.launched.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn engine_failures_are_classified_and_engines_are_released() {
    let cases = [
        (Failure::Load, "Navigation timeout of 30000 ms exceeded", ENGINE_TIMEOUT),
        (Failure::Print, "net::ERR_CONNECTION_REFUSED", ENGINE_TIMEOUT),
        (
            Failure::Print,
            "Out of memory",
            "PDF generation failed due to insufficient memory resources.",
        ),
        (Failure::Launch, "spawn failed", "Failed to generate PDF document."),
    ];

    for (failure, message, expected) in cases {
        let (router, stats) = app_with(failure, message, 1024 * 1024);
        let response =
            send(&router, post_json("/convert/pdf", json!({ "markdown": "# x" }))).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "{message}");
        assert_eq!(error_message(response).await, expected);
        assert_eq!(stats.live.load(Ordering::SeqCst), 0, "{message}");
    }
}

#[tokio::test]
async fn unknown_routes_and_methods_answer_with_json_404() {
    let (router, _) = app();

    let request = Request::builder()
        .uri("/nope.txt")
        .body(Body::empty())
        .expect("request builds");
    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_message(response).await, NOT_FOUND);

    let request = Request::builder()
        .method(Method::GET)
        .uri("/convert/docx")
        .body(Body::empty())
        .expect("request builds");
    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_message(response).await, NOT_FOUND);
}

#[tokio::test]
async fn client_page_and_assets_are_served() {
    let (router, _) = app();

    let request = Request::builder()
        .uri("/")
        .body(Body::empty())
        .expect("request builds");
    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(header_str(&response, header::CONTENT_TYPE).starts_with("text/html"));
    let page = String::from_utf8(body_bytes(response).await).expect("utf8 page");
    assert!(page.contains("markdownInput"));
    assert!(page.contains("/script.js"));

    for (path, mime) in [("/script.js", "javascript"), ("/style.css", "text/css")] {
        let request = Request::builder()
            .uri(path)
            .body(Body::empty())
            .expect("request builds");
        let response = send(&router, request).await;
        assert_eq!(response.status(), StatusCode::OK, "{path}");
        assert!(header_str(&response, header::CONTENT_TYPE).contains(mime), "{path}");
    }
}

#[tokio::test]
async fn orientation_changes_print_options_but_not_content() {
    let (router, stats) = app();
    let markdown = "# Title\n\nHello **world**.";

    for orientation in ["portrait", "landscape"] {
        let response = send(
            &router,
            post_json(
                "/convert/pdf",
                json!({ "markdown": markdown, "orientation": orientation }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK, "{orientation}");
    }

    let loaded = stats.loaded_html.lock().expect("html lock").clone();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0], loaded[1]);
    assert!(loaded[0].contains("<strong>world</strong>"));
}

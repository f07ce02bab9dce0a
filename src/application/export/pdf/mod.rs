//! PDF exporter backed by a headless rendering engine.
//!
//! Each export launches its own engine, loads the styled document, waits for
//! the content to settle and prints it. The engine is closed on every path,
//! including failures and cancellation, through [`EngineSession`].

mod chromium;
mod session;

use std::{sync::Arc, time::Instant};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::conversion::{Orientation, StyledDocument};

pub use chromium::ChromiumLauncher;
pub use session::{EngineSession, SessionState};

pub const METRIC_ENGINE_LAUNCHES: &str = "markdraft_render_engine_launch_total";
pub const METRIC_ENGINES_LIVE: &str = "markdraft_render_engines_live";

const MM_PER_INCH: f64 = 25.4;

/// Page setup handed to the engine's print call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrintOptions {
    pub landscape: bool,
    pub print_background: bool,
    pub prefer_css_page_size: bool,
    pub margin_top_mm: f64,
    pub margin_bottom_mm: f64,
    pub margin_left_mm: f64,
    pub margin_right_mm: f64,
}

impl PrintOptions {
    pub fn for_orientation(orientation: Orientation) -> Self {
        Self {
            landscape: orientation.is_landscape(),
            print_background: true,
            prefer_css_page_size: false,
            margin_top_mm: 20.0,
            margin_bottom_mm: 20.0,
            margin_left_mm: 15.0,
            margin_right_mm: 15.0,
        }
    }

    pub(crate) fn inches(mm: f64) -> f64 {
        mm / MM_PER_INCH
    }
}

/// Coarse failure class used to pick the message shown to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineFailure {
    Timeout,
    ConnectionRefused,
    OutOfMemory,
    Failed,
}

impl EngineFailure {
    pub fn classify(message: &str) -> Self {
        let lowered = message.to_ascii_lowercase();
        if lowered.contains("timeout") || lowered.contains("timed out") {
            EngineFailure::Timeout
        } else if lowered.contains("err_connection_refused")
            || lowered.contains("connection refused")
        {
            EngineFailure::ConnectionRefused
        } else if lowered.contains("memory") {
            EngineFailure::OutOfMemory
        } else {
            EngineFailure::Failed
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EngineFailure::Timeout => "timeout",
            EngineFailure::ConnectionRefused => "connection_refused",
            EngineFailure::OutOfMemory => "out_of_memory",
            EngineFailure::Failed => "failed",
        }
    }

    pub fn public_message(self) -> &'static str {
        match self {
            EngineFailure::Timeout | EngineFailure::ConnectionRefused => {
                "PDF generation timed out or the rendering engine failed. The document might be too complex or large for current resources."
            }
            EngineFailure::OutOfMemory => {
                "PDF generation failed due to insufficient memory resources."
            }
            EngineFailure::Failed => "Failed to generate PDF document.",
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to launch rendering engine: {0}")]
    Launch(String),
    #[error("failed to load document: {0}")]
    Load(String),
    #[error("failed to print document: {0}")]
    Print(String),
    #[error("rendering session is not ready: {0}")]
    Session(&'static str),
}

impl EngineError {
    pub fn failure(&self) -> EngineFailure {
        match self {
            EngineError::Launch(message)
            | EngineError::Load(message)
            | EngineError::Print(message) => EngineFailure::classify(message),
            EngineError::Session(_) => EngineFailure::Failed,
        }
    }
}

/// Starts a fresh engine for one export.
#[async_trait]
pub trait EngineLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn RenderEngine>, EngineError>;
}

/// A running engine instance with a single page.
#[async_trait]
pub trait RenderEngine: Send {
    /// Load `html` and wait until its resources have settled.
    async fn load(&mut self, html: &str) -> Result<(), EngineError>;

    async fn print(&mut self, options: &PrintOptions) -> Result<Vec<u8>, EngineError>;

    /// Release every resource the engine holds. Must not fail.
    async fn close(self: Box<Self>);
}

#[async_trait]
pub trait PdfExporter: Send + Sync {
    async fn export(
        &self,
        document: &StyledDocument,
        orientation: Orientation,
    ) -> Result<Vec<u8>, EngineError>;
}

#[derive(Clone)]
pub struct EnginePdfExporter {
    launcher: Arc<dyn EngineLauncher>,
}

impl EnginePdfExporter {
    pub fn new(launcher: Arc<dyn EngineLauncher>) -> Self {
        Self { launcher }
    }
}

#[async_trait]
impl PdfExporter for EnginePdfExporter {
    async fn export(
        &self,
        document: &StyledDocument,
        orientation: Orientation,
    ) -> Result<Vec<u8>, EngineError> {
        let started_at = Instant::now();
        let options = PrintOptions::for_orientation(orientation);

        let mut session = EngineSession::launch(self.launcher.as_ref()).await?;
        let result = session.render(&document.complete_html, &options).await;
        session.close().await;

        match &result {
            Ok(bytes) => info!(
                target = "application::export::pdf",
                op = "pdf::export",
                result = "ok",
                orientation = orientation.as_str(),
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                pdf_bytes = bytes.len(),
                "PDF printed"
            ),
            Err(err) => warn!(
                target = "application::export::pdf",
                op = "pdf::export",
                result = "error",
                failure = err.failure().as_str(),
                orientation = orientation.as_str(),
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                error = %err,
                "PDF export failed"
            ),
        }

        result
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::{testing::*, *};

    fn document() -> StyledDocument {
        StyledDocument {
            complete_html: "<html><body><h1>x</h1></body></html>".to_string(),
        }
    }

    #[test]
    fn classification_follows_message_content() {
        assert_eq!(
            EngineFailure::classify("Navigation Timeout Exceeded"),
            EngineFailure::Timeout
        );
        assert_eq!(
            EngineFailure::classify("request timed out after 30s"),
            EngineFailure::Timeout
        );
        assert_eq!(
            EngineFailure::classify("net::ERR_CONNECTION_REFUSED"),
            EngineFailure::ConnectionRefused
        );
        assert_eq!(
            EngineFailure::classify("Out of memory"),
            EngineFailure::OutOfMemory
        );
        assert_eq!(
            EngineFailure::classify("Target closed"),
            EngineFailure::Failed
        );
    }

    #[test]
    fn timeout_and_refused_share_a_message() {
        assert_eq!(
            EngineFailure::Timeout.public_message(),
            EngineFailure::ConnectionRefused.public_message()
        );
        assert_eq!(
            EngineFailure::Failed.public_message(),
            "Failed to generate PDF document."
        );
    }

    #[test]
    fn print_options_follow_orientation_and_margins() {
        let portrait = PrintOptions::for_orientation(Orientation::Portrait);
        let landscape = PrintOptions::for_orientation(Orientation::Landscape);
        assert!(!portrait.landscape);
        assert!(landscape.landscape);
        assert!(portrait.print_background);
        assert!(!portrait.prefer_css_page_size);
        assert_eq!(portrait.margin_top_mm, 20.0);
        assert_eq!(portrait.margin_left_mm, 15.0);
        assert!((PrintOptions::inches(25.4) - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn successful_export_closes_the_engine() {
        let launcher = Arc::new(FakeLauncher::new(FailAt::Nowhere, ""));
        let counters = Arc::clone(&launcher.counters);
        let exporter = EnginePdfExporter::new(launcher);

        let bytes = exporter
            .export(&document(), Orientation::Landscape)
            .await
            .expect("export succeeds");

        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(counters.launched.load(Ordering::SeqCst), 1);
        assert_eq!(counters.live.load(Ordering::SeqCst), 0);
        let printed = counters.printed.lock().expect("lock");
        assert!(printed[0].landscape);
    }

    #[tokio::test]
    async fn failed_print_still_closes_the_engine() {
        let launcher = Arc::new(FakeLauncher::new(FailAt::Print, "Protocol error: timed out"));
        let counters = Arc::clone(&launcher.counters);
        let exporter = EnginePdfExporter::new(launcher);

        let err = exporter
            .export(&document(), Orientation::Portrait)
            .await
            .expect_err("print fails");

        assert_eq!(err.failure(), EngineFailure::Timeout);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
        assert_eq!(counters.live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_launch_leaves_nothing_running() {
        let launcher = Arc::new(FakeLauncher::new(FailAt::Launch, "spawn failed"));
        let counters = Arc::clone(&launcher.counters);
        let exporter = EnginePdfExporter::new(launcher);

        let err = exporter
            .export(&document(), Orientation::Portrait)
            .await
            .expect_err("launch fails");

        assert!(matches!(err, EngineError::Launch(_)));
        assert_eq!(counters.launched.load(Ordering::SeqCst), 0);
        assert_eq!(counters.live.load(Ordering::SeqCst), 0);
    }
}

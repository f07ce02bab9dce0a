use std::time::Instant;

use tracing::{debug, warn};

use super::{
    EngineError, EngineLauncher, METRIC_ENGINE_LAUNCHES, METRIC_ENGINES_LIVE, PrintOptions,
    RenderEngine,
};

/// Lifecycle of one engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    EngineLaunching,
    PageLoading,
    ContentLoaded,
    Rendering,
    Rendered,
    EngineClosed { failed: bool },
}

/// Owns a launched engine until it is closed.
///
/// `close` must be awaited on every path. If the session is dropped while the
/// engine is still open (a cancelled request, a panic in the caller) the drop
/// hands the engine to the runtime to be closed in the background.
pub struct EngineSession {
    engine: Option<Box<dyn RenderEngine>>,
    state: SessionState,
    failed: bool,
    started_at: Instant,
}

impl EngineSession {
    pub async fn launch(launcher: &dyn EngineLauncher) -> Result<Self, EngineError> {
        let mut session = Self {
            engine: None,
            state: SessionState::Uninitialized,
            failed: false,
            started_at: Instant::now(),
        };
        session.state = SessionState::EngineLaunching;

        match launcher.launch().await {
            Ok(engine) => {
                metrics::counter!(METRIC_ENGINE_LAUNCHES).increment(1);
                metrics::gauge!(METRIC_ENGINES_LIVE).increment(1.0);
                debug!(
                    target = "application::export::pdf",
                    op = "session::launch",
                    result = "ok",
                    elapsed_ms = session.started_at.elapsed().as_millis() as u64,
                    "Rendering engine launched"
                );
                session.engine = Some(engine);
                Ok(session)
            }
            Err(err) => {
                session.state = SessionState::EngineClosed { failed: true };
                Err(err)
            }
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Load `html`, wait for it to settle and print it.
    pub async fn render(
        &mut self,
        html: &str,
        options: &PrintOptions,
    ) -> Result<Vec<u8>, EngineError> {
        let result = self.render_inner(html, options).await;
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    async fn render_inner(
        &mut self,
        html: &str,
        options: &PrintOptions,
    ) -> Result<Vec<u8>, EngineError> {
        if self.state != SessionState::EngineLaunching {
            return Err(EngineError::Session("render called twice or after close"));
        }
        let engine = self
            .engine
            .as_mut()
            .ok_or(EngineError::Session("engine is not running"))?;

        self.state = SessionState::PageLoading;
        engine.load(html).await?;
        self.state = SessionState::ContentLoaded;

        self.state = SessionState::Rendering;
        let bytes = engine.print(options).await?;
        self.state = SessionState::Rendered;

        Ok(bytes)
    }

    /// Close the engine. Safe to call more than once.
    pub async fn close(&mut self) {
        let Some(engine) = self.engine.take() else {
            return;
        };
        engine.close().await;
        metrics::gauge!(METRIC_ENGINES_LIVE).decrement(1.0);
        self.state = SessionState::EngineClosed {
            failed: self.failed,
        };
        debug!(
            target = "application::export::pdf",
            op = "session::close",
            failed = self.failed,
            elapsed_ms = self.started_at.elapsed().as_millis() as u64,
            "Rendering engine closed"
        );
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        let Some(engine) = self.engine.take() else {
            return;
        };
        warn!(
            target = "application::export::pdf",
            op = "session::drop",
            state = ?self.state,
            "Rendering session dropped with a live engine; closing in background"
        );
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    engine.close().await;
                    metrics::gauge!(METRIC_ENGINES_LIVE).decrement(1.0);
                });
            }
            Err(_) => {
                // No runtime left to drive an async close; dropping the engine
                // releases whatever its own destructor can.
                metrics::gauge!(METRIC_ENGINES_LIVE).decrement(1.0);
                drop(engine);
            }
        }
    }
}

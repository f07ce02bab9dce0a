use std::{fmt::Display, future::Future, path::PathBuf, time::Duration};

use async_trait::async_trait;
use chromiumoxide::{
    Browser, BrowserConfig, Page,
    cdp::{browser_protocol::page::PrintToPdfParams, js_protocol::runtime::EvaluateParams},
};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{EngineError, EngineLauncher, PrintOptions, RenderEngine};

const LAUNCH_ARGS: [&str; 3] = [
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--font-render-hinting=none",
];

/// Resolves once the document, its images and its web fonts have finished
/// loading and no further resource has completed for a 500 ms window.
/// Completed resource timings stand in for in-flight request tracking.
const SETTLE_SCRIPT: &str = r#"(async () => {
  if (document.readyState !== "complete") {
    await new Promise((resolve) => window.addEventListener("load", resolve, { once: true }));
  }
  await Promise.all(Array.from(document.images, (img) => img.complete ? null : new Promise((resolve) => {
    img.addEventListener("load", resolve, { once: true });
    img.addEventListener("error", resolve, { once: true });
  })));
  if (document.fonts && document.fonts.ready) {
    await document.fonts.ready;
  }
  const finished = () => performance.getEntriesByType("resource").length;
  let seen = -1;
  while (seen !== finished()) {
    seen = finished();
    await new Promise((resolve) => setTimeout(resolve, 500));
  }
  return true;
})()"#;

/// Launches a headless Chromium per export.
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    executable: Option<PathBuf>,
    step_timeout: Duration,
}

impl ChromiumLauncher {
    pub fn new(executable: Option<PathBuf>, step_timeout: Duration) -> Self {
        Self {
            executable,
            step_timeout,
        }
    }

    fn config(&self) -> Result<BrowserConfig, EngineError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(self.step_timeout);
        for arg in LAUNCH_ARGS {
            builder = builder.arg(arg);
        }
        if let Some(executable) = &self.executable {
            builder = builder.chrome_executable(executable);
        }
        builder.build().map_err(EngineError::Launch)
    }
}

#[async_trait]
impl EngineLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn RenderEngine>, EngineError> {
        let config = self.config()?;
        let (browser, mut handler) = within(
            self.step_timeout,
            "launch",
            Browser::launch(config),
            EngineError::Launch,
        )
        .await?;

        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(
                        target = "application::export::pdf",
                        op = "chromium::handler",
                        error = %err,
                        "Browser event loop stopped"
                    );
                    break;
                }
            }
        });

        Ok(Box::new(ChromiumEngine {
            browser,
            events,
            page: None,
            step_timeout: self.step_timeout,
        }))
    }
}

struct ChromiumEngine {
    browser: Browser,
    events: JoinHandle<()>,
    page: Option<Page>,
    step_timeout: Duration,
}

impl ChromiumEngine {
    fn page(&self) -> Result<&Page, EngineError> {
        self.page
            .as_ref()
            .ok_or(EngineError::Session("no document loaded"))
    }
}

#[async_trait]
impl RenderEngine for ChromiumEngine {
    async fn load(&mut self, html: &str) -> Result<(), EngineError> {
        let page = within(
            self.step_timeout,
            "new page",
            self.browser.new_page("about:blank"),
            EngineError::Load,
        )
        .await?;

        within(
            self.step_timeout,
            "set content",
            page.set_content(html),
            EngineError::Load,
        )
        .await?;

        let settle = EvaluateParams::builder()
            .expression(SETTLE_SCRIPT)
            .await_promise(true)
            .build()
            .map_err(EngineError::Load)?;
        within(
            self.step_timeout,
            "settle",
            page.evaluate(settle),
            EngineError::Load,
        )
        .await?;

        self.page = Some(page);
        Ok(())
    }

    async fn print(&mut self, options: &PrintOptions) -> Result<Vec<u8>, EngineError> {
        let params = PrintToPdfParams {
            landscape: Some(options.landscape),
            print_background: Some(options.print_background),
            prefer_css_page_size: Some(options.prefer_css_page_size),
            margin_top: Some(PrintOptions::inches(options.margin_top_mm)),
            margin_bottom: Some(PrintOptions::inches(options.margin_bottom_mm)),
            margin_left: Some(PrintOptions::inches(options.margin_left_mm)),
            margin_right: Some(PrintOptions::inches(options.margin_right_mm)),
            ..Default::default()
        };

        let page = self.page()?;
        within(self.step_timeout, "print", page.pdf(params), EngineError::Print).await
    }

    async fn close(mut self: Box<Self>) {
        if let Some(page) = self.page.take()
            && let Err(err) = page.close().await
        {
            debug!(
                target = "application::export::pdf",
                op = "chromium::close",
                error = %err,
                "Page close failed"
            );
        }

        let closed = match tokio::time::timeout(self.step_timeout, self.browser.close()).await {
            Ok(Ok(_)) => tokio::time::timeout(self.step_timeout, self.browser.wait())
                .await
                .is_ok_and(|status| status.is_ok()),
            Ok(Err(err)) => {
                warn!(
                    target = "application::export::pdf",
                    op = "chromium::close",
                    error = %err,
                    "Browser refused to close; killing the process"
                );
                false
            }
            Err(_) => false,
        };

        if !closed && let Some(Err(err)) = self.browser.kill().await {
            warn!(
                target = "application::export::pdf",
                op = "chromium::close",
                error = %err,
                "Failed to kill browser process"
            );
        }

        self.events.abort();
    }
}

/// Bound one engine step by `limit`. Timeouts carry "timed out" in their
/// message so they classify as such.
async fn within<T, E: Display>(
    limit: Duration,
    step: &'static str,
    future: impl Future<Output = Result<T, E>>,
    wrap: fn(String) -> EngineError,
) -> Result<T, EngineError> {
    match tokio::time::timeout(limit, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(wrap(err.to_string())),
        Err(_) => Err(wrap(format!("{step} timed out after {}s", limit.as_secs()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settle_waits_for_a_quiet_resource_window() {
        assert!(SETTLE_SCRIPT.contains("getEntriesByType(\"resource\")"));
        assert!(SETTLE_SCRIPT.contains("while (seen !== finished())"));
    }

    #[tokio::test]
    async fn slow_steps_time_out_with_a_classifiable_message() {
        let err = within(
            Duration::from_millis(10),
            "settle",
            std::future::pending::<Result<(), String>>(),
            EngineError::Load,
        )
        .await
        .expect_err("step times out");
        assert!(err.to_string().contains("settle timed out"));
    }
}

use comrak::markdown_to_html;

use crate::domain::conversion::RenderedDocument;

use super::options::default_options;

/// Converts Markdown source text into an HTML fragment.
///
/// Implementations must accept any string, including empty or malformed
/// input, and never fail.
pub trait RenderService: Send + Sync {
    fn render(&self, markdown: &str) -> RenderedDocument;
}

/// Comrak-backed renderer configured once at construction.
pub struct ComrakRenderService {
    options: comrak::Options<'static>,
}

impl ComrakRenderService {
    pub fn new() -> Self {
        Self {
            options: default_options(),
        }
    }
}

impl Default for ComrakRenderService {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderService for ComrakRenderService {
    fn render(&self, markdown: &str) -> RenderedDocument {
        RenderedDocument {
            html_fragment: markdown_to_html(markdown, &self.options),
        }
    }
}

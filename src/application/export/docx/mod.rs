//! Word exporter.
//!
//! The styled document is parsed as HTML, its `<style>` block is read for the
//! handful of properties that have a WordprocessingML counterpart, and the body
//! is written out as paragraphs, lists and tables. Table rows are never split
//! across pages and the output carries no header or footer parts.

mod stylesheet;
mod writer;

use std::io::Cursor;

use thiserror::Error;

use crate::domain::conversion::StyledDocument;

#[derive(Debug, Error)]
pub enum DocxExportError {
    #[error("failed to package word document: {0}")]
    Package(String),
}

/// Synchronous, CPU-bound conversion. Callers on an async runtime should run
/// it on a blocking thread.
pub trait DocxExporter: Send + Sync {
    fn export(&self, document: &StyledDocument) -> Result<Vec<u8>, DocxExportError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlDocxExporter;

impl HtmlDocxExporter {
    pub fn new() -> Self {
        Self
    }
}

impl DocxExporter for HtmlDocxExporter {
    fn export(&self, document: &StyledDocument) -> Result<Vec<u8>, DocxExportError> {
        let docx = writer::build_document(&document.complete_html);

        let mut buffer = Cursor::new(Vec::new());
        docx.build()
            .pack(&mut buffer)
            .map_err(|err| DocxExportError::Package(err.to_string()))?;

        Ok(buffer.into_inner())
    }
}

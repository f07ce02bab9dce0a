//! The conversion pipeline: validate, render, compose, export.

use std::{sync::Arc, time::Instant};

use tracing::{info, warn};

use crate::{
    application::{
        compose::{TemplateComposer, TemplateProfile},
        error::ConversionError,
        export::{docx::DocxExporter, pdf::PdfExporter},
        render::RenderService,
    },
    domain::conversion::{ConversionRequest, DocumentFormat, ExportResult, StyledDocument},
};

pub const METRIC_CONVERSIONS: &str = "markdraft_conversions_total";
pub const METRIC_CONVERSION_MS: &str = "markdraft_conversion_ms";

/// Owns the collaborators of a conversion. Cheap to clone; every clone
/// shares the same renderer, composer and exporters.
#[derive(Clone)]
pub struct ConversionService {
    renderer: Arc<dyn RenderService>,
    composer: Arc<TemplateComposer>,
    docx: Arc<dyn DocxExporter>,
    pdf: Arc<dyn PdfExporter>,
}

impl ConversionService {
    pub fn new(
        renderer: Arc<dyn RenderService>,
        composer: Arc<TemplateComposer>,
        docx: Arc<dyn DocxExporter>,
        pdf: Arc<dyn PdfExporter>,
    ) -> Self {
        Self {
            renderer,
            composer,
            docx,
            pdf,
        }
    }

    pub async fn convert(
        &self,
        format: DocumentFormat,
        markdown: Option<String>,
        orientation: Option<&str>,
    ) -> Result<ExportResult, ConversionError> {
        match format {
            DocumentFormat::Docx => self.convert_docx(markdown).await,
            DocumentFormat::Pdf => self.convert_pdf(markdown, orientation).await,
        }
    }

    /// Orientation does not apply to Word output and is not read.
    pub async fn convert_docx(
        &self,
        markdown: Option<String>,
    ) -> Result<ExportResult, ConversionError> {
        let started_at = Instant::now();
        let result = self.run_docx(markdown).await;
        record(DocumentFormat::Docx, started_at, &result);
        result
    }

    pub async fn convert_pdf(
        &self,
        markdown: Option<String>,
        orientation: Option<&str>,
    ) -> Result<ExportResult, ConversionError> {
        let started_at = Instant::now();
        let result = self.run_pdf(markdown, orientation).await;
        record(DocumentFormat::Pdf, started_at, &result);
        result
    }

    async fn run_docx(&self, markdown: Option<String>) -> Result<ExportResult, ConversionError> {
        let request = ConversionRequest::new(markdown, None)?;

        let service = self.clone();
        let bytes = tokio::task::spawn_blocking(move || {
            let styled = service.style(&request, TemplateProfile::Docx);
            service.docx.export(&styled)
        })
        .await
        .map_err(|err| ConversionError::unexpected(format!("word export task failed: {err}")))??;

        Ok(ExportResult::docx(bytes))
    }

    async fn run_pdf(
        &self,
        markdown: Option<String>,
        orientation: Option<&str>,
    ) -> Result<ExportResult, ConversionError> {
        let request = ConversionRequest::new(markdown, orientation)?;
        let orientation = request.orientation();

        let service = self.clone();
        let styled =
            tokio::task::spawn_blocking(move || service.style(&request, TemplateProfile::Pdf))
                .await
                .map_err(|err| {
                    ConversionError::unexpected(format!("pdf styling task failed: {err}"))
                })?;

        // Detached so a client disconnect cannot interrupt the engine mid-print.
        let pdf = Arc::clone(&self.pdf);
        let bytes = tokio::spawn(async move { pdf.export(&styled, orientation).await })
            .await
            .map_err(|err| ConversionError::unexpected(format!("pdf export task failed: {err}")))??;

        Ok(ExportResult::pdf(bytes, orientation))
    }

    fn style(&self, request: &ConversionRequest, profile: TemplateProfile) -> StyledDocument {
        let rendered = self.renderer.render(request.markdown());
        self.composer.compose(profile, &rendered)
    }
}

fn record(
    format: DocumentFormat,
    started_at: Instant,
    result: &Result<ExportResult, ConversionError>,
) {
    let elapsed = started_at.elapsed();
    let outcome = match result {
        Ok(_) => "ok",
        Err(err) => err.outcome(),
    };

    metrics::counter!(METRIC_CONVERSIONS, "format" => format.as_str(), "outcome" => outcome)
        .increment(1);
    metrics::histogram!(METRIC_CONVERSION_MS, "format" => format.as_str())
        .record(elapsed.as_secs_f64() * 1000.0);

    match result {
        Ok(export) => info!(
            target = "application::convert",
            op = "convert",
            result = "ok",
            format = format.as_str(),
            filename = %export.suggested_filename,
            output_bytes = export.bytes.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Conversion finished"
        ),
        Err(err) => warn!(
            target = "application::convert",
            op = "convert",
            result = outcome,
            format = format.as_str(),
            elapsed_ms = elapsed.as_millis() as u64,
            error = %err,
            "Conversion failed"
        ),
    }
}

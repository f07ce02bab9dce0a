//! Request-scoped values that flow through a single conversion.
//!
//! Nothing here outlives the request that created it: a [`ConversionRequest`]
//! becomes a [`RenderedDocument`], then a [`StyledDocument`], then an
//! [`ExportResult`] whose bytes are handed straight to the response.

use std::{fmt, str::FromStr};

use bytes::Bytes;

use super::error::DomainError;

pub const MARKDOWN_REQUIRED: &str = "Markdown content is required.";
pub const ORIENTATION_INVALID: &str =
    "Orientation must be either \"portrait\" or \"landscape\".";
pub const UNKNOWN_FORMAT: &str = "Format must be either \"docx\" or \"pdf\".";

pub const DOCX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const PDF_MIME_TYPE: &str = "application/pdf";
pub const DOCX_FILENAME: &str = "MarkDraft_converted.docx";

/// Page layout axis for PDF output. Word output ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        }
    }

    pub fn is_landscape(self) -> bool {
        matches!(self, Orientation::Landscape)
    }

    /// Resolve an optional client value. Missing and blank values mean portrait.
    pub fn resolve(value: Option<&str>) -> Result<Self, DomainError> {
        match value.map(str::trim) {
            None | Some("") => Ok(Orientation::Portrait),
            Some(raw) => raw.parse(),
        }
    }
}

impl FromStr for Orientation {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "portrait" => Ok(Orientation::Portrait),
            "landscape" => Ok(Orientation::Landscape),
            _ => Err(DomainError::validation(ORIENTATION_INVALID)),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Docx,
    Pdf,
}

impl DocumentFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentFormat::Docx => "docx",
            DocumentFormat::Pdf => "pdf",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            DocumentFormat::Docx => DOCX_MIME_TYPE,
            DocumentFormat::Pdf => PDF_MIME_TYPE,
        }
    }
}

impl FromStr for DocumentFormat {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "docx" | "word" => Ok(DocumentFormat::Docx),
            "pdf" => Ok(DocumentFormat::Pdf),
            _ => Err(DomainError::validation(UNKNOWN_FORMAT)),
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated conversion input.
///
/// Construction is the only validation point: a value of this type always
/// carries Markdown with at least one non-whitespace character, so the
/// renderer and both exporters never see an empty document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    markdown: String,
    orientation: Orientation,
}

impl ConversionRequest {
    pub fn new(markdown: Option<String>, orientation: Option<&str>) -> Result<Self, DomainError> {
        let markdown = match markdown {
            Some(text) if !text.trim().is_empty() => text,
            _ => return Err(DomainError::validation(MARKDOWN_REQUIRED)),
        };
        let orientation = Orientation::resolve(orientation)?;

        Ok(Self {
            markdown,
            orientation,
        })
    }

    pub fn markdown(&self) -> &str {
        &self.markdown
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }
}

/// Output of the Markdown renderer: an HTML fragment without document structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub html_fragment: String,
}

/// A complete, self-contained HTML document ready for an exporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledDocument {
    pub complete_html: String,
}

/// Terminal artifact of a successful conversion.
#[derive(Debug, Clone)]
pub struct ExportResult {
    pub bytes: Bytes,
    pub suggested_filename: String,
    pub mime_type: &'static str,
}

impl ExportResult {
    pub fn docx(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            suggested_filename: DOCX_FILENAME.to_string(),
            mime_type: DOCX_MIME_TYPE,
        }
    }

    pub fn pdf(bytes: impl Into<Bytes>, orientation: Orientation) -> Self {
        Self {
            bytes: bytes.into(),
            suggested_filename: format!("MarkDraft_{orientation}.pdf"),
            mime_type: PDF_MIME_TYPE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_and_blank_markdown() {
        for input in [None, Some(String::new()), Some("  \n\t ".to_string())] {
            let err = ConversionRequest::new(input, None).expect_err("blank markdown rejected");
            assert_eq!(err.public_message(), MARKDOWN_REQUIRED);
        }
    }

    #[test]
    fn markdown_is_kept_verbatim() {
        let request =
            ConversionRequest::new(Some("  # Title\n".to_string()), None).expect("valid request");
        assert_eq!(request.markdown(), "  # Title\n");
    }

    #[test]
    fn orientation_defaults_to_portrait() {
        assert_eq!(Orientation::resolve(None).unwrap(), Orientation::Portrait);
        assert_eq!(Orientation::resolve(Some("")).unwrap(), Orientation::Portrait);
        assert_eq!(
            Orientation::resolve(Some("  ")).unwrap(),
            Orientation::Portrait
        );
    }

    #[test]
    fn orientation_parsing_is_case_insensitive() {
        assert_eq!(
            Orientation::resolve(Some("Landscape")).unwrap(),
            Orientation::Landscape
        );
        assert_eq!(
            Orientation::resolve(Some(" portrait ")).unwrap(),
            Orientation::Portrait
        );
    }

    #[test]
    fn unknown_orientation_is_a_validation_error() {
        let err = ConversionRequest::new(Some("# Hi".to_string()), Some("sideways"))
            .expect_err("unknown orientation rejected");
        assert_eq!(err.public_message(), ORIENTATION_INVALID);
    }

    #[test]
    fn markdown_is_checked_before_orientation() {
        let err = ConversionRequest::new(None, Some("sideways")).expect_err("rejected");
        assert_eq!(err.public_message(), MARKDOWN_REQUIRED);
    }

    #[test]
    fn pdf_filename_embeds_orientation() {
        let portrait = ExportResult::pdf(vec![1_u8], Orientation::Portrait);
        let landscape = ExportResult::pdf(vec![1_u8], Orientation::Landscape);
        assert_eq!(portrait.suggested_filename, "MarkDraft_portrait.pdf");
        assert_eq!(landscape.suggested_filename, "MarkDraft_landscape.pdf");
        assert_eq!(landscape.mime_type, PDF_MIME_TYPE);
    }

    #[test]
    fn docx_result_uses_fixed_metadata() {
        let result = ExportResult::docx(vec![1_u8, 2, 3]);
        assert_eq!(result.suggested_filename, DOCX_FILENAME);
        assert_eq!(result.mime_type, DOCX_MIME_TYPE);
        assert_eq!(result.bytes.len(), 3);
    }
}

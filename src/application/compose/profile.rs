use askama::Template;

/// Named, versioned document skeletons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateProfile {
    /// Point-based typography limited to CSS the Word exporter understands.
    Docx,
    /// Screen-like typography plus print directives for the browser engine.
    Pdf,
}

impl TemplateProfile {
    pub fn name(self) -> &'static str {
        match self {
            TemplateProfile::Docx => "docx-profile",
            TemplateProfile::Pdf => "pdf-profile",
        }
    }

    pub fn version(self) -> u32 {
        match self {
            TemplateProfile::Docx => 1,
            TemplateProfile::Pdf => 1,
        }
    }
}

#[derive(Template)]
#[template(path = "profiles/docx-v1.html")]
pub(super) struct DocxProfileTemplate<'a> {
    profile: &'static str,
    version: u32,
    fragment: &'a str,
}

impl<'a> DocxProfileTemplate<'a> {
    pub(super) fn new(fragment: &'a str) -> Self {
        Self {
            profile: TemplateProfile::Docx.name(),
            version: TemplateProfile::Docx.version(),
            fragment,
        }
    }
}

#[derive(Template)]
#[template(path = "profiles/pdf-v1.html")]
pub(super) struct PdfProfileTemplate<'a> {
    profile: &'static str,
    version: u32,
    fragment: &'a str,
}

impl<'a> PdfProfileTemplate<'a> {
    pub(super) fn new(fragment: &'a str) -> Self {
        Self {
            profile: TemplateProfile::Pdf.name(),
            version: TemplateProfile::Pdf.version(),
            fragment,
        }
    }
}

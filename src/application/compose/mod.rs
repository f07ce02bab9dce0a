//! Template composition: wraps a rendered fragment in a format-specific
//! document skeleton.
//!
//! Each profile is a versioned template asset compiled into the binary. The
//! skeletons are rendered once when the composer is loaded and split at
//! their single insertion point, so composing a document is plain string
//! concatenation that cannot fail.

mod profile;

pub use profile::TemplateProfile;

use askama::Template;
use thiserror::Error;

use crate::domain::conversion::{RenderedDocument, StyledDocument};

use profile::{DocxProfileTemplate, PdfProfileTemplate};

const INSERTION_MARKER: &str = "<!-- markdraft:fragment -->";

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("failed to render template profile `{profile}`")]
    Render {
        profile: &'static str,
        #[source]
        source: askama::Error,
    },
    #[error("template profile `{profile}` must contain exactly one insertion point, found {found}")]
    InsertionPoint { profile: &'static str, found: usize },
}

#[derive(Debug, Clone)]
struct Skeleton {
    head: String,
    tail: String,
}

impl Skeleton {
    fn load(profile: TemplateProfile) -> Result<Self, ComposeError> {
        let rendered = match profile {
            TemplateProfile::Docx => DocxProfileTemplate::new(INSERTION_MARKER).render(),
            TemplateProfile::Pdf => PdfProfileTemplate::new(INSERTION_MARKER).render(),
        }
        .map_err(|source| ComposeError::Render {
            profile: profile.name(),
            source,
        })?;

        let found = rendered.matches(INSERTION_MARKER).count();
        if found != 1 {
            return Err(ComposeError::InsertionPoint {
                profile: profile.name(),
                found,
            });
        }

        let (head, tail) = rendered
            .split_once(INSERTION_MARKER)
            .ok_or(ComposeError::InsertionPoint {
                profile: profile.name(),
                found: 0,
            })?;

        Ok(Self {
            head: head.to_string(),
            tail: tail.to_string(),
        })
    }

    fn wrap(&self, fragment: &str) -> String {
        let mut html = String::with_capacity(self.head.len() + fragment.len() + self.tail.len());
        html.push_str(&self.head);
        html.push_str(fragment);
        html.push_str(&self.tail);
        html
    }
}

/// Holds both document skeletons; read-only after [`TemplateComposer::load`].
#[derive(Debug, Clone)]
pub struct TemplateComposer {
    docx: Skeleton,
    pdf: Skeleton,
}

impl TemplateComposer {
    pub fn load() -> Result<Self, ComposeError> {
        Ok(Self {
            docx: Skeleton::load(TemplateProfile::Docx)?,
            pdf: Skeleton::load(TemplateProfile::Pdf)?,
        })
    }

    /// Insert `document` into the skeleton for `profile`.
    ///
    /// Page orientation is deliberately not an input: portrait and landscape
    /// PDFs are printed from byte-identical HTML.
    pub fn compose(&self, profile: TemplateProfile, document: &RenderedDocument) -> StyledDocument {
        let skeleton = match profile {
            TemplateProfile::Docx => &self.docx,
            TemplateProfile::Pdf => &self.pdf,
        };
        StyledDocument {
            complete_html: skeleton.wrap(&document.html_fragment),
        }
    }
}

//! Markdown rendering.
//!
//! The renderer is a pure text transformation: it accepts Markdown and
//! returns an HTML fragment. It holds only immutable options, so a single
//! instance is shared by every request without locking.

mod options;
mod service;

pub use options::default_options;
pub use service::{ComrakRenderService, RenderService};

//! MarkDraft: turns Markdown into downloadable Word and PDF documents.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;

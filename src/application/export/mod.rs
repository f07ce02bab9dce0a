//! Exporters turning a complete HTML document into a binary file.

pub mod docx;
pub mod pdf;

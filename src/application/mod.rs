//! Application services: the conversion pipeline and its stages.

pub mod compose;
pub mod convert;
pub mod error;
pub mod export;
pub mod render;

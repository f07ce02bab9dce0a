//! Domain layer types and invariants.

pub mod conversion;
pub mod error;

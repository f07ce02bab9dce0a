use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("domain validation failed: {message}")]
    Validation { message: &'static str },
}

impl DomainError {
    pub fn validation(message: &'static str) -> Self {
        Self::Validation { message }
    }

    /// Message safe to hand back to the caller.
    pub fn public_message(&self) -> &'static str {
        match self {
            DomainError::Validation { message } => message,
        }
    }
}

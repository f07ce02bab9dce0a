use std::error::Error as StdError;

use axum::{http::StatusCode, response::Response};
use thiserror::Error;

use crate::{
    application::{
        compose::ComposeError,
        export::{docx::DocxExportError, pdf::EngineError},
    },
    domain::error::DomainError,
    infra::error::InfraError,
};

pub const DOCX_FAILED: &str = "Failed to create Word document.";
pub const UNEXPECTED: &str = "An unexpected server error occurred.";

/// Internal failure detail carried on a response for the logging middleware.
/// Never serialized to the client.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Everything that can stop a single conversion.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error("word export failed")]
    Export(#[source] DocxExportError),
    #[error("pdf rendering failed")]
    EngineResource(#[source] EngineError),
    #[error("unexpected conversion failure: {0}")]
    Unexpected(String),
}

impl ConversionError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ConversionError::Validation(_) => StatusCode::BAD_REQUEST,
            ConversionError::Export(_)
            | ConversionError::EngineResource(_)
            | ConversionError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Sanitized message safe to show to clients.
    pub fn public_message(&self) -> &'static str {
        match self {
            ConversionError::Validation(err) => err.public_message(),
            ConversionError::Export(_) => DOCX_FAILED,
            ConversionError::EngineResource(err) => err.failure().public_message(),
            ConversionError::Unexpected(_) => UNEXPECTED,
        }
    }

    /// Label used for the `outcome` metric dimension.
    pub fn outcome(&self) -> &'static str {
        match self {
            ConversionError::Validation(_) => "invalid",
            ConversionError::Export(_) => "export_error",
            ConversionError::EngineResource(_) => "engine_error",
            ConversionError::Unexpected(_) => "unexpected",
        }
    }
}

impl From<DocxExportError> for ConversionError {
    fn from(error: DocxExportError) -> Self {
        Self::Export(error)
    }
}

impl From<EngineError> for ConversionError {
    fn from(error: EngineError) -> Self {
        Self::EngineResource(error)
    }
}

/// Process-level failures: startup, configuration, offline conversion.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Compose(#[from] ComposeError),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

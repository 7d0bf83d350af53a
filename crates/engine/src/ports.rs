//! Outbound ports for the engine's external collaborators
//!
//! The wizard core performs no I/O; everything asynchronous enters through
//! these two traits. Adapters live in [`crate::content`] and [`crate::pdf`].

use async_trait::async_trait;
use thiserror::Error;

use chargen_domain::{BuilderKey, SourceData};
use chargen_shared::{PdfFillRequest, PdfFillResponse};

/// Errors from fetching reference-data content.
///
/// Clone so a single failed fetch can propagate to every session-creation
/// call awaiting the same in-flight load.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceLoadError {
    #[error("No rules content for builder: {0}")]
    NotFound(String),

    #[error("Failed to read rules content: {0}")]
    Io(String),

    #[error("Invalid rules content: {0}")]
    Parse(String),
}

/// Fetches the immutable rules content for one wizard definition.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceLoaderPort: Send + Sync {
    async fn fetch(&self, builder_key: &BuilderKey) -> Result<SourceData, SourceLoadError>;
}

/// Errors from the external document-fill service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PdfFillError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Fills a PDF form through the external document-fill service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PdfFillPort: Send + Sync {
    async fn fill(&self, request: PdfFillRequest) -> Result<PdfFillResponse, PdfFillError>;
}

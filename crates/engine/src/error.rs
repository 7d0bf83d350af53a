//! Engine-level error type

use thiserror::Error;

use chargen_domain::DomainError;
use chargen_shared::SessionKey;

use crate::ports::{PdfFillError, SourceLoadError};

/// Errors surfaced by the session, content, and export services.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Rejected synchronously, before any asynchronous work begins.
    #[error("Unknown builder: {0}")]
    UnknownBuilder(String),

    #[error("Session not found: {0}")]
    SessionNotFound(SessionKey),

    /// Reference-data fetch failure; no session is created and nothing is
    /// cached for the failed key.
    #[error("Source load failed: {0}")]
    Source(#[from] SourceLoadError),

    #[error("PDF fill failed: {0}")]
    Pdf(#[from] PdfFillError),

    /// The wizard definition declares no PDF form-field projection.
    #[error("PDF export not supported by builder: {0}")]
    PdfNotSupported(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

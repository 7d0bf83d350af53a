//! Chargen Engine - Session, content, and export services
//!
//! The thin asynchronous layer around the synchronous wizard core: loads
//! rules content per builder key (once, shared), holds one state entry per
//! active session, dispatches user edits into the recomputation pass, and
//! exposes the JSON and PDF export use cases.
//!
//! The wizard core itself never performs I/O; everything asynchronous goes
//! through the outbound ports in [`ports`].

pub mod config;
pub mod content;
pub mod error;
pub mod export;
pub mod pdf;
pub mod ports;
pub mod registry;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{load_dotenv_from_repo_root, EngineConfig};
pub use content::{FsSourceLoader, SourceCache};
pub use error::EngineError;
pub use export::ExportService;
pub use pdf::HttpPdfFiller;
pub use ports::{PdfFillError, PdfFillPort, SourceLoadError, SourceLoaderPort};
pub use registry::BuilderRegistry;
pub use session::SessionService;

//! Chargen Shared - Contracts crossing the engine boundary
//!
//! This crate contains the types exchanged between the engine and its
//! collaborators: the session selector DTO, the JSON export/import payload,
//! and the request/response pair for the external PDF fill service.
//!
//! # Design Principles
//!
//! 1. **Minimal dependencies** - serde, serde_json, uuid, chrono, and the
//!    domain crate for runner-state vocabulary
//! 2. **No business logic** - pure data types and serialization
//! 3. **camelCase on the wire** - every DTO renames for JSON clients

pub mod export;
pub mod pdf;
pub mod session;

pub use export::CharacterExport;
pub use pdf::{PdfFillRequest, PdfFillResponse};
pub use session::{SessionKey, SessionSnapshot};

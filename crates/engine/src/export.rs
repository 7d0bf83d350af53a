//! Character export: JSON round trip and PDF form fill

use std::sync::Arc;

use chargen_domain::{BuilderKey, CharacterData};
use chargen_shared::{CharacterExport, PdfFillRequest, PdfFillResponse, SessionKey};

use crate::error::EngineError;
use crate::ports::PdfFillPort;
use crate::session::SessionService;

/// Export use cases over live sessions: serialize a character to JSON,
/// start a session from imported JSON, and fill the wizard's PDF form via
/// the external fill service.
pub struct ExportService {
    sessions: Arc<SessionService>,
    pdf: Arc<dyn PdfFillPort>,
}

impl ExportService {
    pub fn new(sessions: Arc<SessionService>, pdf: Arc<dyn PdfFillPort>) -> Self {
        Self { sessions, pdf }
    }

    /// Serialize a session's committed character data.
    pub fn export_json(&self, session_key: SessionKey) -> Result<CharacterExport, EngineError> {
        let snapshot = self.sessions.snapshot(session_key)?;
        Ok(CharacterExport {
            builder_key: snapshot.builder_key,
            character_data: snapshot.character,
        })
    }

    /// Start a new session from an exported character. Values that no longer
    /// validate are corrected by the initial settle pass.
    pub async fn import_json(&self, export: CharacterExport) -> Result<SessionKey, EngineError> {
        self.sessions
            .create_session(&BuilderKey::new(export.builder_key), Some(export.character_data))
            .await
    }

    /// Project the wizard's PDF form fields from the committed character.
    pub fn pdf_request(&self, session_key: SessionKey) -> Result<PdfFillRequest, EngineError> {
        let wizard = self.sessions.wizard(session_key)?;
        let source = self.sessions.source(session_key)?;
        let snapshot = self.sessions.snapshot(session_key)?;

        let data = CharacterData::new(snapshot.character);
        let form_fields = wizard
            .pdf_fields(&source, &data)
            .ok_or_else(|| EngineError::PdfNotSupported(wizard.builder_key().to_string()))?;
        Ok(PdfFillRequest {
            builder_key: wizard.builder_key().to_string(),
            form_fields,
        })
    }

    /// Fill the wizard's PDF form through the external service.
    pub async fn fill_pdf(&self, session_key: SessionKey) -> Result<PdfFillResponse, EngineError> {
        let request = self.pdf_request(session_key)?;
        Ok(self.pdf.fill(request).await?)
    }
}

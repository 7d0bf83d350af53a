//! Per-session wizard state
//!
//! One entry per active wizard instance (tab). Each entry owns its committed
//! character data and runner state; updates run the pure recomputation pass
//! and commit the result, so a failed pass leaves the previous snapshot
//! untouched. Source data is shared per builder key through the cache.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use chargen_domain::{BuilderKey, CharacterData, RunnerState, SourceData, StepPatch, StepView, Wizard};
use chargen_shared::{SessionKey, SessionSnapshot};

use crate::content::SourceCache;
use crate::error::EngineError;
use crate::registry::BuilderRegistry;

struct SessionEntry {
    wizard: Arc<Wizard>,
    source: Arc<SourceData>,
    character: CharacterData,
    state: RunnerState,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SessionEntry {
    fn snapshot(&self, session_key: SessionKey) -> SessionSnapshot {
        SessionSnapshot {
            session_key,
            builder_key: self.wizard.builder_key().to_string(),
            character: self.character.clone().into_value(),
            step_state: self.state.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Stores one wizard instance per session key and dispatches updates into
/// the step engine.
pub struct SessionService {
    registry: Arc<BuilderRegistry>,
    sources: Arc<SourceCache>,
    sessions: DashMap<SessionKey, SessionEntry>,
}

impl SessionService {
    pub fn new(registry: Arc<BuilderRegistry>, sources: Arc<SourceCache>) -> Self {
        Self {
            registry,
            sources,
            sessions: DashMap::new(),
        }
    }

    /// Start a session, optionally from externally supplied character data
    /// (JSON import). The builder key is validated before any content load;
    /// a failed load creates no session.
    pub async fn create_session(
        &self,
        builder_key: &BuilderKey,
        initial: Option<Value>,
    ) -> Result<SessionKey, EngineError> {
        let wizard = self.registry.get(builder_key)?;
        let source = self.sources.fetch(builder_key).await?;

        let outcome = wizard.initialize(&source, initial);
        let session_key = SessionKey::new();
        let now = Utc::now();
        self.sessions.insert(
            session_key,
            SessionEntry {
                wizard,
                source,
                character: outcome.character,
                state: outcome.state,
                created_at: now,
                updated_at: now,
            },
        );
        info!(session = %session_key, builder = %builder_key, "session created");
        Ok(session_key)
    }

    /// Run one recomputation pass for a user edit and commit the result.
    pub fn update_session(
        &self,
        session_key: SessionKey,
        changed_step: Option<usize>,
        patch: Option<&StepPatch>,
    ) -> Result<SessionSnapshot, EngineError> {
        let mut entry = self
            .sessions
            .get_mut(&session_key)
            .ok_or(EngineError::SessionNotFound(session_key))?;

        let outcome = entry.wizard.on_step_updated(
            &entry.source,
            &entry.character,
            &entry.state,
            changed_step,
            patch,
        )?;
        entry.character = outcome.character;
        entry.state = outcome.state;
        entry.updated_at = Utc::now();
        debug!(
            session = %session_key,
            changed = ?changed_step,
            current_step = entry.state.current_step,
            "session updated"
        );
        Ok(entry.snapshot(session_key))
    }

    /// The selector the UI layer renders from.
    pub fn snapshot(&self, session_key: SessionKey) -> Result<SessionSnapshot, EngineError> {
        self.sessions
            .get(&session_key)
            .map(|entry| entry.snapshot(session_key))
            .ok_or(EngineError::SessionNotFound(session_key))
    }

    /// Render models for every step of one session.
    pub fn views(&self, session_key: SessionKey) -> Result<Vec<StepView>, EngineError> {
        self.sessions
            .get(&session_key)
            .map(|entry| entry.wizard.views(&entry.state))
            .ok_or(EngineError::SessionNotFound(session_key))
    }

    /// Drop a session's state. Returns whether it existed.
    pub fn close_session(&self, session_key: SessionKey) -> bool {
        let removed = self.sessions.remove(&session_key).is_some();
        if removed {
            info!(session = %session_key, "session closed");
        }
        removed
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub(crate) fn wizard(&self, session_key: SessionKey) -> Result<Arc<Wizard>, EngineError> {
        self.sessions
            .get(&session_key)
            .map(|entry| Arc::clone(&entry.wizard))
            .ok_or(EngineError::SessionNotFound(session_key))
    }

    pub(crate) fn source(&self, session_key: SessionKey) -> Result<Arc<SourceData>, EngineError> {
        self.sessions
            .get(&session_key)
            .map(|entry| Arc::clone(&entry.source))
            .ok_or(EngineError::SessionNotFound(session_key))
    }
}

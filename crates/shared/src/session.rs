//! Session identity and the selector snapshot DTO

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use chargen_domain::RunnerState;

/// Identifies one active wizard instance (one tab).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey(Uuid);

impl SessionKey {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for SessionKey {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

/// Everything the UI layer needs to render one session: the committed
/// character data plus the current step runner state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_key: SessionKey,
    pub builder_key: String,
    pub character: Value,
    pub step_state: RunnerState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

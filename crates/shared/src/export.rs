//! JSON export/import payload

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Serialized character: the builder key plus the raw character document.
///
/// Importing one starts a new session with this data as the initial
/// character; values that no longer validate against current rules content
/// are corrected during the first settle pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterExport {
    pub builder_key: String,
    pub character_data: Value,
}

//! Request/response pair for the external PDF fill service

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Fill request: which form template to use and the field values to stamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfFillRequest {
    pub builder_key: String,
    pub form_fields: BTreeMap<String, String>,
}

/// Filled document, base64-encoded by the fill service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfFillResponse {
    pub document_b64: String,
}

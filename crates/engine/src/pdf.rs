//! HTTP adapter for the external PDF fill service

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use chargen_shared::{PdfFillRequest, PdfFillResponse};

use crate::config::EngineConfig;
use crate::ports::{PdfFillError, PdfFillPort};

/// Client for the external document-fill service.
#[derive(Clone)]
pub struct HttpPdfFiller {
    client: Client,
    base_url: String,
}

impl HttpPdfFiller {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(&config.pdf_fill_base_url, config.pdf_fill_timeout)
    }
}

#[async_trait]
impl PdfFillPort for HttpPdfFiller {
    async fn fill(&self, request: PdfFillRequest) -> Result<PdfFillResponse, PdfFillError> {
        let response = self
            .client
            .post(format!("{}/fill", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| PdfFillError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .map_err(|e| PdfFillError::RequestFailed(e.to_string()))?;
            return Err(PdfFillError::RequestFailed(error_text));
        }

        response
            .json()
            .await
            .map_err(|e| PdfFillError::InvalidResponse(e.to_string()))
    }
}

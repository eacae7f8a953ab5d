//! OCR Providers
//!
//! Defines the provider trait and the HTTP implementation used in production.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::text::{canonicalize, word_count};

use super::types::{BoundingBox, OcrBlock, OcrError, OcrExtraction, OcrPage, OcrRequest};

/// OCR provider trait
///
/// One call is one attempt; retries are handled by [`super::OcrService`].
#[async_trait]
pub trait OcrProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Extract pages and layout blocks from a PDF chunk
    async fn extract(&self, request: OcrRequest<'_>) -> Result<OcrExtraction, OcrError>;
}

/// Document OCR service reached over HTTP
pub struct HttpOcrProvider {
    client: reqwest::Client,
    /// OCR API base URL
    base_url: String,
    api_key: Option<String>,
}

impl HttpOcrProvider {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self, OcrError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OcrError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn classify_status(status: StatusCode, body: String) -> OcrError {
        let message = format!("OCR service returned {}: {}", status, body);
        match status {
            StatusCode::TOO_MANY_REQUESTS => OcrError::RateLimited(message),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => OcrError::Timeout(message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => OcrError::Unauthorized(message),
            s if s.is_server_error() => OcrError::Unavailable(message),
            _ => OcrError::Rejected(message),
        }
    }

    fn classify_transport(err: reqwest::Error) -> OcrError {
        if err.is_timeout() {
            OcrError::Timeout(err.to_string())
        } else if err.is_decode() {
            OcrError::InvalidResponse(err.to_string())
        } else {
            OcrError::Unavailable(err.to_string())
        }
    }
}

/// Response body of the OCR service
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OcrResponse {
    pages: Vec<OcrResponsePage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OcrResponsePage {
    /// Page number within the submitted chunk (1-indexed)
    page_number: u32,
    text: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    blocks: Vec<OcrResponseBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OcrResponseBlock {
    #[serde(default = "default_block_type")]
    block_type: String,
    text: String,
    bbox: BoundingBox,
    #[serde(default)]
    confidence: Option<f64>,
}

fn default_block_type() -> String {
    "text".to_string()
}

impl OcrResponse {
    /// Convert chunk-relative pages into document pages
    ///
    /// Page numbers must fall within `1..=page_count` of the submitted chunk.
    fn into_extraction(self, page_offset: u32, page_count: u32) -> Result<OcrExtraction, OcrError> {
        let mut extraction = OcrExtraction::default();

        for page in self.pages {
            if page.page_number == 0 || page.page_number > page_count {
                return Err(OcrError::InvalidResponse(format!(
                    "page number {} outside submitted range 1-{}",
                    page.page_number, page_count
                )));
            }
            let page_number = page_offset + page.page_number;
            let text_normalized = canonicalize(&page.text);

            for (order, block) in page.blocks.into_iter().enumerate() {
                extraction.blocks.push(OcrBlock {
                    page_number,
                    block_type: block.block_type,
                    text_normalized: canonicalize(&block.text),
                    text: block.text,
                    bbox: block.bbox.clamped(),
                    confidence: block.confidence.unwrap_or(0.0),
                    reading_order: order as u32,
                });
            }

            extraction.pages.push(OcrPage {
                page_number,
                word_count: word_count(&text_normalized) as u32,
                text: page.text,
                text_normalized,
                confidence: page.confidence.unwrap_or(0.0),
            });
        }

        Ok(extraction)
    }
}

#[async_trait]
impl OcrProvider for HttpOcrProvider {
    fn name(&self) -> &str {
        "http"
    }

    async fn extract(&self, request: OcrRequest<'_>) -> Result<OcrExtraction, OcrError> {
        use base64::Engine;

        let url = format!("{}/v1/ocr", self.base_url);
        let document = base64::engine::general_purpose::STANDARD.encode(request.bytes);

        let body = serde_json::json!({
            "document": document,
            "mimeType": "application/pdf",
            "pageCount": request.page_count,
            "includeBlocks": true,
        });

        let mut builder = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(Self::classify_transport)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, body));
        }

        let parsed: OcrResponse = response
            .json()
            .await
            .map_err(|e| OcrError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        parsed.into_extraction(request.page_offset, request.page_count)
    }
}

/// Scripted provider for tests
///
/// Produces one page and two blocks per requested page, except for chunks
/// whose page offset has a scripted failure.
#[cfg(test)]
#[derive(Default)]
pub struct ScriptedOcrProvider {
    /// page offset -> (error, failures before succeeding; `None` fails forever)
    failures: std::sync::Mutex<std::collections::HashMap<u32, (OcrError, Option<u32>)>>,
    /// page offset -> attempts seen
    pub calls: std::sync::Mutex<std::collections::HashMap<u32, u32>>,
}

#[cfg(test)]
impl ScriptedOcrProvider {
    pub fn fail_chunk(self, page_offset: u32, error: OcrError) -> Self {
        self.failures.lock().unwrap().insert(page_offset, (error, None));
        self
    }

    pub fn fail_chunk_times(self, page_offset: u32, error: OcrError, times: u32) -> Self {
        self.failures.lock().unwrap().insert(page_offset, (error, Some(times)));
        self
    }

    pub fn attempts(&self, page_offset: u32) -> u32 {
        self.calls.lock().unwrap().get(&page_offset).copied().unwrap_or(0)
    }

    pub fn page_text(page_number: u32) -> String {
        format!("Page {} reports progress toward annual reading goals.", page_number)
    }
}

#[cfg(test)]
#[async_trait]
impl OcrProvider for ScriptedOcrProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn extract(&self, request: OcrRequest<'_>) -> Result<OcrExtraction, OcrError> {
        *self.calls.lock().unwrap().entry(request.page_offset).or_insert(0) += 1;

        {
            let mut failures = self.failures.lock().unwrap();
            if let Some((error, remaining)) = failures.get_mut(&request.page_offset) {
                match remaining {
                    None => return Err(error.clone()),
                    Some(0) => {}
                    Some(n) => {
                        *n -= 1;
                        return Err(error.clone());
                    }
                }
            }
        }

        let mut extraction = OcrExtraction::default();
        for local in 1..=request.page_count {
            let page_number = request.page_offset + local;
            let text = Self::page_text(page_number);
            for order in 0..2 {
                extraction.blocks.push(OcrBlock {
                    page_number,
                    block_type: "paragraph".to_string(),
                    text: text.clone(),
                    text_normalized: canonicalize(&text),
                    bbox: BoundingBox { x: 0.1, y: 0.1 + order as f64 * 0.4, width: 0.8, height: 0.3 },
                    confidence: 0.9,
                    reading_order: order,
                });
            }
            extraction.pages.push(OcrPage {
                page_number,
                text_normalized: canonicalize(&text),
                word_count: word_count(&text) as u32,
                text,
                confidence: 0.9,
            });
        }
        Ok(extraction)
    }
}

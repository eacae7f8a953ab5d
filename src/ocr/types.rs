//! OCR Types
//!
//! Defines the request and result types exchanged with the OCR provider.

use serde::{Deserialize, Serialize};

/// Normalized rectangle (0-1 coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Whether the box lies within the unit square
    pub fn is_normalized(&self) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.width >= 0.0
            && self.height >= 0.0
            && self.x + self.width <= 1.0 + f64::EPSILON
            && self.y + self.height <= 1.0 + f64::EPSILON
    }

    /// Clamp the box into the unit square
    pub fn clamped(&self) -> Self {
        let x = self.x.clamp(0.0, 1.0);
        let y = self.y.clamp(0.0, 1.0);
        Self {
            x,
            y,
            width: self.width.clamp(0.0, 1.0 - x),
            height: self.height.clamp(0.0, 1.0 - y),
        }
    }
}

/// One chunk of a document submitted for OCR
#[derive(Debug, Clone, Copy)]
pub struct OcrRequest<'a> {
    /// PDF bytes for this chunk only
    pub bytes: &'a [u8],
    /// Pages preceding this chunk in the source document
    pub page_offset: u32,
    /// Pages contained in `bytes`
    pub page_count: u32,
    /// Extra attempts allowed after a retryable failure
    pub max_retries: u32,
}

/// Text of a single page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrPage {
    /// Page number in the source document (1-indexed)
    pub page_number: u32,
    pub text: String,
    pub text_normalized: String,
    pub word_count: u32,
    /// Confidence score (0-1)
    pub confidence: f64,
}

/// A layout block (paragraph, table, heading...) on a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrBlock {
    /// Page number in the source document (1-indexed)
    pub page_number: u32,
    pub block_type: String,
    pub text: String,
    pub text_normalized: String,
    pub bbox: BoundingBox,
    pub confidence: f64,
    /// Position of the block in reading order within its page
    pub reading_order: u32,
}

/// Pages and blocks extracted from one chunk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrExtraction {
    pub pages: Vec<OcrPage>,
    pub blocks: Vec<OcrBlock>,
}

/// OCR error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum OcrError {
    #[error("OCR provider rate limited: {0}")]
    RateLimited(String),

    #[error("OCR provider unavailable: {0}")]
    Unavailable(String),

    #[error("OCR request timed out: {0}")]
    Timeout(String),

    #[error("OCR request rejected: {0}")]
    Rejected(String),

    #[error("Invalid OCR response: {0}")]
    InvalidResponse(String),

    #[error("OCR provider not authorized: {0}")]
    Unauthorized(String),
}

impl OcrError {
    /// Whether a later attempt at the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::Unavailable(_) | Self::Timeout(_)
        )
    }
}

//! Extraction types

use serde::{Deserialize, Serialize};

use crate::ocr::OcrExtraction;

/// A page range of a source document submitted to OCR as one request
#[derive(Clone)]
pub struct ExtractionChunk {
    /// PDF bytes containing only this chunk's pages
    pub bytes: Vec<u8>,
    /// Pages preceding this chunk in the source document
    pub page_offset: u32,
    pub page_count: u32,
}

impl ExtractionChunk {
    /// First page of the chunk in the source document (1-indexed)
    pub fn first_page(&self) -> u32 {
        self.page_offset + 1
    }

    /// Last page of the chunk in the source document (1-indexed, inclusive)
    pub fn last_page(&self) -> u32 {
        self.page_offset + self.page_count
    }
}

impl std::fmt::Debug for ExtractionChunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionChunk")
            .field("bytes", &self.bytes.len())
            .field("page_offset", &self.page_offset)
            .field("page_count", &self.page_count)
            .finish()
    }
}

/// A chunk whose OCR gave up after its retries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkFailure {
    pub page_offset: u32,
    pub page_count: u32,
    pub error_message: String,
}

impl ChunkFailure {
    /// `pages A-B`, 1-indexed and inclusive
    pub fn range_label(&self) -> String {
        format!("pages {}-{}", self.page_offset + 1, self.page_offset + self.page_count)
    }
}

/// Result of extracting one chunk
#[derive(Debug, Clone)]
pub enum ChunkOutcome {
    Success {
        page_offset: u32,
        page_count: u32,
        extraction: OcrExtraction,
    },
    Failure(ChunkFailure),
}

impl ChunkOutcome {
    /// Pages this chunk was meant to cover
    pub fn expected_pages(&self) -> u32 {
        match self {
            Self::Success { page_count, .. } => *page_count,
            Self::Failure(failure) => failure.page_count,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

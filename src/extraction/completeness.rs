//! Extraction completeness
//!
//! Derives the partial/complete verdict of a run from its chunk outcomes.

use serde::{Deserialize, Serialize};

use super::types::{ChunkFailure, ChunkOutcome};

/// Aggregate of all chunk outcomes for one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionCompleteness {
    pub is_partial: bool,
    pub total_expected_pages: u32,
    pub extracted_pages: u32,
    pub failed_chunks: Vec<ChunkFailure>,
}

impl ExtractionCompleteness {
    pub fn from_outcomes(outcomes: &[ChunkOutcome]) -> Self {
        let mut total_expected_pages = 0;
        let mut extracted_pages = 0;
        let mut failed_chunks = Vec::new();

        for outcome in outcomes {
            total_expected_pages += outcome.expected_pages();
            match outcome {
                ChunkOutcome::Success { extraction, .. } => {
                    extracted_pages += extraction.pages.len() as u32;
                }
                ChunkOutcome::Failure(failure) => failed_chunks.push(failure.clone()),
            }
        }

        Self {
            is_partial: !failed_chunks.is_empty(),
            total_expected_pages,
            extracted_pages,
            failed_chunks,
        }
    }

    /// True when there were chunks and none of them succeeded
    pub fn all_failed(&self) -> bool {
        !self.failed_chunks.is_empty() && self.failed_chunks.iter().map(|f| f.page_count).sum::<u32>()
            == self.total_expected_pages
    }

    /// Failed page ranges, e.g. `pages 201-250, pages 401-450`
    pub fn failed_ranges(&self) -> String {
        self.failed_chunks
            .iter()
            .map(ChunkFailure::range_label)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// User-facing warning for partial extractions
    pub fn diagnostic_message(&self) -> Option<String> {
        if !self.is_partial {
            return None;
        }

        Some(format!(
            "Text could not be extracted from {} ({} of {} pages extracted). \
             Findings derived from this document may be incomplete. \
             Try re-uploading the file, or split it into smaller PDFs and upload them separately.",
            self.failed_ranges(),
            self.extracted_pages,
            self.total_expected_pages
        ))
    }

    /// Structured failure detail stored alongside the document
    pub fn error_details(&self) -> Option<serde_json::Value> {
        if !self.is_partial {
            return None;
        }

        Some(serde_json::json!({
            "kind": "partial_extraction",
            "totalExpectedPages": self.total_expected_pages,
            "extractedPages": self.extracted_pages,
            "failedChunks": self.failed_chunks,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{OcrExtraction, OcrPage};

    fn success(page_offset: u32, page_count: u32) -> ChunkOutcome {
        let pages = (1..=page_count)
            .map(|n| OcrPage {
                page_number: page_offset + n,
                text: String::new(),
                text_normalized: String::new(),
                word_count: 0,
                confidence: 1.0,
            })
            .collect();

        ChunkOutcome::Success {
            page_offset,
            page_count,
            extraction: OcrExtraction { pages, blocks: Vec::new() },
        }
    }

    fn failure(page_offset: u32, page_count: u32) -> ChunkOutcome {
        ChunkOutcome::Failure(ChunkFailure {
            page_offset,
            page_count,
            error_message: "OCR provider unavailable".to_string(),
        })
    }

    #[test]
    fn test_complete_extraction() {
        let completeness = ExtractionCompleteness::from_outcomes(&[success(0, 200), success(200, 50)]);

        assert!(!completeness.is_partial);
        assert_eq!(completeness.total_expected_pages, 250);
        assert_eq!(completeness.extracted_pages, 250);
        assert!(!completeness.all_failed());
        assert_eq!(completeness.diagnostic_message(), None);
        assert_eq!(completeness.error_details(), None);
    }

    #[test]
    fn test_partial_extraction() {
        let completeness = ExtractionCompleteness::from_outcomes(&[
            success(0, 200),
            failure(200, 200),
            success(400, 50),
        ]);

        assert!(completeness.is_partial);
        assert_eq!(completeness.total_expected_pages, 450);
        assert_eq!(completeness.extracted_pages, 250);
        assert_eq!(completeness.failed_chunks.len(), 1);
        assert!(!completeness.all_failed());

        let message = completeness.diagnostic_message().unwrap();
        assert!(message.contains("pages 201-400"));
        assert!(message.contains("may be incomplete"));
        assert!(message.contains("re-uploading"));

        let details = completeness.error_details().unwrap();
        assert_eq!(details["failedChunks"][0]["pageOffset"], 200);
    }

    #[test]
    fn test_multiple_failed_ranges() {
        let completeness = ExtractionCompleteness::from_outcomes(&[
            success(0, 200),
            failure(200, 50),
            success(250, 150),
            failure(400, 50),
        ]);
        assert_eq!(completeness.failed_ranges(), "pages 201-250, pages 401-450");
    }

    #[test]
    fn test_all_failed() {
        let completeness = ExtractionCompleteness::from_outcomes(&[failure(0, 200), failure(200, 10)]);
        assert!(completeness.is_partial);
        assert!(completeness.all_failed());
        assert_eq!(completeness.extracted_pages, 0);
    }

    #[test]
    fn test_no_outcomes() {
        let completeness = ExtractionCompleteness::from_outcomes(&[]);
        assert!(!completeness.is_partial);
        assert!(!completeness.all_failed());
        assert_eq!(completeness.total_expected_pages, 0);
    }
}

//! Extraction pipeline errors

use thiserror::Error;

use super::types::ChunkFailure;
use crate::error::StorageError;
use crate::ocr::OcrError;

/// How the orchestrator should treat a failed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Re-running cannot help; surface to the user
    Fatal,
    /// A later run may succeed
    Retryable,
}

/// Errors that end an extraction run
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Failed to download {path}: {source}")]
    Download {
        path: String,
        #[source]
        source: StorageError,
    },

    #[error("File is {size} bytes, limit is {max} bytes")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Unreadable PDF: {0}")]
    InvalidPdf(String),

    #[error("OCR failed for pages {first_page}-{last_page}: {source}")]
    Ocr {
        first_page: u32,
        last_page: u32,
        #[source]
        source: OcrError,
    },

    #[error("OCR failed for every chunk ({} chunks)", failures.len())]
    AllChunksFailed { failures: Vec<ChunkFailure> },

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl PipelineError {
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::Download { .. } | Self::Persistence(_) => Disposition::Retryable,
            Self::NotFound(_)
            | Self::FileTooLarge { .. }
            | Self::InvalidPdf(_)
            | Self::Ocr { .. }
            | Self::AllChunksFailed { .. } => Disposition::Fatal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.disposition() == Disposition::Retryable
    }

    /// Message shown to the user, with a remediation hint where one exists
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound(id) => format!("Document {} does not exist.", id),
            Self::Download { .. } => {
                "The document could not be downloaded from storage. Please try again later.".to_string()
            }
            Self::FileTooLarge { size, max } => format!(
                "This file is {:.1} MB, which exceeds the {:.0} MB limit. \
                 Please split it into smaller PDFs or compress it, then upload again.",
                *size as f64 / (1024.0 * 1024.0),
                *max as f64 / (1024.0 * 1024.0)
            ),
            Self::InvalidPdf(_) => {
                "The file could not be read as a PDF. Please check that it opens correctly and re-upload it."
                    .to_string()
            }
            Self::Ocr { first_page, last_page, source } => format!(
                "Text extraction failed for pages {}-{} ({}). \
                 If the PDF is password protected or damaged, re-export it and upload again.",
                first_page, last_page, source
            ),
            Self::AllChunksFailed { .. } => {
                "Text could not be extracted from any page of this document. \
                 Please try re-uploading it, or split it into smaller PDFs."
                    .to_string()
            }
            Self::Persistence(_) => {
                "Extraction results could not be saved. Please try again later.".to_string()
            }
        }
    }

    /// Structured detail stored with a failed document
    pub fn details(&self) -> serde_json::Value {
        match self {
            Self::FileTooLarge { size, max } => serde_json::json!({
                "kind": "file_too_large",
                "size": size,
                "max": max,
            }),
            Self::Ocr { first_page, last_page, source } => serde_json::json!({
                "kind": "ocr_rejected",
                "firstPage": first_page,
                "lastPage": last_page,
                "reason": source.to_string(),
            }),
            Self::AllChunksFailed { failures } => serde_json::json!({
                "kind": "all_chunks_failed",
                "failedChunks": failures,
            }),
            other => serde_json::json!({
                "kind": other.kind(),
                "reason": other.to_string(),
            }),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Download { .. } => "download_failed",
            Self::FileTooLarge { .. } => "file_too_large",
            Self::InvalidPdf(_) => "invalid_pdf",
            Self::Ocr { .. } => "ocr_rejected",
            Self::AllChunksFailed { .. } => "all_chunks_failed",
            Self::Persistence(_) => "persistence_failed",
        }
    }
}

impl From<crate::error::AppError> for PipelineError {
    fn from(e: crate::error::AppError) -> Self {
        PipelineError::Persistence(e.to_string())
    }
}

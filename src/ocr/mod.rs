//! OCR Module
//!
//! Provides OCR (Optical Character Recognition) for uploaded PDFs. The
//! provider itself is a black box returning per-page text and layout blocks;
//! this module owns the request shape, error classification and retries.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use iep_evidence_server::ocr::{HttpOcrProvider, OcrService, OcrServiceConfig};
//!
//! let provider = HttpOcrProvider::new("http://ocr:8080", None, Duration::from_secs(300))?;
//! let service = OcrService::new(OcrServiceConfig::default(), Arc::new(provider));
//!
//! let extraction = service.extract(service.request(&chunk_bytes, 200, 200)).await?;
//! ```

mod provider;
mod service;
mod types;

pub use provider::{HttpOcrProvider, OcrProvider};
pub use service::{OcrService, OcrServiceConfig};
pub use types::{BoundingBox, OcrBlock, OcrError, OcrExtraction, OcrPage, OcrRequest};

#[cfg(test)]
pub use provider::ScriptedOcrProvider;

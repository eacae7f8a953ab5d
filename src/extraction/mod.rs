//! Extraction Module
//!
//! Turns an uploaded PDF into persisted page text and layout blocks.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use iep_evidence_server::extraction::{ExtractionPipeline, PipelineConfig};
//!
//! let pipeline = ExtractionPipeline::new(store, storage, ocr, events, PipelineConfig::default());
//! let summary = pipeline.run(&document_id).await?;
//!
//! if let Some(warning) = summary.completeness.diagnostic_message() {
//!     println!("{}", warning);
//! }
//! ```

mod completeness;
mod error;
mod pipeline;
mod render;
mod splitter;
mod types;

pub use completeness::ExtractionCompleteness;
pub use error::{Disposition, PipelineError};
pub use pipeline::{ExtractionPipeline, ExtractionSummary, PipelineConfig};
pub use render::{PageImage, PageRenderer};
pub use splitter::{plan_chunks, LopdfSplitter, PdfSplitter};
pub use types::{ChunkFailure, ChunkOutcome, ExtractionChunk};

#[cfg(test)]
pub(crate) use pipeline::testing;

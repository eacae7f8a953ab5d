//! Chunked extraction pipeline
//!
//! Downloads a document, splits it into OCR-sized chunks, extracts each chunk
//! and persists pages and blocks. Every step can be re-run: pages upsert and
//! blocks are replaced wholesale.

use std::sync::Arc;

use serde::Serialize;

use super::completeness::ExtractionCompleteness;
use super::error::{Disposition, PipelineError};
use super::render::PageRenderer;
use super::splitter::{LopdfSplitter, PdfSplitter};
use super::types::{ChunkFailure, ChunkOutcome, ExtractionChunk};
use crate::config::{OcrConfig, PipelineSettings};
use crate::db::{DocumentStatus, DocumentStatusUpdate, DocumentStore};
use crate::events::{EventBus, PipelineEvent};
use crate::ocr::{OcrBlock, OcrPage, OcrService};
use crate::storage::ObjectStore;

/// Pipeline limits
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_file_bytes: u64,
    /// Pages per OCR request
    pub max_pages_per_request: u32,
    pub block_batch_size: usize,
}

impl PipelineConfig {
    pub fn from_settings(pipeline: &PipelineSettings, ocr: &OcrConfig) -> Self {
        Self {
            max_file_bytes: pipeline.max_file_bytes,
            max_pages_per_request: ocr.max_pages_per_request,
            block_batch_size: pipeline.block_batch_size,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_settings(&PipelineSettings::default(), &OcrConfig::default())
    }
}

/// Result of a completed run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionSummary {
    pub document_id: String,
    pub page_count: u32,
    pub block_count: usize,
    pub rendered_pages: usize,
    pub completeness: ExtractionCompleteness,
}

/// Extraction pipeline
#[derive(Clone)]
pub struct ExtractionPipeline {
    store: Arc<dyn DocumentStore>,
    storage: Arc<dyn ObjectStore>,
    ocr: OcrService,
    splitter: Arc<dyn PdfSplitter>,
    renderer: Option<Arc<dyn PageRenderer>>,
    events: EventBus,
    config: PipelineConfig,
}

impl ExtractionPipeline {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        storage: Arc<dyn ObjectStore>,
        ocr: OcrService,
        events: EventBus,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            storage,
            ocr,
            splitter: Arc::new(LopdfSplitter),
            renderer: None,
            events,
            config,
        }
    }

    pub fn with_splitter(mut self, splitter: Arc<dyn PdfSplitter>) -> Self {
        self.splitter = splitter;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run extraction for a document.
    ///
    /// Fatal errors mark the document failed before returning. Retryable
    /// errors leave it in `processing` for the caller to retry.
    pub async fn run(&self, document_id: &str) -> Result<ExtractionSummary, PipelineError> {
        match self.execute(document_id).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                if e.disposition() == Disposition::Fatal {
                    self.mark_failed(document_id, &e).await;
                }
                Err(e)
            }
        }
    }

    /// Record a failure on the document. Errors here are only logged.
    pub async fn mark_failed(&self, document_id: &str, error: &PipelineError) {
        let update = DocumentStatusUpdate::new(DocumentStatus::Failed)
            .with_error(error.user_message(), Some(error.details()));

        match self.store.update_status(document_id, &update).await {
            Ok(true) => {
                tracing::warn!(document_id = %document_id, "Document marked failed: {}", error);
            }
            Ok(false) => {
                tracing::debug!(document_id = %document_id, "Cannot mark missing document failed");
            }
            Err(e) => {
                tracing::error!(document_id = %document_id, "Failed to mark document failed: {}", e);
            }
        }
    }

    async fn execute(&self, document_id: &str) -> Result<ExtractionSummary, PipelineError> {
        let document = self
            .store
            .get_document(document_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(document_id.to_string()))?;

        self.store
            .update_status(document_id, &DocumentStatusUpdate::new(DocumentStatus::Processing))
            .await?;

        let bytes = self
            .storage
            .download(&document.storage_path)
            .await
            .map_err(|source| PipelineError::Download {
                path: document.storage_path.clone(),
                source,
            })?;

        let size = bytes.len() as u64;
        if size > self.config.max_file_bytes {
            return Err(PipelineError::FileTooLarge {
                size,
                max: self.config.max_file_bytes,
            });
        }

        let bytes = Arc::new(bytes);
        let chunks = self.split(bytes.clone()).await?;
        tracing::info!(
            document_id = %document_id,
            size,
            chunks = chunks.len(),
            "Starting extraction"
        );

        let outcomes = self.extract_chunks(document_id, &chunks).await?;
        drop(chunks);

        let completeness = ExtractionCompleteness::from_outcomes(&outcomes);
        if completeness.all_failed() {
            return Err(PipelineError::AllChunksFailed {
                failures: completeness.failed_chunks,
            });
        }

        let (pages, blocks) = collect_results(outcomes);

        self.store.upsert_pages(document_id, &pages).await?;
        let block_count = self.replace_blocks(document_id, &blocks).await?;
        let rendered_pages = self.render_pages(document_id, bytes).await;

        let page_count = completeness.total_expected_pages;
        let mut update = DocumentStatusUpdate::new(DocumentStatus::Extracted)
            .with_page_count(page_count)
            .with_partial(completeness.is_partial);
        if let Some(message) = completeness.diagnostic_message() {
            update = update.with_error(message, completeness.error_details());
        }

        if !self.store.update_status(document_id, &update).await? {
            return Err(PipelineError::NotFound(document_id.to_string()));
        }

        if completeness.is_partial {
            tracing::warn!(
                document_id = %document_id,
                extracted_pages = completeness.extracted_pages,
                expected_pages = completeness.total_expected_pages,
                failed = %completeness.failed_ranges(),
                "Partial extraction"
            );
        } else {
            tracing::info!(
                document_id = %document_id,
                pages = completeness.extracted_pages,
                blocks = block_count,
                "Extraction complete"
            );
        }

        self.events.publish(PipelineEvent::DocumentExtracted {
            document_id: document_id.to_string(),
            page_count,
            is_partial: completeness.is_partial,
            extracted_pages: completeness.extracted_pages,
            expected_pages: completeness.total_expected_pages,
        });

        Ok(ExtractionSummary {
            document_id: document_id.to_string(),
            page_count,
            block_count,
            rendered_pages,
            completeness,
        })
    }

    async fn split(&self, bytes: Arc<Vec<u8>>) -> Result<Vec<ExtractionChunk>, PipelineError> {
        let splitter = self.splitter.clone();
        let max_pages = self.config.max_pages_per_request;

        tokio::task::spawn_blocking(move || splitter.split(&bytes, max_pages))
            .await
            .map_err(|e| PipelineError::InvalidPdf(format!("split task failed: {}", e)))?
    }

    /// OCR chunks in order. A non-retryable error aborts the run; a chunk that
    /// is still failing after its retries is recorded and skipped.
    async fn extract_chunks(
        &self,
        document_id: &str,
        chunks: &[ExtractionChunk],
    ) -> Result<Vec<ChunkOutcome>, PipelineError> {
        let mut outcomes = Vec::with_capacity(chunks.len());

        for (index, chunk) in chunks.iter().enumerate() {
            tracing::debug!(
                document_id = %document_id,
                chunk = index,
                first_page = chunk.first_page(),
                last_page = chunk.last_page(),
                "Extracting chunk"
            );

            let request = self.ocr.request(&chunk.bytes, chunk.page_offset, chunk.page_count);
            match self.ocr.extract(request).await {
                Ok(extraction) => outcomes.push(ChunkOutcome::Success {
                    page_offset: chunk.page_offset,
                    page_count: chunk.page_count,
                    extraction,
                }),
                Err(e) if e.is_retryable() => {
                    tracing::warn!(
                        document_id = %document_id,
                        chunk = index,
                        first_page = chunk.first_page(),
                        last_page = chunk.last_page(),
                        "Chunk failed after retries: {}",
                        e
                    );
                    outcomes.push(ChunkOutcome::Failure(ChunkFailure {
                        page_offset: chunk.page_offset,
                        page_count: chunk.page_count,
                        error_message: e.to_string(),
                    }));
                }
                Err(source) => {
                    return Err(PipelineError::Ocr {
                        first_page: chunk.first_page(),
                        last_page: chunk.last_page(),
                        source,
                    });
                }
            }
        }

        Ok(outcomes)
    }

    /// Delete the document's blocks and insert the new set in batches
    async fn replace_blocks(&self, document_id: &str, blocks: &[OcrBlock]) -> Result<usize, PipelineError> {
        let removed = self.store.delete_blocks(document_id).await?;
        if removed > 0 {
            tracing::debug!(document_id = %document_id, removed, "Removed previous blocks");
        }

        for batch in blocks.chunks(self.config.block_batch_size.max(1)) {
            self.store.insert_blocks(document_id, batch).await?;
        }

        Ok(blocks.len())
    }

    /// Store page images. Failures are logged and never fail the run.
    async fn render_pages(&self, document_id: &str, bytes: Arc<Vec<u8>>) -> usize {
        let Some(renderer) = self.renderer.clone() else {
            return 0;
        };

        let images = match tokio::task::spawn_blocking(move || renderer.render(&bytes)).await {
            Ok(Ok(images)) => images,
            Ok(Err(e)) => {
                tracing::warn!(document_id = %document_id, "Page rendering failed: {}", e);
                return 0;
            }
            Err(e) => {
                tracing::warn!(document_id = %document_id, "Page rendering task failed: {}", e);
                return 0;
            }
        };

        let mut stored = 0;
        for image in images {
            let path = image.storage_path(document_id);
            match self.storage.upload(&path, image.bytes, image.content_type).await {
                Ok(()) => stored += 1,
                Err(e) => {
                    tracing::warn!(
                        document_id = %document_id,
                        page = image.page_number,
                        "Failed to store page image: {}",
                        e
                    );
                }
            }
        }

        stored
    }
}

fn collect_results(outcomes: Vec<ChunkOutcome>) -> (Vec<OcrPage>, Vec<OcrBlock>) {
    let mut pages = Vec::new();
    let mut blocks = Vec::new();

    for outcome in outcomes {
        if let ChunkOutcome::Success { extraction, .. } = outcome {
            pages.extend(extraction.pages);
            blocks.extend(extraction.blocks);
        }
    }

    (pages, blocks)
}

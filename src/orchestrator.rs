//! Extraction runner
//!
//! Owns whole-pipeline retries and guarantees at most one run per document
//! at a time. Uploads arrive as [`PipelineEvent::DocumentUploaded`] or as
//! direct calls from the HTTP layer.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::config::PipelineSettings;
use crate::error::{AppError, Result};
use crate::events::{EventBus, PipelineEvent};
use crate::extraction::{ExtractionPipeline, ExtractionSummary};

/// Runner configuration
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Pipeline attempts for retryable failures, including the first
    pub max_attempts: u32,
    /// Delay after the first failed attempt, doubled for each further one
    pub retry_backoff: Duration,
}

impl From<&PipelineSettings> for RunnerConfig {
    fn from(settings: &PipelineSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            retry_backoff: Duration::from_millis(settings.retry_backoff_ms),
        }
    }
}

type InFlight = Arc<Mutex<HashSet<String>>>;

/// Releases a document's in-flight slot when dropped
pub(crate) struct InFlightGuard {
    in_flight: InFlight,
    document_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut set) = self.in_flight.lock() {
            set.remove(&self.document_id);
        }
    }
}

/// Runs the extraction pipeline with retries
#[derive(Clone)]
pub struct ExtractionRunner {
    pipeline: ExtractionPipeline,
    events: EventBus,
    config: RunnerConfig,
    in_flight: InFlight,
}

impl ExtractionRunner {
    pub fn new(pipeline: ExtractionPipeline, events: EventBus, config: RunnerConfig) -> Self {
        Self {
            pipeline,
            events,
            config,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn is_in_flight(&self, document_id: &str) -> bool {
        self.in_flight
            .lock()
            .map(|set| set.contains(document_id))
            .unwrap_or(false)
    }

    pub(crate) fn claim(&self, document_id: &str) -> Result<InFlightGuard> {
        let mut set = self
            .in_flight
            .lock()
            .map_err(|_| AppError::Internal("in-flight registry poisoned".to_string()))?;

        if !set.insert(document_id.to_string()) {
            return Err(AppError::Conflict(format!(
                "Extraction already running for document {}",
                document_id
            )));
        }

        Ok(InFlightGuard {
            in_flight: self.in_flight.clone(),
            document_id: document_id.to_string(),
        })
    }

    /// Run extraction to completion, retrying retryable failures.
    ///
    /// Returns `Conflict` if a run for the document is already in flight.
    pub async fn run_with_retries(&self, document_id: &str) -> Result<ExtractionSummary> {
        let guard = self.claim(document_id)?;
        self.run_claimed(guard).await
    }

    /// Start a run in the background. The in-flight slot is taken before
    /// returning, so a second call for the same document fails immediately.
    pub fn spawn(&self, document_id: &str) -> Result<JoinHandle<Result<ExtractionSummary>>> {
        let guard = self.claim(document_id)?;
        let runner = self.clone();
        Ok(tokio::spawn(async move { runner.run_claimed(guard).await }))
    }

    async fn run_claimed(&self, guard: InFlightGuard) -> Result<ExtractionSummary> {
        let document_id = guard.document_id.as_str();
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            match self.pipeline.run(document_id).await {
                Ok(summary) => return Ok(summary),
                Err(e) if e.is_retryable() && attempt < self.config.max_attempts => {
                    let delay = self.retry_backoff(attempt);
                    tracing::warn!(
                        document_id = %document_id,
                        attempt,
                        max_attempts = self.config.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Extraction attempt failed: {}, retrying",
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    // Fatal errors were already recorded by the pipeline
                    if e.is_retryable() {
                        self.pipeline.mark_failed(document_id, &e).await;
                    }

                    tracing::error!(
                        document_id = %document_id,
                        attempts = attempt,
                        "Extraction failed: {}",
                        e
                    );
                    self.events.publish(PipelineEvent::ExtractionFailed {
                        document_id: document_id.to_string(),
                        attempts: attempt,
                        message: e.user_message(),
                    });
                    return Err(e.into());
                }
            }
        }
    }

    fn retry_backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(5);
        self.config.retry_backoff * (1 << exponent)
    }

    /// Start extractions for [`PipelineEvent::DocumentUploaded`] events
    pub fn listen(self) -> JoinHandle<()> {
        let mut rx = self.events.subscribe();

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(PipelineEvent::DocumentUploaded { document_id, user_id }) => {
                        tracing::info!(document_id = %document_id, user_id = %user_id, "Document uploaded");
                        if let Err(e) = self.spawn(&document_id) {
                            tracing::warn!(document_id = %document_id, "Not starting extraction: {}", e);
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Extraction listener lagged behind");
                    }
                    Err(RecvError::Closed) => {
                        tracing::info!("Event bus closed, stopping extraction listener");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DocumentStatus;
    use crate::extraction::testing::Harness;
    use crate::extraction::PipelineError;
    use crate::ocr::ScriptedOcrProvider;

    fn runner(h: &Harness, pipeline: ExtractionPipeline) -> ExtractionRunner {
        ExtractionRunner::new(
            pipeline,
            h.events.clone(),
            RunnerConfig {
                max_attempts: 3,
                retry_backoff: Duration::ZERO,
            },
        )
    }

    #[tokio::test]
    async fn test_successful_run_releases_slot() {
        let (h, pipeline) = Harness::new(4, ScriptedOcrProvider::default()).await;
        let runner = runner(&h, pipeline);

        let summary = runner.run_with_retries(&h.document_id).await.unwrap();
        assert_eq!(summary.page_count, 4);
        assert!(!runner.is_in_flight(&h.document_id));
    }

    #[tokio::test]
    async fn test_retryable_failure_exhausts_attempts() {
        let (h, pipeline) = Harness::new(4, ScriptedOcrProvider::default()).await;
        h.storage
            .fail_downloads
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let runner = runner(&h, pipeline);
        let mut rx = h.events.subscribe();

        let err = runner.run_with_retries(&h.document_id).await.unwrap_err();
        assert!(matches!(err, AppError::Pipeline(PipelineError::Download { .. })));

        match rx.recv().await.unwrap() {
            PipelineEvent::ExtractionFailed { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("unexpected event {:?}", other),
        }

        let doc = h.store.documents().get(&h.document_id).await.unwrap().unwrap();
        assert_eq!(doc.status(), Some(DocumentStatus::Failed));
        assert!(!runner.is_in_flight(&h.document_id));
    }

    #[tokio::test]
    async fn test_fatal_failure_not_retried() {
        let (h, pipeline) =
            Harness::with_file(4, ScriptedOcrProvider::default(), vec![0u8; 128 * 1024]).await;
        let runner = runner(&h, pipeline);
        let mut rx = h.events.subscribe();

        let err = runner.run_with_retries(&h.document_id).await.unwrap_err();
        assert!(matches!(err, AppError::Pipeline(PipelineError::FileTooLarge { .. })));

        match rx.recv().await.unwrap() {
            PipelineEvent::ExtractionFailed { attempts, message, .. } => {
                assert_eq!(attempts, 1);
                assert!(message.contains("limit"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rejects_concurrent_run() {
        let (h, pipeline) = Harness::new(4, ScriptedOcrProvider::default()).await;
        let runner = runner(&h, pipeline);

        let guard = runner.claim(&h.document_id).unwrap();
        assert!(runner.is_in_flight(&h.document_id));

        let err = runner.run_with_retries(&h.document_id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(matches!(runner.spawn(&h.document_id), Err(AppError::Conflict(_))));

        drop(guard);
        assert!(!runner.is_in_flight(&h.document_id));
        assert!(runner.run_with_retries(&h.document_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_listener_handles_upload_event() {
        let (h, pipeline) = Harness::new(2, ScriptedOcrProvider::default()).await;
        let runner = runner(&h, pipeline);
        let mut rx = h.events.subscribe();
        let listener = runner.clone().listen();

        h.events.publish(PipelineEvent::DocumentUploaded {
            document_id: h.document_id.clone(),
            user_id: "user-1".to_string(),
        });

        let extracted = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let PipelineEvent::DocumentExtracted { document_id, page_count, .. } =
                    rx.recv().await.unwrap()
                {
                    return (document_id, page_count);
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(extracted, (h.document_id.clone(), 2));
        listener.abort();
    }
}

//! OCR Service
//!
//! Wraps a provider with bounded per-request retries.

use std::sync::Arc;
use std::time::Duration;

use crate::config::OcrConfig;

use super::{
    provider::OcrProvider,
    types::{OcrError, OcrExtraction, OcrRequest},
};

/// OCR service configuration
#[derive(Debug, Clone)]
pub struct OcrServiceConfig {
    /// Extra attempts after a retryable failure
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each further retry
    pub retry_backoff: Duration,
}

impl Default for OcrServiceConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_backoff: Duration::from_millis(1000),
        }
    }
}

impl From<&OcrConfig> for OcrServiceConfig {
    fn from(config: &OcrConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

/// OCR service used by the extraction pipeline
#[derive(Clone)]
pub struct OcrService {
    config: OcrServiceConfig,
    provider: Arc<dyn OcrProvider>,
}

impl OcrService {
    pub fn new(config: OcrServiceConfig, provider: Arc<dyn OcrProvider>) -> Self {
        Self { config, provider }
    }

    pub fn config(&self) -> &OcrServiceConfig {
        &self.config
    }

    /// Extract a chunk, retrying retryable failures up to `request.max_retries` times.
    ///
    /// Non-retryable errors are returned after the first attempt.
    pub async fn extract(&self, request: OcrRequest<'_>) -> Result<OcrExtraction, OcrError> {
        let mut attempt = 0u32;

        loop {
            match self.provider.extract(request).await {
                Ok(extraction) => {
                    if attempt > 0 {
                        tracing::info!(
                            provider = self.provider.name(),
                            page_offset = request.page_offset,
                            attempt = attempt + 1,
                            "OCR succeeded after retry"
                        );
                    }
                    return Ok(extraction);
                }
                Err(e) if e.is_retryable() && attempt < request.max_retries => {
                    attempt += 1;
                    let delay = self.retry_backoff(attempt);
                    tracing::warn!(
                        provider = self.provider.name(),
                        page_offset = request.page_offset,
                        attempt,
                        max_retries = request.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "OCR attempt failed: {}, retrying",
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Build a request for a chunk using the configured retry budget
    pub fn request<'a>(&self, bytes: &'a [u8], page_offset: u32, page_count: u32) -> OcrRequest<'a> {
        OcrRequest {
            bytes,
            page_offset,
            page_count,
            max_retries: self.config.max_retries,
        }
    }

    fn retry_backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(5);
        self.config.retry_backoff * (1 << exponent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::provider::ScriptedOcrProvider;

    fn service(provider: Arc<ScriptedOcrProvider>) -> OcrService {
        OcrService::new(
            OcrServiceConfig {
                max_retries: 2,
                retry_backoff: Duration::ZERO,
            },
            provider,
        )
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let provider = Arc::new(ScriptedOcrProvider::default());
        let service = service(provider.clone());

        let result = service.extract(service.request(b"%PDF", 0, 3)).await.unwrap();
        assert_eq!(result.pages.len(), 3);
        assert_eq!(provider.attempts(0), 1);
    }

    #[tokio::test]
    async fn test_retryable_error_recovers() {
        let provider = Arc::new(
            ScriptedOcrProvider::default().fail_chunk_times(0, OcrError::RateLimited("429".into()), 2),
        );
        let service = service(provider.clone());

        let result = service.extract(service.request(b"%PDF", 0, 1)).await.unwrap();
        assert_eq!(result.pages.len(), 1);
        assert_eq!(provider.attempts(0), 3);
    }

    #[tokio::test]
    async fn test_retryable_error_exhausts_budget() {
        let provider = Arc::new(
            ScriptedOcrProvider::default().fail_chunk(0, OcrError::Unavailable("503".into())),
        );
        let service = service(provider.clone());

        let result = service.extract(service.request(b"%PDF", 0, 1)).await;
        assert!(matches!(result, Err(OcrError::Unavailable(_))));
        assert_eq!(provider.attempts(0), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_not_retried() {
        let provider = Arc::new(
            ScriptedOcrProvider::default().fail_chunk(0, OcrError::Rejected("encrypted".into())),
        );
        let service = service(provider.clone());

        let result = service.extract(service.request(b"%PDF", 0, 1)).await;
        assert!(matches!(result, Err(OcrError::Rejected(_))));
        assert_eq!(provider.attempts(0), 1);
    }

    #[test]
    fn test_config_from_settings() {
        let config = OcrServiceConfig::from(&OcrConfig::default());
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.retry_backoff, Duration::from_millis(1000));
    }

    #[test]
    fn test_backoff_doubles() {
        let service = OcrService::new(
            OcrServiceConfig {
                max_retries: 2,
                retry_backoff: Duration::from_millis(100),
            },
            Arc::new(ScriptedOcrProvider::default()),
        );
        assert_eq!(service.retry_backoff(1), Duration::from_millis(100));
        assert_eq!(service.retry_backoff(2), Duration::from_millis(200));
        assert_eq!(service.retry_backoff(3), Duration::from_millis(400));
    }
}

//! Configuration management for the IEP evidence server

use serde::Deserialize;
use std::env;

use crate::verify::VerifyOptions;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub ocr: OcrConfig,
    pub pipeline: PipelineSettings,
    pub verification: VerifyOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// Base URL of the OCR service
    pub endpoint: String,
    pub api_key: Option<String>,
    /// Pages the provider accepts per request
    pub max_pages_per_request: u32,
    /// Extra attempts per chunk after the first failure
    pub max_retries: u32,
    /// Base delay between chunk retries, doubled per attempt
    pub retry_backoff_ms: u64,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSettings {
    pub max_file_bytes: u64,
    pub block_batch_size: usize,
    /// Whole-pipeline attempts for retryable failures
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        OcrConfig {
            endpoint: "http://localhost:8080".to_string(),
            api_key: None,
            max_pages_per_request: 200,
            max_retries: 2,
            retry_backoff_ms: 1000,
            timeout_secs: 300,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        PipelineSettings {
            max_file_bytes: 20 * 1024 * 1024,
            block_batch_size: 100,
            max_attempts: 3,
            retry_backoff_ms: 5000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            storage: StorageConfig {
                endpoint: "http://localhost:9000".to_string(),
                bucket: "iep-documents".to_string(),
                access_key: "admin".to_string(),
                secret_key: "password123".to_string(),
                region: Some("us-east-1".to_string()),
            },
            database: DatabaseConfig {
                url: "sqlite:./iep_evidence.db".to_string(),
            },
            ocr: OcrConfig::default(),
            pipeline: PipelineSettings::default(),
            verification: VerifyOptions::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        let ocr_defaults = OcrConfig::default();
        let pipeline_defaults = PipelineSettings::default();
        let verify_defaults = VerifyOptions::default();

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_var("SERVER_PORT", 3000),
            },
            storage: StorageConfig {
                endpoint: env::var("S3_ENDPOINT")?,
                bucket: env::var("S3_BUCKET")?,
                access_key: env::var("S3_ACCESS_KEY")?,
                secret_key: env::var("S3_SECRET_KEY")?,
                region: env::var("S3_REGION").ok(),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:./iep_evidence.db".to_string()),
            },
            ocr: OcrConfig {
                endpoint: env::var("OCR_ENDPOINT")?,
                api_key: env::var("OCR_API_KEY").ok(),
                max_pages_per_request: parse_var(
                    "OCR_MAX_PAGES_PER_REQUEST",
                    ocr_defaults.max_pages_per_request,
                ),
                max_retries: parse_var("OCR_MAX_RETRIES", ocr_defaults.max_retries),
                retry_backoff_ms: parse_var("OCR_RETRY_BACKOFF_MS", ocr_defaults.retry_backoff_ms),
                timeout_secs: parse_var("OCR_TIMEOUT_SECS", ocr_defaults.timeout_secs),
            },
            pipeline: PipelineSettings {
                max_file_bytes: parse_var("PIPELINE_MAX_FILE_BYTES", pipeline_defaults.max_file_bytes),
                block_batch_size: parse_var(
                    "PIPELINE_BLOCK_BATCH_SIZE",
                    pipeline_defaults.block_batch_size,
                ),
                max_attempts: parse_var("PIPELINE_MAX_ATTEMPTS", pipeline_defaults.max_attempts),
                retry_backoff_ms: parse_var(
                    "PIPELINE_RETRY_BACKOFF_MS",
                    pipeline_defaults.retry_backoff_ms,
                ),
            },
            verification: VerifyOptions {
                min_length: parse_var("VERIFY_MIN_LENGTH", verify_defaults.min_length),
                allow_fuzzy: parse_var("VERIFY_ALLOW_FUZZY", verify_defaults.allow_fuzzy),
                fuzzy_threshold: parse_var("VERIFY_FUZZY_THRESHOLD", verify_defaults.fuzzy_threshold),
                max_page_length_for_fuzzy: parse_var(
                    "VERIFY_MAX_PAGE_LENGTH_FOR_FUZZY",
                    verify_defaults.max_page_length_for_fuzzy,
                ),
                max_quote_length_for_fuzzy: parse_var(
                    "VERIFY_MAX_QUOTE_LENGTH_FOR_FUZZY",
                    verify_defaults.max_quote_length_for_fuzzy,
                ),
            },
        })
    }
}

/// Read and parse an optional variable, falling back on absence or parse failure
fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

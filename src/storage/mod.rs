//! Storage module for S3-compatible backends
//!
//! Source PDFs and rendered page images live in object storage. The pipeline
//! only sees the [`ObjectStore`] trait.

mod s3_client;
mod types;

pub use s3_client::S3Client;
pub use types::*;

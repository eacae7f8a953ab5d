//! Database module for SQLite persistence
//!
//! Handles documents, extracted pages and blocks, and citations. The pipeline
//! and citation verifier only see the [`DocumentStore`] trait.

mod citations;
mod documents;
mod pages;
mod schema;

pub use citations::*;
pub use documents::*;
pub use pages::*;
pub use schema::*;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::error::Result;
use crate::evidence::Citation;
use crate::ocr::{OcrBlock, OcrPage};

/// Create a new database connection pool
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run migrations
    initialize_schema(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database for tests
#[cfg(test)]
pub async fn create_memory_pool() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

    // Every connection to :memory: is its own database, so keep exactly one alive
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    initialize_schema(&pool).await?;

    Ok(pool)
}

/// Persistence used by the extraction pipeline and citation verification
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_document(&self, id: &str) -> Result<Option<Document>>;

    /// Returns false if the document does not exist
    async fn update_status(&self, id: &str, update: &DocumentStatusUpdate) -> Result<bool>;

    /// Upsert keyed on `(document_id, page_number)`
    async fn upsert_pages(&self, document_id: &str, pages: &[OcrPage]) -> Result<()>;

    /// Delete every block of a document, returning the count removed
    async fn delete_blocks(&self, document_id: &str) -> Result<u64>;

    /// Insert one batch of blocks
    async fn insert_blocks(&self, document_id: &str, blocks: &[OcrBlock]) -> Result<()>;

    async fn page_text(&self, document_id: &str, page_number: u32) -> Result<Option<String>>;

    async fn insert_citations(&self, citations: &[Citation]) -> Result<()>;
}

/// [`DocumentStore`] backed by the SQLite repositories
#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn documents(&self) -> DocumentRepository<'_> {
        DocumentRepository::new(&self.pool)
    }

    pub fn pages(&self) -> PageRepository<'_> {
        PageRepository::new(&self.pool)
    }

    pub fn blocks(&self) -> BlockRepository<'_> {
        BlockRepository::new(&self.pool)
    }

    pub fn citations(&self) -> CitationRepository<'_> {
        CitationRepository::new(&self.pool)
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        self.documents().get(id).await
    }

    async fn update_status(&self, id: &str, update: &DocumentStatusUpdate) -> Result<bool> {
        self.documents().update_status(id, update).await
    }

    async fn upsert_pages(&self, document_id: &str, pages: &[OcrPage]) -> Result<()> {
        self.pages().upsert_many(document_id, pages).await
    }

    async fn delete_blocks(&self, document_id: &str) -> Result<u64> {
        self.blocks().delete_for_document(document_id).await
    }

    async fn insert_blocks(&self, document_id: &str, blocks: &[OcrBlock]) -> Result<()> {
        self.blocks().insert_batch(document_id, blocks).await
    }

    async fn page_text(&self, document_id: &str, page_number: u32) -> Result<Option<String>> {
        self.pages().get_text(document_id, page_number).await
    }

    async fn insert_citations(&self, citations: &[Citation]) -> Result<()> {
        self.citations().insert_many(citations).await
    }
}

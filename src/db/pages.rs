//! Page and block database operations
//!
//! Pages are upserted on `(document_id, page_number)`. Blocks have no natural
//! key, so each run deletes a document's blocks and inserts the new set.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::error::Result;
use crate::ocr::{BoundingBox, OcrBlock, OcrPage};

/// Page record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Page {
    pub id: String,
    pub document_id: String,
    pub page_number: i64,
    pub text: String,
    pub text_normalized: String,
    pub word_count: i64,
    pub confidence: f64,
    pub created_at: String,
    pub updated_at: String,
}

/// Block record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Block {
    pub id: String,
    pub document_id: String,
    pub page_number: i64,
    pub block_type: String,
    pub text: String,
    pub text_normalized: String,
    pub bbox_x: f64,
    pub bbox_y: f64,
    pub bbox_width: f64,
    pub bbox_height: f64,
    pub confidence: f64,
    pub reading_order: i64,
    pub created_at: String,
}

impl Block {
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox {
            x: self.bbox_x,
            y: self.bbox_y,
            width: self.bbox_width,
            height: self.bbox_height,
        }
    }
}

/// Page repository
pub struct PageRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PageRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or overwrite pages for a document
    pub async fn upsert_many(&self, document_id: &str, pages: &[OcrPage]) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        for page in pages {
            sqlx::query(
                r#"
                INSERT INTO document_pages (id, document_id, page_number, text, text_normalized, word_count, confidence, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(document_id, page_number) DO UPDATE SET
                    text = excluded.text,
                    text_normalized = excluded.text_normalized,
                    word_count = excluded.word_count,
                    confidence = excluded.confidence,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(document_id)
            .bind(i64::from(page.page_number))
            .bind(&page.text)
            .bind(&page.text_normalized)
            .bind(i64::from(page.word_count))
            .bind(page.confidence)
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// List pages for a document in page order
    pub async fn list_for_document(&self, document_id: &str) -> Result<Vec<Page>> {
        let pages = sqlx::query_as::<_, Page>(
            r#"
            SELECT id, document_id, page_number, text, text_normalized, word_count,
                   confidence, created_at, updated_at
            FROM document_pages
            WHERE document_id = ?
            ORDER BY page_number ASC
            "#,
        )
        .bind(document_id)
        .fetch_all(self.pool)
        .await?;

        Ok(pages)
    }

    /// Raw OCR text of one page
    pub async fn get_text(&self, document_id: &str, page_number: u32) -> Result<Option<String>> {
        let text: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT text
            FROM document_pages
            WHERE document_id = ? AND page_number = ?
            "#,
        )
        .bind(document_id)
        .bind(i64::from(page_number))
        .fetch_optional(self.pool)
        .await?;

        Ok(text.map(|(text,)| text))
    }
}

/// Block repository
pub struct BlockRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> BlockRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Delete every block of a document
    pub async fn delete_for_document(&self, document_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM document_blocks WHERE document_id = ?")
            .bind(document_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Insert one batch of blocks with a single statement
    pub async fn insert_batch(&self, document_id: &str, blocks: &[OcrBlock]) -> Result<()> {
        if blocks.is_empty() {
            return Ok(());
        }

        let now = Utc::now().to_rfc3339();
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO document_blocks (id, document_id, page_number, block_type, text, text_normalized, \
             bbox_x, bbox_y, bbox_width, bbox_height, confidence, reading_order, created_at) ",
        );

        builder.push_values(blocks, |mut row, block| {
            row.push_bind(Uuid::new_v4().to_string())
                .push_bind(document_id)
                .push_bind(i64::from(block.page_number))
                .push_bind(&block.block_type)
                .push_bind(&block.text)
                .push_bind(&block.text_normalized)
                .push_bind(block.bbox.x)
                .push_bind(block.bbox.y)
                .push_bind(block.bbox.width)
                .push_bind(block.bbox.height)
                .push_bind(block.confidence)
                .push_bind(i64::from(block.reading_order))
                .push_bind(now.clone());
        });

        builder.build().execute(self.pool).await?;
        Ok(())
    }

    /// List blocks for a document in page and reading order
    pub async fn list_for_document(&self, document_id: &str) -> Result<Vec<Block>> {
        let blocks = sqlx::query_as::<_, Block>(
            r#"
            SELECT id, document_id, page_number, block_type, text, text_normalized,
                   bbox_x, bbox_y, bbox_width, bbox_height, confidence, reading_order, created_at
            FROM document_blocks
            WHERE document_id = ?
            ORDER BY page_number ASC, reading_order ASC
            "#,
        )
        .bind(document_id)
        .fetch_all(self.pool)
        .await?;

        Ok(blocks)
    }
}

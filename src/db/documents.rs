//! Document database operations

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::Result;

/// Processing state of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Stored, waiting for extraction
    Uploaded,
    /// Extraction run in progress
    Processing,
    /// Pages and blocks persisted (possibly partial)
    Extracted,
    /// Extraction gave up
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Processing => "processing",
            Self::Extracted => "extracted",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "uploaded" => Some(Self::Uploaded),
            "processing" => Some(Self::Processing),
            "extracted" => Some(Self::Extracted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Document record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Document {
    pub id: String,
    pub user_id: String,
    pub file_name: String,
    pub storage_path: String,
    pub status: String,
    pub page_count: Option<i64>,
    pub is_partial_extraction: bool,
    pub error_message: Option<String>,
    /// JSON detail of failed chunks or the fatal error
    pub error_details: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Document {
    pub fn status(&self) -> Option<DocumentStatus> {
        DocumentStatus::parse(&self.status)
    }
}

/// Create document request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    pub user_id: String,
    pub file_name: String,
    /// Object key of the uploaded PDF
    pub storage_path: String,
}

/// Status change with its metadata bag
///
/// `None` fields leave the stored value untouched, except the error fields
/// which are always overwritten so a successful rerun clears them.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentStatusUpdate {
    pub status: DocumentStatus,
    pub page_count: Option<u32>,
    pub is_partial_extraction: Option<bool>,
    pub error_message: Option<String>,
    pub error_details: Option<serde_json::Value>,
}

impl DocumentStatusUpdate {
    pub fn new(status: DocumentStatus) -> Self {
        Self {
            status,
            page_count: None,
            is_partial_extraction: None,
            error_message: None,
            error_details: None,
        }
    }

    pub fn with_page_count(mut self, page_count: u32) -> Self {
        self.page_count = Some(page_count);
        self
    }

    pub fn with_partial(mut self, is_partial: bool) -> Self {
        self.is_partial_extraction = Some(is_partial);
        self
    }

    pub fn with_error(mut self, message: impl Into<String>, details: Option<serde_json::Value>) -> Self {
        self.error_message = Some(message.into());
        self.error_details = details;
        self
    }
}

/// Document repository
pub struct DocumentRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> DocumentRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a specific document
    pub async fn get(&self, id: &str) -> Result<Option<Document>> {
        let document = sqlx::query_as::<_, Document>(
            r#"
            SELECT id, user_id, file_name, storage_path, status, page_count,
                   is_partial_extraction, error_message, error_details,
                   created_at, updated_at
            FROM documents
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(document)
    }

    /// Register an uploaded document
    pub async fn create(&self, data: &NewDocument) -> Result<Document> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO documents (id, user_id, file_name, storage_path, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&data.user_id)
        .bind(&data.file_name)
        .bind(&data.storage_path)
        .bind(DocumentStatus::Uploaded.as_str())
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await?;

        self.get(&id)
            .await?
            .ok_or_else(|| crate::error::AppError::Internal("Failed to fetch created document".to_string()))
    }

    /// Apply a status update. Returns false if the document does not exist.
    pub async fn update_status(&self, id: &str, update: &DocumentStatusUpdate) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let details = update
            .error_details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let result = sqlx::query(
            r#"
            UPDATE documents
            SET status = ?,
                page_count = COALESCE(?, page_count),
                is_partial_extraction = COALESCE(?, is_partial_extraction),
                error_message = ?,
                error_details = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(update.status.as_str())
        .bind(update.page_count.map(i64::from))
        .bind(update.is_partial_extraction)
        .bind(&update.error_message)
        .bind(details)
        .bind(&now)
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

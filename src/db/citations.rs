//! Citation database operations
//!
//! Citations are append-only. Re-verifying a document inserts new rows with
//! a new `verified_at`.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::Result;
use crate::evidence::{Citation, VerificationStatus};
use crate::verify::{MatchType, VerificationResult};

/// Citation row as stored
#[derive(Debug, Clone, sqlx::FromRow)]
struct CitationRow {
    id: String,
    document_id: String,
    field_path: String,
    page_number: i64,
    quote: String,
    bbox: Option<String>,
    llm_confidence: Option<f64>,
    verification_status: String,
    match_type: String,
    confidence: f64,
    matched_text: Option<String>,
    position: Option<i64>,
    verified_at: String,
}

impl CitationRow {
    fn into_citation(self) -> Citation {
        let verification_status = VerificationStatus::parse(&self.verification_status);
        let match_type = MatchType::parse(&self.match_type);

        Citation {
            id: self.id,
            document_id: self.document_id,
            field_path: self.field_path,
            page_number: self.page_number.max(0) as u32,
            quote: self.quote,
            bbox: self.bbox.and_then(|raw| serde_json::from_str(&raw).ok()),
            llm_confidence: self.llm_confidence,
            verification: VerificationResult {
                verified: verification_status == VerificationStatus::Verified,
                match_type,
                confidence: self.confidence,
                matched_text: self.matched_text,
                position: self.position.map(|p| p.max(0) as usize),
            },
            verification_status,
            verified_at: DateTime::parse_from_rfc3339(&self.verified_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        }
    }
}

/// Citation repository
pub struct CitationRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CitationRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert citations in one transaction
    pub async fn insert_many(&self, citations: &[Citation]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for citation in citations {
            let bbox = citation.bbox.as_ref().map(serde_json::to_string).transpose()?;

            sqlx::query(
                r#"
                INSERT INTO citations (id, document_id, field_path, page_number, quote, bbox, llm_confidence,
                                       verification_status, match_type, confidence, matched_text, position, verified_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&citation.id)
            .bind(&citation.document_id)
            .bind(&citation.field_path)
            .bind(i64::from(citation.page_number))
            .bind(&citation.quote)
            .bind(bbox)
            .bind(citation.llm_confidence)
            .bind(citation.verification_status.as_str())
            .bind(citation.verification.match_type.as_str())
            .bind(citation.verification.confidence)
            .bind(&citation.verification.matched_text)
            .bind(citation.verification.position.map(|p| p as i64))
            .bind(citation.verified_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// List citations for a document, newest verification first
    pub async fn list_for_document(&self, document_id: &str) -> Result<Vec<Citation>> {
        let rows = sqlx::query_as::<_, CitationRow>(
            r#"
            SELECT id, document_id, field_path, page_number, quote, bbox, llm_confidence,
                   verification_status, match_type, confidence, matched_text, position, verified_at
            FROM citations
            WHERE document_id = ?
            ORDER BY verified_at DESC, field_path ASC
            "#,
        )
        .bind(document_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(CitationRow::into_citation).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;
    use crate::ocr::BoundingBox;

    #[tokio::test]
    async fn test_insert_and_list_round_trip() {
        let pool = create_memory_pool().await.unwrap();
        let repo = CitationRepository::new(&pool);

        let citation = Citation {
            id: "c-1".to_string(),
            document_id: "doc-1".to_string(),
            field_path: "goals.0.baseline".to_string(),
            page_number: 3,
            quote: "reads 45 words per minute".to_string(),
            bbox: Some(BoundingBox { x: 0.1, y: 0.2, width: 0.3, height: 0.05 }),
            llm_confidence: Some(0.8),
            verification: VerificationResult {
                verified: true,
                match_type: MatchType::Normalized,
                confidence: 0.95,
                matched_text: Some("reads 45 words per minute".to_string()),
                position: Some(17),
            },
            verification_status: VerificationStatus::Verified,
            verified_at: Utc::now(),
        };

        repo.insert_many(std::slice::from_ref(&citation)).await.unwrap();
        let stored = repo.list_for_document("doc-1").await.unwrap();

        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].verification, citation.verification);
        assert_eq!(stored[0].bbox, citation.bbox);
        assert_eq!(stored[0].verification_status, VerificationStatus::Verified);
        assert!(repo.list_for_document("doc-2").await.unwrap().is_empty());
    }
}

//! Citation verification
//!
//! Checks each evidence quote against the stored text of the page it cites
//! and records the outcome as a citation.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::types::{Citation, FieldEvidence, FieldWithEvidence, VerificationStatus};
use crate::db::DocumentStore;
use crate::error::Result;
use crate::verify::{QuoteVerifier, VerificationResult};

/// Verifies evidence quotes for a document and persists citations
#[derive(Clone)]
pub struct CitationVerifier {
    store: Arc<dyn DocumentStore>,
    verifier: QuoteVerifier,
}

impl CitationVerifier {
    pub fn new(store: Arc<dyn DocumentStore>, verifier: QuoteVerifier) -> Self {
        Self { store, verifier }
    }

    pub fn verifier(&self) -> &QuoteVerifier {
        &self.verifier
    }

    /// Verify every item and insert one citation per item.
    ///
    /// Items citing a page with no stored text are recorded as skipped.
    pub async fn verify_evidence(&self, document_id: &str, items: &[FieldEvidence]) -> Result<Vec<Citation>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let mut page_cache: HashMap<u32, Option<String>> = HashMap::new();
        let mut citations = Vec::with_capacity(items.len());
        let verified_at = Utc::now();

        for item in items {
            let evidence = &item.evidence;

            let page_text = match page_cache.get(&evidence.page) {
                Some(text) => text.clone(),
                None => {
                    let text = if evidence.page == 0 {
                        None
                    } else {
                        self.store.page_text(document_id, evidence.page).await?
                    };
                    page_cache.insert(evidence.page, text.clone());
                    text
                }
            };

            let (verification, verification_status) = match page_text {
                Some(text) => {
                    let result = self.verifier.verify(&text, &evidence.quote);
                    let status = if result.verified {
                        VerificationStatus::Verified
                    } else {
                        VerificationStatus::Failed
                    };
                    (result, status)
                }
                None => (VerificationResult::unverified(), VerificationStatus::Skipped),
            };

            citations.push(Citation {
                id: Uuid::new_v4().to_string(),
                document_id: document_id.to_string(),
                field_path: item.field_path.clone(),
                page_number: evidence.page,
                quote: evidence.quote.clone(),
                bbox: evidence.bbox,
                llm_confidence: evidence.confidence,
                verification,
                verification_status,
                verified_at,
            });
        }

        self.store.insert_citations(&citations).await?;

        let verified = citations
            .iter()
            .filter(|c| c.verification_status == VerificationStatus::Verified)
            .count();
        let skipped = citations
            .iter()
            .filter(|c| c.verification_status == VerificationStatus::Skipped)
            .count();
        tracing::info!(
            document_id = %document_id,
            total = citations.len(),
            verified,
            skipped,
            "Verified citations"
        );

        Ok(citations)
    }

    /// Verify the evidence attached to a single extracted field
    pub async fn verify_field<T>(
        &self,
        document_id: &str,
        field_path: &str,
        field: &FieldWithEvidence<T>,
    ) -> Result<Vec<Citation>> {
        let items: Vec<FieldEvidence> = field
            .evidence
            .iter()
            .map(|evidence| FieldEvidence {
                field_path: field_path.to_string(),
                evidence: evidence.clone(),
            })
            .collect();

        self.verify_evidence(document_id, &items).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_memory_pool, NewDocument, SqliteDocumentStore};
    use crate::evidence::Evidence;
    use crate::ocr::OcrPage;
    use crate::verify::{MatchType, VerifyOptions};

    async fn store_with_page(text: &str) -> (SqliteDocumentStore, String) {
        let store = SqliteDocumentStore::new(create_memory_pool().await.unwrap());
        let doc = store
            .documents()
            .create(&NewDocument {
                user_id: "user-1".to_string(),
                file_name: "iep.pdf".to_string(),
                storage_path: "uploads/iep.pdf".to_string(),
            })
            .await
            .unwrap();

        let page = OcrPage {
            page_number: 3,
            text: text.to_string(),
            text_normalized: crate::text::canonicalize(text),
            word_count: crate::text::word_count(text) as u32,
            confidence: 0.9,
        };
        store.pages().upsert_many(&doc.id, &[page]).await.unwrap();

        (store, doc.id)
    }

    fn item(field_path: &str, page: u32, quote: &str) -> FieldEvidence {
        FieldEvidence {
            field_path: field_path.to_string(),
            evidence: Evidence {
                page,
                quote: quote.to_string(),
                bbox: None,
                confidence: Some(0.7),
            },
        }
    }

    #[tokio::test]
    async fn test_verify_evidence_statuses() {
        let (store, document_id) =
            store_with_page("Present levels: Sam reads 45 words per minute with 90% accuracy.").await;
        let verifier = CitationVerifier::new(Arc::new(store.clone()), QuoteVerifier::default());

        let citations = verifier
            .verify_evidence(
                &document_id,
                &[
                    item("goals.0.baseline", 3, "reads 45 words per minute"),
                    item("goals.0.target", 3, "reads 90 words per minute"),
                    item("services.0", 9, "speech therapy twice weekly"),
                    item("services.1", 0, "occupational therapy monthly"),
                ],
            )
            .await
            .unwrap();

        assert_eq!(citations.len(), 4);
        assert_eq!(citations[0].verification_status, VerificationStatus::Verified);
        assert_eq!(citations[0].verification.match_type, MatchType::Exact);
        assert_eq!(citations[1].verification_status, VerificationStatus::Failed);
        assert_eq!(citations[1].verification.match_type, MatchType::None);
        assert_eq!(citations[2].verification_status, VerificationStatus::Skipped);
        assert_eq!(citations[3].verification_status, VerificationStatus::Skipped);

        let stored = store.citations().list_for_document(&document_id).await.unwrap();
        assert_eq!(stored.len(), 4);
    }

    #[tokio::test]
    async fn test_reverification_inserts_new_rows() {
        let (store, document_id) = store_with_page("The student will use a graphic organizer.").await;
        let verifier = CitationVerifier::new(Arc::new(store.clone()), QuoteVerifier::default());
        let items = [item("accommodations.0", 3, "use a graphic organizer")];

        verifier.verify_evidence(&document_id, &items).await.unwrap();
        verifier.verify_evidence(&document_id, &items).await.unwrap();

        let stored = store.citations().list_for_document(&document_id).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_ne!(stored[0].id, stored[1].id);
    }

    #[tokio::test]
    async fn test_verify_field_with_fuzzy() {
        let (store, document_id) =
            store_with_page("Sam will identify the main idea in grade-level passages.").await;
        let verifier = CitationVerifier::new(
            Arc::new(store),
            QuoteVerifier::new(VerifyOptions::default().with_fuzzy(true)),
        );

        let field = FieldWithEvidence::new(
            "main idea".to_string(),
            vec![Evidence {
                page: 3,
                quote: "identify the main idea in grade level passage".to_string(),
                bbox: None,
                confidence: None,
            }],
        );

        let citations = verifier
            .verify_field(&document_id, "goals.1.description", &field)
            .await
            .unwrap();
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].field_path, "goals.1.description");
        assert_eq!(citations[0].verification_status, VerificationStatus::Verified);
        assert_eq!(citations[0].verification.match_type, MatchType::Fuzzy);
    }

    #[tokio::test]
    async fn test_empty_evidence() {
        let (store, document_id) = store_with_page("anything at all on this page").await;
        let verifier = CitationVerifier::new(Arc::new(store), QuoteVerifier::default());
        assert!(verifier.verify_evidence(&document_id, &[]).await.unwrap().is_empty());
    }
}

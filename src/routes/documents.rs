//! Document API routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::{Document, NewDocument};
use crate::error::{AppError, Result};
use crate::events::PipelineEvent;
use crate::evidence::{Citation, FieldEvidence, VerificationStatus};
use crate::state::AppState;

/// Create the documents router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_document))
        .route("/:id", get(get_document))
        .route("/:id/extract", post(start_extraction))
        .route("/:id/citations", get(list_citations))
        .route("/:id/citations/verify", post(verify_citations))
}

/// Document status as returned by the API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub id: String,
    pub user_id: String,
    pub file_name: String,
    pub status: String,
    pub page_count: Option<i64>,
    pub is_partial_extraction: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<serde_json::Value>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        Self {
            error_details: doc
                .error_details
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok()),
            id: doc.id,
            user_id: doc.user_id,
            file_name: doc.file_name,
            status: doc.status,
            page_count: doc.page_count,
            is_partial_extraction: doc.is_partial_extraction,
            error_message: doc.error_message,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractAccepted {
    pub document_id: String,
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCitationsRequest {
    pub evidence: Vec<FieldEvidence>,
}

#[derive(Debug, Default, Serialize)]
pub struct CitationCounts {
    pub verified: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Serialize)]
pub struct VerifyCitationsResponse {
    pub citations: Vec<Citation>,
    pub summary: CitationCounts,
}

async fn load_document(state: &AppState, id: &str) -> Result<Document> {
    state
        .store()
        .documents()
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document not found: {}", id)))
}

/// Register an uploaded document and queue its extraction
async fn create_document(
    State(state): State<AppState>,
    Json(data): Json<NewDocument>,
) -> Result<(StatusCode, Json<DocumentResponse>)> {
    if data.storage_path.trim().is_empty() {
        return Err(AppError::BadRequest("storagePath is required".to_string()));
    }

    let document = state.store().documents().create(&data).await?;
    tracing::info!(document_id = %document.id, file_name = %document.file_name, "Document registered");

    state.events().publish(PipelineEvent::DocumentUploaded {
        document_id: document.id.clone(),
        user_id: document.user_id.clone(),
    });

    Ok((StatusCode::CREATED, Json(document.into())))
}

/// Get a document's status, including partial extraction details
async fn get_document(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<DocumentResponse>> {
    let document = load_document(&state, &id).await?;
    Ok(Json(document.into()))
}

/// Start (or restart) extraction for a document
async fn start_extraction(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<ExtractRequest>>,
) -> Result<(StatusCode, Json<ExtractAccepted>)> {
    let document = load_document(&state, &id).await?;
    let user_id = body
        .and_then(|Json(req)| req.user_id)
        .unwrap_or_else(|| document.user_id.clone());

    state.runner().spawn(&document.id)?;
    tracing::info!(document_id = %document.id, user_id = %user_id, "Extraction queued");

    Ok((
        StatusCode::ACCEPTED,
        Json(ExtractAccepted {
            document_id: document.id,
            status: "accepted",
        }),
    ))
}

async fn list_citations(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Vec<Citation>>> {
    load_document(&state, &id).await?;
    let citations = state.store().citations().list_for_document(&id).await?;
    Ok(Json(citations))
}

/// Verify evidence quotes against the document's pages and store citations
async fn verify_citations(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<VerifyCitationsRequest>,
) -> Result<Json<VerifyCitationsResponse>> {
    load_document(&state, &id).await?;

    let citations = state.citations().verify_evidence(&id, &request.evidence).await?;

    let mut summary = CitationCounts::default();
    for citation in &citations {
        match citation.verification_status {
            VerificationStatus::Verified => summary.verified += 1,
            VerificationStatus::Failed => summary.failed += 1,
            VerificationStatus::Skipped => summary.skipped += 1,
        }
    }

    Ok(Json(VerifyCitationsResponse { citations, summary }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    use crate::ocr::{OcrError, ScriptedOcrProvider};
    use crate::routes::testing::TestApp;

    #[tokio::test]
    async fn test_get_document() {
        let app = TestApp::new(3, ScriptedOcrProvider::default()).await;

        let response = app.server.get(&format!("/api/v1/documents/{}", app.document_id)).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "uploaded");
        assert_eq!(body["isPartialExtraction"], false);

        let response = app.server.get("/api/v1/documents/missing").await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_extract_reports_partial_document() {
        let provider =
            ScriptedOcrProvider::default().fail_chunk(200, OcrError::Unavailable("503".into()));
        let app = TestApp::new(450, provider).await;

        let response = app
            .server
            .post(&format!("/api/v1/documents/{}/extract", app.document_id))
            .json(&json!({"userId": "user-1"}))
            .await;
        response.assert_status(StatusCode::ACCEPTED);

        app.wait_until_idle().await;

        let body: Value = app
            .server
            .get(&format!("/api/v1/documents/{}", app.document_id))
            .await
            .json();
        assert_eq!(body["status"], "extracted");
        assert_eq!(body["isPartialExtraction"], true);
        assert_eq!(body["pageCount"], 450);
        assert!(body["errorMessage"].as_str().unwrap().contains("pages 201-400"));
        assert_eq!(body["errorDetails"]["extractedPages"], 250);
    }

    #[tokio::test]
    async fn test_extract_conflict_while_running() {
        let app = TestApp::new(3, ScriptedOcrProvider::default()).await;
        let _running = app.state.runner().claim(&app.document_id).unwrap();

        let response = app
            .server
            .post(&format!("/api/v1/documents/{}/extract", app.document_id))
            .await;
        response.assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_create_document_queues_extraction() {
        let app = TestApp::new(3, ScriptedOcrProvider::default()).await;
        let mut rx = app.state.events().subscribe();

        let response = app
            .server
            .post("/api/v1/documents")
            .json(&json!({
                "userId": "user-2",
                "fileName": "iep-2025.pdf",
                "storagePath": "uploads/user-2/iep-2025.pdf"
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["status"], "uploaded");

        match rx.recv().await.unwrap() {
            crate::events::PipelineEvent::DocumentUploaded { document_id, user_id } => {
                assert_eq!(document_id, body["id"].as_str().unwrap());
                assert_eq!(user_id, "user-2");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_verify_citations() {
        let app = TestApp::new(3, ScriptedOcrProvider::default()).await;
        app.state.runner().run_with_retries(&app.document_id).await.unwrap();

        let response = app
            .server
            .post(&format!("/api/v1/documents/{}/citations/verify", app.document_id))
            .json(&json!({
                "evidence": [
                    {"fieldPath": "goals.0.baseline", "page": 2,
                     "quote": "reports progress toward annual reading goals"},
                    {"fieldPath": "goals.0.target", "page": 2,
                     "quote": "mastered all annual math goals"},
                    {"fieldPath": "services.0", "page": 40,
                     "quote": "speech therapy twice weekly"}
                ]
            }))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["summary"]["verified"], 1);
        assert_eq!(body["summary"]["failed"], 1);
        assert_eq!(body["summary"]["skipped"], 1);
        assert_eq!(body["citations"][0]["verification"]["matchType"], "exact");

        let stored: Value = app
            .server
            .get(&format!("/api/v1/documents/{}/citations", app.document_id))
            .await
            .json();
        assert_eq!(stored.as_array().unwrap().len(), 3);
    }
}

//! Stateless quote verification

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::verify::{verify_quote, VerificationResult, VerifyOptions};

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(verify))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub page_text: String,
    pub quote: String,
    /// Falls back to the server's configured options
    #[serde(default)]
    pub options: Option<VerifyOptions>,
}

/// Check a quote against caller-supplied page text
///
/// Callers may tune the options, but the fuzzy length caps never exceed the
/// server's configured ones.
async fn verify(State(state): State<AppState>, Json(request): Json<VerifyRequest>) -> Result<Json<VerificationResult>> {
    let limits = &state.config().verification;
    let options = match request.options {
        Some(options) => options.capped_by(limits),
        None => limits.clone(),
    };

    if !(0.0..=1.0).contains(&options.fuzzy_threshold) {
        return Err(AppError::BadRequest(
            "fuzzyThreshold must be between 0 and 1".to_string(),
        ));
    }

    let VerifyRequest { page_text, quote, .. } = request;
    let result = tokio::task::spawn_blocking(move || verify_quote(&page_text, &quote, &options))
        .await
        .map_err(|e| AppError::Internal(format!("verification task failed: {}", e)))?;

    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    use crate::ocr::ScriptedOcrProvider;
    use crate::routes::testing::TestApp;

    #[tokio::test]
    async fn test_verify_normalized_match() {
        let app = TestApp::new(1, ScriptedOcrProvider::default()).await;

        let response = app
            .server
            .post("/api/v1/verify")
            .json(&json!({
                "pageText": "Student\u{2019}s IEP \u{2014} review",
                "quote": "Student's IEP - review"
            }))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["verified"], true);
        assert_eq!(body["matchType"], "normalized");
        assert_eq!(body["confidence"], 0.95);
    }

    #[tokio::test]
    async fn test_verify_with_fuzzy_options() {
        let app = TestApp::new(1, ScriptedOcrProvider::default()).await;
        let page = "The student demonstrated significant progress in reading comprehension.";

        let body: Value = app
            .server
            .post("/api/v1/verify")
            .json(&json!({"pageText": page, "quote": "demonstrated signifcant progress in reading"}))
            .await
            .json();
        assert_eq!(body["matchType"], "none");

        let body: Value = app
            .server
            .post("/api/v1/verify")
            .json(&json!({
                "pageText": page,
                "quote": "demonstrated signifcant progress in reading",
                "options": {"allowFuzzy": true}
            }))
            .await
            .json();
        assert_eq!(body["matchType"], "fuzzy");
        assert!(body["confidence"].as_f64().unwrap() >= 0.85);
    }

    #[tokio::test]
    async fn test_verify_ignores_inflated_fuzzy_caps() {
        let app = TestApp::new(1, ScriptedOcrProvider::default()).await;
        let page = format!(
            "The student demonstrated significant progress in reading comprehension. {}",
            "Attendance was recorded daily. ".repeat(250)
        );
        assert!(page.chars().count() > app.state.config().verification.max_page_length_for_fuzzy);

        let body: Value = app
            .server
            .post("/api/v1/verify")
            .json(&json!({
                "pageText": page,
                "quote": "demonstrated signifcant progress in reading",
                "options": {
                    "allowFuzzy": true,
                    "maxPageLengthForFuzzy": 1_000_000_000u64,
                    "maxQuoteLengthForFuzzy": 1_000_000_000u64
                }
            }))
            .await
            .json();
        assert_eq!(body["verified"], false);
        assert_eq!(body["matchType"], "none");
    }

    #[tokio::test]
    async fn test_verify_rejects_bad_threshold() {
        let app = TestApp::new(1, ScriptedOcrProvider::default()).await;
        let response = app
            .server
            .post("/api/v1/verify")
            .json(&json!({
                "pageText": "text",
                "quote": "quote",
                "options": {"fuzzyThreshold": 1.5}
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}

//! Route modules for the IEP evidence server

pub mod documents;
pub mod health;
pub mod verify;

use axum::Router;

use crate::state::AppState;

/// All routes, before state and middleware are applied
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/health", health::router())
        .nest("/api/v1/health", health::router())
        .nest("/api/v1/documents", documents::router())
        .nest("/api/v1/verify", verify::router())
}


#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::testing::TestApp;
    use crate::ocr::ScriptedOcrProvider;

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::new(1, ScriptedOcrProvider::default()).await;

        let response = app.server.get("/health").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "iep-evidence-server");
    }
}

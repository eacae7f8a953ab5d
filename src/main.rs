//! IEP Evidence Server
//!
//! Extracts text from uploaded IEP documents and verifies the evidence quotes
//! attached to LLM-extracted fields.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use iep_evidence_server::config::Config;
use iep_evidence_server::db::{self, SqliteDocumentStore};
use iep_evidence_server::events::EventBus;
use iep_evidence_server::evidence::CitationVerifier;
use iep_evidence_server::extraction::{ExtractionPipeline, PipelineConfig};
use iep_evidence_server::ocr::{HttpOcrProvider, OcrService, OcrServiceConfig};
use iep_evidence_server::orchestrator::{ExtractionRunner, RunnerConfig};
use iep_evidence_server::routes;
use iep_evidence_server::state::AppState;
use iep_evidence_server::storage::S3Client;
use iep_evidence_server::verify::QuoteVerifier;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "iep_evidence_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    tracing::info!("Starting IEP Evidence Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("S3 endpoint: {}", config.storage.endpoint);
    tracing::info!("OCR endpoint: {}", config.ocr.endpoint);

    let s3_client = S3Client::new(&config.storage)
        .await
        .context("Failed to initialize S3 client")?;

    let db_pool = db::create_pool(&config.database.url)
        .await
        .context("Failed to initialize database")?;
    tracing::info!("Database initialized at {}", config.database.url);
    let store = SqliteDocumentStore::new(db_pool);

    let provider = HttpOcrProvider::new(
        &config.ocr.endpoint,
        config.ocr.api_key.clone(),
        Duration::from_secs(config.ocr.timeout_secs),
    )
    .context("Failed to initialize OCR client")?;
    let ocr = OcrService::new(OcrServiceConfig::from(&config.ocr), Arc::new(provider));

    let events = EventBus::default();
    let pipeline = ExtractionPipeline::new(
        Arc::new(store.clone()),
        Arc::new(s3_client),
        ocr,
        events.clone(),
        PipelineConfig::from_settings(&config.pipeline, &config.ocr),
    );

    let runner = ExtractionRunner::new(pipeline, events.clone(), RunnerConfig::from(&config.pipeline));
    let listener_task = runner.clone().listen();

    let citations = CitationVerifier::new(
        Arc::new(store.clone()),
        QuoteVerifier::new(config.verification.clone()),
    );
    let app_state = AppState::new(config.clone(), store, events, runner, citations);

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::router()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    tracing::info!("IEP Evidence Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    listener_task.abort();
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}

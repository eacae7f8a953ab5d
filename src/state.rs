//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::db::SqliteDocumentStore;
use crate::events::EventBus;
use crate::evidence::CitationVerifier;
use crate::orchestrator::ExtractionRunner;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    store: SqliteDocumentStore,
    events: EventBus,
    runner: ExtractionRunner,
    citations: CitationVerifier,
}

impl AppState {
    pub fn new(
        config: Config,
        store: SqliteDocumentStore,
        events: EventBus,
        runner: ExtractionRunner,
        citations: CitationVerifier,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                events,
                runner,
                citations,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the document store
    pub fn store(&self) -> &SqliteDocumentStore {
        &self.inner.store
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn runner(&self) -> &ExtractionRunner {
        &self.inner.runner
    }

    pub fn citations(&self) -> &CitationVerifier {
        &self.inner.citations
    }
}

//! Pipeline events
//!
//! Uploads enter the extraction flow as [`PipelineEvent::DocumentUploaded`];
//! the pipeline and runner report back on the same bus.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events exchanged between the upload surface, runner and pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    #[serde(rename_all = "camelCase")]
    DocumentUploaded { document_id: String, user_id: String },

    #[serde(rename_all = "camelCase")]
    DocumentExtracted {
        document_id: String,
        page_count: u32,
        is_partial: bool,
        extracted_pages: u32,
        expected_pages: u32,
    },

    #[serde(rename_all = "camelCase")]
    ExtractionFailed {
        document_id: String,
        attempts: u32,
        message: String,
    },
}

impl PipelineEvent {
    pub fn document_id(&self) -> &str {
        match self {
            Self::DocumentUploaded { document_id, .. }
            | Self::DocumentExtracted { document_id, .. }
            | Self::ExtractionFailed { document_id, .. } => document_id,
        }
    }
}

/// Broadcast bus for [`PipelineEvent`]s
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event, returning how many subscribers received it
    pub fn publish(&self, event: PipelineEvent) -> usize {
        // No subscribers is not an error
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_subscribe() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let event = PipelineEvent::DocumentUploaded {
            document_id: "doc-1".to_string(),
            user_id: "user-1".to_string(),
        };
        assert_eq!(bus.publish(event.clone()), 1);
        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new(4);
        let sent = bus.publish(PipelineEvent::ExtractionFailed {
            document_id: "doc-1".to_string(),
            attempts: 3,
            message: "gave up".to_string(),
        });
        assert_eq!(sent, 0);
    }

    #[test]
    fn test_event_serialization() {
        let event = PipelineEvent::DocumentExtracted {
            document_id: "doc-1".to_string(),
            page_count: 450,
            is_partial: true,
            extracted_pages: 250,
            expected_pages: 450,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "document_extracted");
        assert_eq!(json["documentId"], "doc-1");
        assert_eq!(json["isPartial"], true);
        assert_eq!(event.document_id(), "doc-1");
    }
}

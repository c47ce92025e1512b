use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Send rejected: {0}")]
    Rejected(String),
    #[error("Transport closed")]
    Closed,
}

/// One chat message as delivered by the transport. Immutable and consumed once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub id: String,
    pub conversation_id: String,
    pub author_id: String,
    pub is_self_or_other_bot: bool,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

/// Chat transport port.
///
/// `receive_events` is at-least-once and ordered per conversation; callers must
/// deduplicate. `Closed` ends the polling loop, any other error is retried.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn receive_events(&self) -> Result<Vec<InboundEvent>, TransportError>;
    async fn send(&self, conversation_id: &str, text: &str) -> Result<(), TransportError>;
    fn name(&self) -> &str;
}

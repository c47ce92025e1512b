use crate::traits::{ChatTransport, InboundEvent, TransportError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

/// Local transport: each stdin line is an event from a single fixed user.
pub struct TerminalTransport {
    conversation_id: String,
    author_id: String,
    next_id: AtomicU64,
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl TerminalTransport {
    pub fn new(conversation_id: impl Into<String>, author_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            author_id: author_id.into(),
            next_id: AtomicU64::new(1),
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }
}

#[async_trait]
impl ChatTransport for TerminalTransport {
    async fn receive_events(&self) -> Result<Vec<InboundEvent>, TransportError> {
        let mut lines = self.lines.lock().await;
        let line = lines
            .next_line()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?
            .ok_or(TransportError::Closed)?;

        let text = line.trim().to_string();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(vec![InboundEvent {
            id: format!("terminal-{}", id),
            conversation_id: self.conversation_id.clone(),
            author_id: self.author_id.clone(),
            is_self_or_other_bot: false,
            text,
            sent_at: chrono::Utc::now(),
        }])
    }

    async fn send(&self, _conversation_id: &str, text: &str) -> Result<(), TransportError> {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(format!("{}\n", text).as_bytes())
            .await
            .map_err(|e| TransportError::Rejected(e.to_string()))?;
        stdout
            .flush()
            .await
            .map_err(|e| TransportError::Rejected(e.to_string()))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "terminal"
    }
}

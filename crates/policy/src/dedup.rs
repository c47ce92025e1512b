use chrono::{DateTime, Utc};
use claw_bridge_interfaces::InboundEvent;
use serde::Deserialize;
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub capacity: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self { capacity: 1000 }
    }
}

/// Insertion-ordered set of processed event ids; the oldest id is evicted past capacity.
#[derive(Debug)]
pub struct DedupWindow {
    order: VecDeque<String>,
    seen: HashSet<String>,
    capacity: usize,
}

impl DedupWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity.min(4096)),
            seen: HashSet::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Returns false when the id was already present.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.seen.contains(id) {
            return false;
        }
        self.order.push_back(id.to_string());
        self.seen.insert(id.to_string());

        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Duplicate,
    OwnMessage,
    BotAuthor,
    Stale,
}

/// First stage of the pipeline: drops replays, our own echoes, other bots and backlog.
#[derive(Debug)]
pub struct LoopGuard {
    bot_id: String,
    started_at: DateTime<Utc>,
    window: DedupWindow,
}

impl LoopGuard {
    pub fn new(bot_id: impl Into<String>, started_at: DateTime<Utc>, config: &DedupConfig) -> Self {
        Self {
            bot_id: bot_id.into(),
            started_at,
            window: DedupWindow::new(config.capacity),
        }
    }

    pub fn admit(&mut self, event: &InboundEvent) -> bool {
        match self.check(event) {
            Ok(()) => true,
            Err(reason) => {
                tracing::debug!("Rejected event {}: {:?}", event.id, reason);
                false
            }
        }
    }

    /// Checks are side-effect free; the id is only recorded once the event is admitted.
    pub fn check(&mut self, event: &InboundEvent) -> Result<(), Rejection> {
        if self.window.contains(&event.id) {
            return Err(Rejection::Duplicate);
        }
        if event.author_id == self.bot_id {
            return Err(Rejection::OwnMessage);
        }
        if event.is_self_or_other_bot {
            return Err(Rejection::BotAuthor);
        }
        if event.sent_at < self.started_at {
            return Err(Rejection::Stale);
        }

        self.window.insert(&event.id);
        Ok(())
    }

    pub fn processed(&self) -> usize {
        self.window.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn event(id: &str, author: &str) -> InboundEvent {
        InboundEvent {
            id: id.to_string(),
            conversation_id: "chat-1".to_string(),
            author_id: author.to_string(),
            is_self_or_other_bot: false,
            text: "hi".to_string(),
            sent_at: Utc::now(),
        }
    }

    fn guard() -> LoopGuard {
        LoopGuard::new(
            "bot",
            Utc::now() - Duration::seconds(5),
            &DedupConfig::default(),
        )
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut guard = guard();
        let e = event("1", "alice");
        assert!(guard.admit(&e));
        assert!(!guard.admit(&e));
        assert_eq!(guard.check(&e), Err(Rejection::Duplicate));
    }

    #[test]
    fn test_own_and_bot_messages_rejected() {
        let mut guard = guard();
        assert_eq!(guard.check(&event("1", "bot")), Err(Rejection::OwnMessage));

        let mut other_bot = event("2", "helper-bot");
        other_bot.is_self_or_other_bot = true;
        assert_eq!(guard.check(&other_bot), Err(Rejection::BotAuthor));
        assert_eq!(guard.processed(), 0);
    }

    #[test]
    fn test_backlog_rejected() {
        let mut guard = guard();
        let mut old = event("1", "alice");
        old.sent_at = Utc::now() - Duration::minutes(10);
        assert_eq!(guard.check(&old), Err(Rejection::Stale));
    }

    #[test]
    fn test_rejection_has_no_side_effect() {
        let mut guard = guard();
        let mut old = event("1", "alice");
        old.sent_at = Utc::now() - Duration::minutes(10);
        assert!(!guard.admit(&old));
        // Same id arriving fresh is still admissible.
        assert!(guard.admit(&event("1", "alice")));
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut window = DedupWindow::new(3);
        for id in ["a", "b", "c", "d"] {
            assert!(window.insert(id));
        }
        assert_eq!(window.len(), 3);
        assert!(!window.contains("a"));
        assert!(window.contains("d"));
        assert!(!window.insert("d"));
    }
}

use serde::Deserialize;
use std::collections::hash_map::DefaultHasher;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpamConfig {
    pub history_cap: usize,
    /// Number of most recent outbound messages (all conversations) compared for similarity.
    pub similarity_window: usize,
    pub similarity_threshold: usize,
    /// Sends allowed per (conversation, prefix) within `repeat_window_secs`.
    pub repeat_limit: usize,
    pub repeat_window_secs: u64,
    pub cleanup_secs: u64,
    pub prefix_chars: usize,
}

impl Default for SpamConfig {
    fn default() -> Self {
        Self {
            history_cap: 20,
            similarity_window: 6,
            similarity_threshold: 2,
            repeat_limit: 2,
            repeat_window_secs: 30,
            cleanup_secs: 60,
            prefix_chars: 100,
        }
    }
}

#[derive(Debug, Clone)]
struct SentRecord {
    conversation_id: String,
    fingerprint: u64,
    at: Instant,
}

/// Outbound suppression of repeated replies.
///
/// Callers ask `should_suppress` right before sending and then `record` the text whatever
/// the answer was, so a loop keeps tripping the guard instead of resetting it.
#[derive(Debug)]
pub struct SpamGuard {
    config: SpamConfig,
    history: VecDeque<SentRecord>,
}

impl SpamGuard {
    pub fn new(config: SpamConfig) -> Self {
        Self {
            history: VecDeque::with_capacity(config.history_cap),
            config,
        }
    }

    pub fn should_suppress(&mut self, conversation_id: &str, text: &str) -> bool {
        self.should_suppress_at(conversation_id, text, Instant::now())
    }

    pub fn record(&mut self, conversation_id: &str, text: &str) {
        self.record_at(conversation_id, text, Instant::now())
    }

    pub fn should_suppress_at(&mut self, conversation_id: &str, text: &str, now: Instant) -> bool {
        self.evict(now);
        let fingerprint = self.fingerprint(text);

        let similar = self
            .history
            .iter()
            .rev()
            .take(self.config.similarity_window)
            .filter(|r| r.fingerprint == fingerprint)
            .count();
        if similar >= self.config.similarity_threshold {
            tracing::warn!(
                "Suppressing reply to {}: {} similar messages in last {}",
                conversation_id,
                similar,
                self.config.similarity_window
            );
            return true;
        }

        let repeat_window = Duration::from_secs(self.config.repeat_window_secs);
        let repeats = self
            .history
            .iter()
            .filter(|r| {
                r.conversation_id == conversation_id
                    && r.fingerprint == fingerprint
                    && now.saturating_duration_since(r.at) < repeat_window
            })
            .count();
        if repeats >= self.config.repeat_limit {
            tracing::warn!(
                "Suppressing reply to {}: sent {} times in {}s",
                conversation_id,
                repeats,
                self.config.repeat_window_secs
            );
            return true;
        }

        false
    }

    pub fn record_at(&mut self, conversation_id: &str, text: &str, now: Instant) {
        self.evict(now);
        self.history.push_back(SentRecord {
            conversation_id: conversation_id.to_string(),
            fingerprint: self.fingerprint(text),
            at: now,
        });
        while self.history.len() > self.config.history_cap {
            self.history.pop_front();
        }
    }

    fn evict(&mut self, now: Instant) {
        let cleanup = Duration::from_secs(self.config.cleanup_secs);
        self.history
            .retain(|r| now.saturating_duration_since(r.at) < cleanup);
    }

    fn fingerprint(&self, text: &str) -> u64 {
        let prefix: String = text
            .trim()
            .chars()
            .take(self.config.prefix_chars)
            .flat_map(char::to_lowercase)
            .collect();
        let mut hasher = DefaultHasher::new();
        prefix.hash(&mut hasher);
        hasher.finish()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send(guard: &mut SpamGuard, conv: &str, text: &str, at: Instant) -> bool {
        let suppressed = guard.should_suppress_at(conv, text, at);
        guard.record_at(conv, text, at);
        !suppressed
    }

    #[test]
    fn test_three_identical_sends_only_two_delivered() {
        let mut guard = SpamGuard::new(SpamConfig::default());
        let start = Instant::now();
        let delivered = (0..3)
            .filter(|i| send(&mut guard, "chat", "same reply", start + Duration::from_secs(*i * 5)))
            .count();
        assert_eq!(delivered, 2);
    }

    #[test]
    fn test_distinct_texts_pass() {
        let mut guard = SpamGuard::new(SpamConfig::default());
        let start = Instant::now();
        for i in 0..10 {
            assert!(send(&mut guard, "chat", &format!("reply {}", i), start));
        }
    }

    #[test]
    fn test_repeat_rule_expires() {
        let config = SpamConfig {
            similarity_threshold: 100,
            ..SpamConfig::default()
        };
        let mut guard = SpamGuard::new(config);
        let start = Instant::now();
        assert!(send(&mut guard, "chat", "ping", start));
        assert!(send(&mut guard, "chat", "ping", start + Duration::from_secs(1)));
        assert!(!send(&mut guard, "chat", "ping", start + Duration::from_secs(2)));
        assert!(send(&mut guard, "chat", "ping", start + Duration::from_secs(45)));
    }

    #[test]
    fn test_repeat_rule_is_per_conversation() {
        let config = SpamConfig {
            similarity_threshold: 100,
            ..SpamConfig::default()
        };
        let mut guard = SpamGuard::new(config);
        let now = Instant::now();
        assert!(send(&mut guard, "a", "hello", now));
        assert!(send(&mut guard, "a", "hello", now));
        assert!(send(&mut guard, "b", "hello", now));
        assert!(!send(&mut guard, "a", "hello", now));
    }

    #[test]
    fn test_similarity_uses_prefix() {
        let config = SpamConfig {
            prefix_chars: 9,
            ..SpamConfig::default()
        };
        let mut guard = SpamGuard::new(config);
        let now = Instant::now();
        assert!(send(&mut guard, "a", "❌ Error: first variant", now));
        assert!(send(&mut guard, "b", "❌ Error: second variant", now));
        assert!(!send(&mut guard, "c", "❌ Error: third variant", now));
    }

    #[test]
    fn test_history_is_capped_and_cleaned() {
        let mut guard = SpamGuard::new(SpamConfig::default());
        let start = Instant::now();
        for i in 0..50 {
            guard.record_at("chat", &format!("m{}", i), start);
        }
        assert_eq!(guard.len(), 20);
        guard.record_at("chat", "late", start + Duration::from_secs(120));
        assert_eq!(guard.len(), 1);
    }
}

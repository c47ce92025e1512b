use claw_bridge_interfaces::InboundEvent;
use serde::Deserialize;
use std::collections::HashSet;

pub const REFUSAL_MESSAGE: &str = "⛔ You are not authorized to use this bot.";

/// What happens to free-form text from someone outside the allow-list.
/// Explicit commands from unauthorized users are always refused.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnauthorizedChatPolicy {
    #[default]
    Ignore,
    Refuse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Allowed,
    Refuse(String),
    Ignore,
}

#[derive(Debug, Clone)]
pub struct AuthorizationGate {
    allowed: HashSet<String>,
    chat_policy: UnauthorizedChatPolicy,
}

impl AuthorizationGate {
    pub fn new<I, S>(allowed: I, chat_policy: UnauthorizedChatPolicy) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
            chat_policy,
        }
    }

    pub fn authorize(&self, event: &InboundEvent) -> bool {
        self.allowed.contains(&event.author_id)
    }

    pub fn decide(&self, event: &InboundEvent, is_command: bool) -> AuthDecision {
        if self.authorize(event) {
            return AuthDecision::Allowed;
        }

        tracing::warn!(
            "Unauthorized {} from {} in {}",
            if is_command { "command" } else { "message" },
            event.author_id,
            event.conversation_id
        );

        if is_command || self.chat_policy == UnauthorizedChatPolicy::Refuse {
            AuthDecision::Refuse(REFUSAL_MESSAGE.to_string())
        } else {
            AuthDecision::Ignore
        }
    }
}

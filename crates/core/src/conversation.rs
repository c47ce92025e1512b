use crate::types::PendingOp;
use std::collections::HashMap;

/// Per-conversation state. Lives only in memory and is mutated by the dispatcher alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationState {
    pub stopped: bool,
    pending: Option<PendingOp>,
    pub last_file: Option<String>,
    pub last_command: Option<String>,
    pub editing_enabled: bool,
}

impl ConversationState {
    pub fn new(editing_enabled: bool) -> Self {
        Self {
            stopped: false,
            pending: None,
            last_file: None,
            last_command: None,
            editing_enabled,
        }
    }

    pub fn pending(&self) -> Option<&PendingOp> {
        self.pending.as_ref()
    }

    /// Opens `op`, replacing whatever was pending before.
    pub fn set_pending(&mut self, op: PendingOp) {
        if let Some(previous) = self.pending.replace(op) {
            tracing::debug!("Replaced pending operation ({})", previous.describe());
        }
    }

    pub fn take_pending(&mut self) -> Option<PendingOp> {
        self.pending.take()
    }

    pub fn stop(&mut self) {
        self.stopped = true;
        self.pending = None;
    }

    pub fn start(&mut self) {
        self.stopped = false;
    }

    pub fn remember(&mut self, command: impl Into<String>, file: Option<String>) {
        self.last_command = Some(command.into());
        if file.is_some() {
            self.last_file = file;
        }
    }

    /// Short context line handed to the completion backend.
    pub fn context_summary(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(file) = &self.last_file {
            parts.push(format!("last file: {}", file));
        }
        if let Some(command) = &self.last_command {
            parts.push(format!("last command: {}", command));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("; "))
        }
    }
}

#[derive(Debug, Default)]
pub struct ConversationRegistry {
    states: HashMap<String, ConversationState>,
    editing_default: bool,
}

impl ConversationRegistry {
    pub fn new(editing_default: bool) -> Self {
        Self {
            states: HashMap::new(),
            editing_default,
        }
    }

    pub fn get(&self, conversation_id: &str) -> Option<&ConversationState> {
        self.states.get(conversation_id)
    }

    pub fn entry(&mut self, conversation_id: &str) -> &mut ConversationState {
        let editing_default = self.editing_default;
        self.states
            .entry(conversation_id.to_string())
            .or_insert_with(|| ConversationState::new(editing_default))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

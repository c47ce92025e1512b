use crate::error::BridgeError;
use crate::router::DEFAULT_PREFIX;
use claw_bridge_executor::{ExecConfig, SyncConfig};
use claw_bridge_policy::{DedupConfig, SpamConfig, UnauthorizedChatPolicy};
use claw_bridge_tools::DEFAULT_READ_LIMIT;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    pub root: PathBuf,
    /// Initial `:dangerzone` state of new conversations.
    pub editing_enabled: bool,
    pub read_truncate_chars: usize,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./workspace"),
            editing_enabled: false,
            read_truncate_chars: DEFAULT_READ_LIMIT,
        }
    }
}

/// Everything the dispatcher needs, independent of transport and backend choice.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub bot_id: String,
    pub authorized_users: Vec<String>,
    pub unauthorized_chat: UnauthorizedChatPolicy,
    pub command_prefix: String,
    pub system_prompt: Option<String>,
    pub poll_backoff_secs: u64,
    pub workspace: WorkspaceConfig,
    pub exec: ExecConfig,
    pub dedup: DedupConfig,
    pub spam: SpamConfig,
    pub sync: SyncConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bot_id: "claw-bridge".to_string(),
            authorized_users: Vec::new(),
            unauthorized_chat: UnauthorizedChatPolicy::default(),
            command_prefix: DEFAULT_PREFIX.to_string(),
            system_prompt: None,
            poll_backoff_secs: 5,
            workspace: WorkspaceConfig::default(),
            exec: ExecConfig::default(),
            dedup: DedupConfig::default(),
            spam: SpamConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.bot_id.trim().is_empty() {
            return Err(BridgeError::Config("bot_id must not be empty".into()));
        }
        if self.authorized_users.is_empty() {
            return Err(BridgeError::Config(
                "authorized_users must list at least one user".into(),
            ));
        }
        if self.command_prefix.is_empty() || self.command_prefix.contains(char::is_whitespace) {
            return Err(BridgeError::Config(
                "command_prefix must be a single non-empty word".into(),
            ));
        }
        if self.workspace.read_truncate_chars == 0 {
            return Err(BridgeError::Config(
                "workspace.read_truncate_chars must be positive".into(),
            ));
        }
        if self.dedup.capacity == 0 {
            return Err(BridgeError::Config("dedup.capacity must be positive".into()));
        }
        if self.spam.history_cap == 0 || self.spam.prefix_chars == 0 {
            return Err(BridgeError::Config(
                "spam.history_cap and spam.prefix_chars must be positive".into(),
            ));
        }
        if self.exec.timeout_secs == 0 || self.sync.timeout_secs == 0 {
            return Err(BridgeError::Config("timeouts must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> BridgeConfig {
        BridgeConfig {
            authorized_users: vec!["alice".into()],
            ..BridgeConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.command_prefix, ":h");
        assert_eq!(config.unauthorized_chat, UnauthorizedChatPolicy::Ignore);
        assert!(!config.workspace.editing_enabled);
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validation_failures() {
        assert!(BridgeConfig::default().validate().is_err());

        let mut config = valid();
        config.command_prefix = ":h x".into();
        assert!(config.validate().is_err());

        let mut config = valid();
        config.dedup.capacity = 0;
        assert!(config.validate().is_err());
    }
}

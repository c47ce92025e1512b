use claw_bridge_executor::{ExecutorError, SyncError};
use claw_bridge_interfaces::TransportError;
use claw_bridge_providers::CompletionError;
use claw_bridge_tools::WorkspaceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Exec error: {0}")]
    Exec(#[from] ExecutorError),

    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub mod commands;
pub mod config;
pub mod conversation;
pub mod directives;
pub mod dispatcher;
pub mod error;
pub mod format;
pub mod prompt;
pub mod router;
pub mod types;

pub use commands::{CommandHandler, EDITING_DISABLED};
pub use config::{BridgeConfig, WorkspaceConfig};
pub use conversation::{ConversationRegistry, ConversationState};
pub use directives::{extract, DirectiveRunner, DirectiveSpan, EditInstruction, ExtractionError};
pub use dispatcher::{Dispatcher, DEGRADED_REPLY};
pub use error::BridgeError;
pub use router::{parse_command, Route, Router, DEFAULT_PREFIX};
pub use types::*;

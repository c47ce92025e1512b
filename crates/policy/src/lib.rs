pub mod auth;
pub mod dedup;
pub mod spam;

pub use auth::{AuthDecision, AuthorizationGate, UnauthorizedChatPolicy};
pub use dedup::{DedupConfig, DedupWindow, LoopGuard, Rejection};
pub use spam::{SpamConfig, SpamGuard};

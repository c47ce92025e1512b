pub mod denylist;
pub mod path_guard;

pub use denylist::is_sensitive_name;
pub use path_guard::{SandboxedPath, WorkspaceGuard};

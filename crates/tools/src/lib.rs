pub mod error;
pub mod sandbox;
pub mod workspace;

pub use error::WorkspaceError;
pub use sandbox::{is_sensitive_name, SandboxedPath, WorkspaceGuard};
pub use workspace::{
    truncate_for_display, DirEntry, EntryKind, FileContent, Workspace, WorkspaceStats,
    DEFAULT_READ_LIMIT,
};

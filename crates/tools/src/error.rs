use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Sandbox violation: {0}")]
    SandboxViolation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0} is not a directory")]
    NotADirectory(String),

    #[error("{0} is a directory")]
    IsADirectory(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Line {line} is out of range (file has {line_count} lines)")]
    LineOutOfBounds { line: usize, line_count: usize },

    #[error("Pattern not found in {0}")]
    PatternNotFound(String),

    #[error("Not a text file: {0}")]
    InvalidUtf8(String),

    #[error("File too large: {0}")]
    TooLarge(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkspaceError {
    pub fn is_violation(&self) -> bool {
        matches!(self, WorkspaceError::SandboxViolation(_))
    }
}

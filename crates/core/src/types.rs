use claw_bridge_tools::SandboxedPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncSubcommand {
    Status,
    Test,
    Push,
}

/// An explicit workspace command parsed from `<prefix> ...` text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List(Option<String>),
    Read(String),
    Write(String, String),
    Append(String, String),
    Edit(String, usize, String),
    /// `write` without content (and possibly without a path): opens a pending write.
    BeginWrite(Option<String>),
    /// `edit <file>` alone: opens a pending whole-file edit.
    BeginEdit(String),
    Sync(Option<SyncSubcommand>),
    Exec(String),
    Status,
    Help,
    /// Recognized subcommand with missing or malformed arguments.
    Usage(&'static str),
    Unknown(String),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::List(_) => "ls",
            Command::Read(_) => "cat",
            Command::Write(..) | Command::BeginWrite(_) => "write",
            Command::Append(..) => "append",
            Command::Edit(..) | Command::BeginEdit(_) => "edit",
            Command::Sync(_) => "sync",
            Command::Exec(_) => "exec",
            Command::Status => "status",
            Command::Help => "help",
            Command::Usage(_) => "usage",
            Command::Unknown(_) => "unknown",
        }
    }

    /// Commands that change the workspace and therefore need `:dangerzone`.
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            Command::Write(..)
                | Command::Append(..)
                | Command::Edit(..)
                | Command::BeginWrite(_)
                | Command::BeginEdit(_)
                | Command::Exec(_)
                | Command::Sync(None)
                | Command::Sync(Some(SyncSubcommand::Push))
        )
    }
}

/// A machine-actionable instruction embedded in model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `path` is `None` for the workspace root.
    ListFiles { path: Option<String> },
    ReadFile { path: String },
    WriteFile { path: String, content: String },
    EditFile { path: String, instructions: String },
    AppendFile { path: String, content: String },
}

impl Directive {
    pub fn marker(&self) -> &'static str {
        match self {
            Directive::ListFiles { .. } => "LIST_FILES",
            Directive::ReadFile { .. } => "READ_FILE",
            Directive::WriteFile { .. } => "WRITE_FILE",
            Directive::EditFile { .. } => "EDIT_FILE",
            Directive::AppendFile { .. } => "APPEND_FILE",
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            Directive::ListFiles { path } => path.as_deref(),
            Directive::ReadFile { path }
            | Directive::WriteFile { path, .. }
            | Directive::EditFile { path, .. }
            | Directive::AppendFile { path, .. } => Some(path),
        }
    }

    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            Directive::WriteFile { .. } | Directive::EditFile { .. } | Directive::AppendFile { .. }
        )
    }
}

/// The single outstanding multi-turn action of a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingOp {
    EditingFile(SandboxedPath),
    WritingFile {
        path: Option<SandboxedPath>,
        suggested: Vec<String>,
    },
}

impl PendingOp {
    pub fn describe(&self) -> String {
        match self {
            PendingOp::EditingFile(path) => format!("editing {}", path),
            PendingOp::WritingFile { path: Some(path), .. } => format!("writing {}", path),
            PendingOp::WritingFile { path: None, .. } => "writing a new file".to_string(),
        }
    }
}

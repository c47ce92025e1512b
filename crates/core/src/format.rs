//! Chat-facing rendering shared by explicit commands and directives.

use claw_bridge_tools::{DirEntry, EntryKind, FileContent, SandboxedPath, WorkspaceError};

pub fn listing(dir: &SandboxedPath, entries: &[DirEntry]) -> String {
    if entries.is_empty() {
        return format!("📂 {} is empty", dir);
    }
    let mut out = format!("📂 {}:", dir);
    for entry in entries {
        match entry.kind {
            EntryKind::Directory => out.push_str(&format!("\n📁 {}/", entry.name)),
            EntryKind::File => out.push_str(&format!("\n📄 {}", entry.name)),
        }
    }
    out
}

pub fn file_content(content: &FileContent) -> String {
    format!("📄 {}\n```\n{}\n```", content.path, content.text)
}

/// Inline message for an expected workspace failure.
pub fn workspace_error(err: &WorkspaceError) -> String {
    match err {
        WorkspaceError::SandboxViolation(msg) => format!("🚫 Access denied: {}", msg),
        WorkspaceError::NotFound(path) => format!("❌ Not found: {}", path),
        WorkspaceError::PermissionDenied(path) => format!("🚫 Permission denied: {}", path),
        WorkspaceError::LineOutOfBounds { line, line_count: 0 } => {
            format!("❌ Line {} is out of bounds: the file is empty", line)
        }
        WorkspaceError::LineOutOfBounds { line, line_count } => format!(
            "❌ Line {} is out of bounds: valid lines are 1 to {}",
            line, line_count
        ),
        other => format!("❌ {}", other),
    }
}

pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

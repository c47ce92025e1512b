use crate::error::WorkspaceError;
use crate::sandbox::{is_sensitive_name, SandboxedPath, WorkspaceGuard};
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use walkdir::WalkDir;

pub const DEFAULT_READ_LIMIT: usize = 3500;
const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB
const MAX_ENTRIES: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntryKind {
    Directory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
}

/// File content prepared for display in a chat message.
#[derive(Debug, Clone)]
pub struct FileContent {
    pub path: String,
    pub text: String,
    pub total_chars: usize,
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkspaceStats {
    pub file_count: usize,
    pub total_bytes: u64,
}

/// Cuts `text` to at most `limit` characters and appends an explicit marker when it did.
pub fn truncate_for_display(text: &str, limit: usize) -> (String, bool) {
    let total = text.chars().count();
    if total <= limit {
        return (text.to_string(), false);
    }
    let cut = text
        .char_indices()
        .nth(limit)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    let shown = format!(
        "{}\n… [truncated: showing {} of {} characters]",
        &text[..cut],
        limit,
        total
    );
    (shown, true)
}

/// File operations over the sandboxed workspace. Every method takes a [`SandboxedPath`].
#[derive(Debug, Clone)]
pub struct Workspace {
    guard: WorkspaceGuard,
    read_limit: usize,
}

impl Workspace {
    pub fn new(guard: WorkspaceGuard, read_limit: usize) -> Self {
        Self { guard, read_limit }
    }

    pub fn open(root: impl AsRef<Path>) -> Result<Self, WorkspaceError> {
        Ok(Self::new(WorkspaceGuard::new(root)?, DEFAULT_READ_LIMIT))
    }

    pub fn guard(&self) -> &WorkspaceGuard {
        &self.guard
    }

    pub fn resolve(&self, raw: &str) -> Result<SandboxedPath, WorkspaceError> {
        self.guard.resolve(raw)
    }

    pub fn read_limit(&self) -> usize {
        self.read_limit
    }

    pub async fn list(&self, dir: &SandboxedPath) -> Result<Vec<DirEntry>, WorkspaceError> {
        let metadata = fs::metadata(dir.as_path())
            .await
            .map_err(|e| map_io(dir, e))?;
        if !metadata.is_dir() {
            return Err(WorkspaceError::NotADirectory(dir.to_string()));
        }

        let mut reader = fs::read_dir(dir.as_path())
            .await
            .map_err(|e| map_io(dir, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await.map_err(|e| map_io(dir, e))? {
            if entries.len() >= MAX_ENTRIES {
                break;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            if is_sensitive_name(&name) {
                continue;
            }

            let metadata = entry.metadata().await.map_err(|e| map_io(dir, e))?;
            let kind = if metadata.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            entries.push(DirEntry {
                name,
                kind,
                size: if metadata.is_dir() { 0 } else { metadata.len() },
            });
        }

        entries.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.name.cmp(&b.name)));
        Ok(entries)
    }

    pub async fn read_full(&self, file: &SandboxedPath) -> Result<String, WorkspaceError> {
        let metadata = fs::metadata(file.as_path())
            .await
            .map_err(|e| map_io(file, e))?;
        if metadata.is_dir() {
            return Err(WorkspaceError::IsADirectory(file.to_string()));
        }
        if metadata.len() > MAX_FILE_SIZE {
            return Err(WorkspaceError::TooLarge(file.to_string()));
        }

        let bytes = fs::read(file.as_path()).await.map_err(|e| map_io(file, e))?;
        String::from_utf8(bytes).map_err(|_| WorkspaceError::InvalidUtf8(file.to_string()))
    }

    pub async fn read(&self, file: &SandboxedPath) -> Result<FileContent, WorkspaceError> {
        let content = self.read_full(file).await?;
        let total_chars = content.chars().count();
        let (text, truncated) = truncate_for_display(&content, self.read_limit);
        Ok(FileContent {
            path: file.to_string(),
            text,
            total_chars,
            truncated,
        })
    }

    /// Replaces the file atomically. Returns the number of bytes written.
    pub async fn write(&self, file: &SandboxedPath, content: &str) -> Result<usize, WorkspaceError> {
        if file.is_root() || file.as_path().is_dir() {
            return Err(WorkspaceError::IsADirectory(file.to_string()));
        }

        self.prepare_parent(file).await?;

        let file_name = file
            .as_path()
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let temp_path = file.as_path().with_file_name(format!(".{}.tmp", file_name));

        // A stray directory at the temp path is not a user mistake and stays `Io`.
        let mut handle = fs::File::create(&temp_path).await?;
        handle.write_all(content.as_bytes()).await?;
        handle.sync_all().await?;
        drop(handle);

        fs::rename(&temp_path, file.as_path())
            .await
            .map_err(|e| map_io(file, e))?;

        tracing::debug!("Wrote {} bytes to {}", content.len(), file);
        Ok(content.len())
    }

    /// Appends `content` as a new line, creating the file when missing.
    pub async fn append(&self, file: &SandboxedPath, content: &str) -> Result<usize, WorkspaceError> {
        if file.is_root() || file.as_path().is_dir() {
            return Err(WorkspaceError::IsADirectory(file.to_string()));
        }

        let existing = match fs::read(file.as_path()).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(map_io(file, e)),
        };

        let mut chunk = String::new();
        if !existing.is_empty() && !existing.ends_with(b"\n") {
            chunk.push('\n');
        }
        chunk.push_str(content);
        if !content.ends_with('\n') {
            chunk.push('\n');
        }

        self.prepare_parent(file).await?;

        let mut handle = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(file.as_path())
            .await
            .map_err(|e| map_io(file, e))?;
        handle.write_all(chunk.as_bytes()).await?;
        handle.flush().await?;

        tracing::debug!("Appended {} bytes to {}", chunk.len(), file);
        Ok(chunk.len())
    }

    /// Replaces the 1-indexed `line`. The file is left untouched when `line` is out of range.
    pub async fn replace_line(
        &self,
        file: &SandboxedPath,
        line: usize,
        content: &str,
    ) -> Result<usize, WorkspaceError> {
        let original = self.read_full(file).await?;
        let mut lines: Vec<&str> = original.lines().collect();
        let line_count = lines.len();

        if line == 0 || line > line_count {
            return Err(WorkspaceError::LineOutOfBounds { line, line_count });
        }

        lines[line - 1] = content;
        let mut updated = lines.join("\n");
        if original.ends_with('\n') {
            updated.push('\n');
        }

        self.write(file, &updated).await?;
        Ok(line_count)
    }

    /// Replaces the first occurrence of `find`.
    pub async fn replace_text(
        &self,
        file: &SandboxedPath,
        find: &str,
        replace: &str,
    ) -> Result<(), WorkspaceError> {
        let original = self.read_full(file).await?;
        if find.is_empty() || !original.contains(find) {
            return Err(WorkspaceError::PatternNotFound(file.to_string()));
        }
        let updated = original.replacen(find, replace, 1);
        self.write(file, &updated).await?;
        Ok(())
    }

    /// Creates missing parent directories. Fails with `NotADirectory` when an existing
    /// ancestor is a file.
    async fn prepare_parent(&self, file: &SandboxedPath) -> Result<(), WorkspaceError> {
        let Some(parent) = file.as_path().parent() else {
            return Ok(());
        };

        for ancestor in parent.ancestors() {
            match fs::metadata(ancestor).await {
                Ok(metadata) if metadata.is_dir() => break,
                Ok(_) => {
                    let shown = ancestor
                        .strip_prefix(self.guard.root())
                        .unwrap_or(ancestor)
                        .display()
                        .to_string();
                    return Err(WorkspaceError::NotADirectory(shown));
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(map_io(file, e)),
            }
        }

        fs::create_dir_all(parent)
            .await
            .map_err(|e| map_io(file, e))
    }

    /// Counts regular files below the root, skipping sensitive names.
    pub fn stats(&self) -> WorkspaceStats {
        let mut stats = WorkspaceStats::default();
        let walker = WalkDir::new(self.guard.root())
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_sensitive_name(&e.file_name().to_string_lossy()));

        for entry in walker.filter_map(Result::ok) {
            if entry.file_type().is_file() {
                stats.file_count += 1;
                stats.total_bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
            }
        }
        stats
    }
}

fn map_io(path: &SandboxedPath, e: std::io::Error) -> WorkspaceError {
    match e.kind() {
        std::io::ErrorKind::NotFound => WorkspaceError::NotFound(path.to_string()),
        std::io::ErrorKind::PermissionDenied => WorkspaceError::PermissionDenied(path.to_string()),
        std::io::ErrorKind::AlreadyExists => WorkspaceError::AlreadyExists(path.to_string()),
        _ => WorkspaceError::Io(e),
    }
}

use crate::error::WorkspaceError;
use crate::sandbox::denylist;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// A path inside the workspace root that passed the denylist.
///
/// Only [`WorkspaceGuard::resolve`] can build one, so every file operation taking a
/// `SandboxedPath` is contained by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxedPath {
    absolute: PathBuf,
    relative: PathBuf,
}

impl SandboxedPath {
    pub fn as_path(&self) -> &Path {
        &self.absolute
    }

    pub fn relative(&self) -> &Path {
        &self.relative
    }

    pub fn is_root(&self) -> bool {
        self.relative.as_os_str().is_empty()
    }
}

impl fmt::Display for SandboxedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, ".")
        } else {
            write!(f, "{}", self.relative.display())
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkspaceGuard {
    root: PathBuf,
}

impl WorkspaceGuard {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, WorkspaceError> {
        let root = fs::canonicalize(root)
            .map_err(|e| WorkspaceError::SandboxViolation(format!("Invalid workspace root: {}", e)))?;
        if !root.is_dir() {
            return Err(WorkspaceError::SandboxViolation(
                "Workspace root is not a directory".into(),
            ));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn root_path(&self) -> SandboxedPath {
        SandboxedPath {
            absolute: self.root.clone(),
            relative: PathBuf::new(),
        }
    }

    pub fn resolve(&self, raw: &str) -> Result<SandboxedPath, WorkspaceError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(WorkspaceError::SandboxViolation("Empty path".into()));
        }
        if raw.contains('\0') {
            return Err(WorkspaceError::SandboxViolation("NUL byte in path".into()));
        }

        let candidate = Path::new(raw);
        let relative_input = if candidate.is_absolute() {
            candidate
                .strip_prefix(&self.root)
                .map_err(|_| {
                    WorkspaceError::SandboxViolation("Absolute path outside workspace".into())
                })?
                .to_path_buf()
        } else {
            candidate.to_path_buf()
        };

        let relative = normalize(&relative_input)?;

        for component in relative.components() {
            denylist::check_component(&component.as_os_str().to_string_lossy())?;
        }

        let absolute = self.root.join(&relative);
        self.check_symlinks(&relative)?;

        Ok(SandboxedPath { absolute, relative })
    }

    /// Like [`resolve`](Self::resolve), but a missing or blank argument means the root.
    pub fn resolve_or_root(&self, raw: Option<&str>) -> Result<SandboxedPath, WorkspaceError> {
        match raw.map(str::trim) {
            None | Some("") | Some(".") | Some("./") => Ok(self.root_path()),
            Some(path) => self.resolve(path),
        }
    }

    // Every existing prefix must canonicalize inside the root, otherwise a symlink escapes.
    fn check_symlinks(&self, relative: &Path) -> Result<(), WorkspaceError> {
        let mut current = self.root.clone();
        for component in relative.components() {
            current.push(component);
            if fs::symlink_metadata(&current).is_err() {
                break;
            }
            let canonical = fs::canonicalize(&current).map_err(|_| {
                WorkspaceError::SandboxViolation("Path is inaccessible".into())
            })?;
            if !canonical.starts_with(&self.root) {
                return Err(WorkspaceError::SandboxViolation(
                    "Symlink escapes workspace".into(),
                ));
            }
        }
        Ok(())
    }
}

fn normalize(path: &Path) -> Result<PathBuf, WorkspaceError> {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(WorkspaceError::SandboxViolation(
                        "Path escapes workspace".into(),
                    ));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(WorkspaceError::SandboxViolation(
                    "Absolute paths not allowed".into(),
                ));
            }
        }
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> (tempfile::TempDir, WorkspaceGuard) {
        let dir = tempfile::tempdir().unwrap();
        let guard = WorkspaceGuard::new(dir.path()).unwrap();
        (dir, guard)
    }

    #[test]
    fn test_traversal_rejected() {
        let (_dir, guard) = guard();
        assert!(guard.resolve("../../etc/passwd").unwrap_err().is_violation());
        assert!(guard.resolve("src/../../outside").unwrap_err().is_violation());
    }

    #[test]
    fn test_absolute_outside_rejected() {
        let (_dir, guard) = guard();
        assert!(guard.resolve("/etc/passwd").unwrap_err().is_violation());
    }

    #[test]
    fn test_absolute_inside_accepted() {
        let (_dir, guard) = guard();
        let inside = guard.root().join("notes.txt");
        let resolved = guard.resolve(&inside.to_string_lossy()).unwrap();
        assert_eq!(resolved.relative(), Path::new("notes.txt"));
    }

    #[test]
    fn test_env_rejected() {
        let (_dir, guard) = guard();
        assert!(guard.resolve(".env").unwrap_err().is_violation());
        assert!(guard.resolve("config/.env.local").unwrap_err().is_violation());
        assert!(guard.resolve(".git/config").unwrap_err().is_violation());
    }

    #[test]
    fn test_inner_dotdot_normalized() {
        let (_dir, guard) = guard();
        let resolved = guard.resolve("src/../README.md").unwrap();
        assert_eq!(resolved.relative(), Path::new("README.md"));
        assert_eq!(resolved.to_string(), "README.md");
    }

    #[test]
    fn test_nonexistent_target_allowed() {
        let (_dir, guard) = guard();
        let resolved = guard.resolve("new/dir/file.txt").unwrap();
        assert!(resolved.as_path().starts_with(guard.root()));
    }

    #[test]
    fn test_root_forms() {
        let (_dir, guard) = guard();
        assert!(guard.resolve_or_root(None).unwrap().is_root());
        assert!(guard.resolve_or_root(Some(".")).unwrap().is_root());
        assert!(guard.resolve(".").unwrap().is_root());
        assert!(guard.resolve("").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_rejected() {
        let (dir, guard) = guard();
        let outside = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();
        assert!(guard.resolve("link/file.txt").unwrap_err().is_violation());
    }
}

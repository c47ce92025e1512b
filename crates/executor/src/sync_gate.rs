//! Health gate in front of the host/sandbox file-sync daemon.
//!
//! Pulling from the host or pushing to it overwrites one side with the other, so both
//! directions are refused unless the workspace looks intact: every critical file present,
//! enough files overall, and a writable volume.
//!
//! [`SyncHealthGate::check`] never touches the workspace. Only a pull or push goes on to prove
//! the volume is writable by creating and removing a probe file.

use crate::command_executor::{run_process, ExecOutput, ExecutorError, ProcessSpec};
use claw_bridge_tools::Workspace;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tokio::time::Duration;

const PROBE_PREFIX: &str = ".claw-bridge-probe";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub critical_files: Vec<String>,
    pub min_file_count: usize,
    /// Sync daemon executable; `None` leaves only the diagnostics available.
    pub program: Option<String>,
    pub pull_args: Vec<String>,
    pub push_args: Vec<String>,
    pub probe_args: Vec<String>,
    pub timeout_secs: u64,
    pub output_cap_chars: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            critical_files: vec!["package.json".to_string()],
            min_file_count: 5,
            program: None,
            pull_args: Vec::new(),
            push_args: Vec::new(),
            probe_args: vec!["--version".to_string()],
            timeout_secs: 120,
            output_cap_chars: 1500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncHealth {
    pub healthy: bool,
    pub file_count: usize,
    pub min_file_count: usize,
    pub missing_critical: Vec<String>,
    pub volume_mount_working: bool,
    pub warnings: Vec<String>,
}

impl SyncHealth {
    pub fn report(&self) -> String {
        let mut out = String::new();
        out.push_str(if self.healthy {
            "✅ Workspace healthy"
        } else {
            "❌ Workspace unhealthy"
        });
        out.push_str(&format!(
            "\n📁 Files: {} (minimum {})",
            self.file_count, self.min_file_count
        ));
        out.push_str(&format!(
            "\n💾 Volume mount: {}",
            if self.volume_mount_working { "working" } else { "NOT working" }
        ));
        if !self.missing_critical.is_empty() {
            out.push_str(&format!(
                "\n🚫 Missing critical files: {}",
                self.missing_critical.join(", ")
            ));
        }
        for warning in &self.warnings {
            out.push_str(&format!("\n⚠️ {}", warning));
        }
        out
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{0}")]
    Unhealthy(SyncHealth),
    #[error("No sync daemon configured")]
    NotConfigured,
    #[error("Sync daemon error: {0}")]
    Daemon(#[from] ExecutorError),
}

impl fmt::Display for SyncHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.missing_critical.is_empty() {
            write!(
                f,
                "Workspace unhealthy: {} files (minimum {})",
                self.file_count, self.min_file_count
            )
        } else {
            write!(
                f,
                "Workspace unhealthy: missing {}",
                self.missing_critical.join(", ")
            )
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    Pull,
    Push,
}

pub struct SyncHealthGate {
    workspace: Workspace,
    config: SyncConfig,
}

impl SyncHealthGate {
    pub fn new(workspace: Workspace, config: SyncConfig) -> Self {
        Self { workspace, config }
    }

    /// Computes a fresh health snapshot from metadata only; nothing is cached between calls.
    pub fn check(&self) -> SyncHealth {
        self.check_with(false)
    }

    fn check_with(&self, write_probe: bool) -> SyncHealth {
        let root = self.workspace.guard().root();
        let file_count = self.workspace.stats().file_count;

        let missing_critical: Vec<String> = self
            .config
            .critical_files
            .iter()
            .filter(|name| !root.join(name.as_str()).exists())
            .cloned()
            .collect();

        let volume_mount_working = std::fs::metadata(root)
            .map(|m| m.is_dir() && !m.permissions().readonly())
            .unwrap_or(false)
            && (!write_probe || probe_writable(root));

        let mut warnings = Vec::new();
        if file_count < self.config.min_file_count {
            warnings.push(format!(
                "Only {} files present, expected at least {}",
                file_count, self.config.min_file_count
            ));
        }
        if !volume_mount_working {
            warnings.push("Workspace volume is not writable".to_string());
        }
        if self.config.program.is_none() {
            warnings.push("No sync daemon configured".to_string());
        }

        let healthy = missing_critical.is_empty()
            && file_count >= self.config.min_file_count
            && volume_mount_working;

        SyncHealth {
            healthy,
            file_count,
            min_file_count: self.config.min_file_count,
            missing_critical,
            volume_mount_working,
            warnings,
        }
    }

    pub fn can_pull_from_host(&self) -> Result<SyncHealth, SyncError> {
        self.require_healthy()
    }

    pub fn can_push_to_host(&self) -> Result<SyncHealth, SyncError> {
        self.require_healthy()
    }

    fn require_healthy(&self) -> Result<SyncHealth, SyncError> {
        let health = self.check_with(true);
        if health.healthy {
            Ok(health)
        } else {
            tracing::warn!("Sync refused: {}", health);
            Err(SyncError::Unhealthy(health))
        }
    }

    pub async fn pull(&self) -> Result<ExecOutput, SyncError> {
        self.can_pull_from_host()?;
        self.run_daemon(SyncDirection::Pull).await
    }

    pub async fn push(&self) -> Result<ExecOutput, SyncError> {
        self.can_push_to_host()?;
        self.run_daemon(SyncDirection::Push).await
    }

    /// Read-only check that the daemon can be invoked at all.
    pub async fn probe(&self) -> Result<ExecOutput, SyncError> {
        let args = self.config.probe_args.clone();
        self.invoke(args).await
    }

    async fn run_daemon(&self, direction: SyncDirection) -> Result<ExecOutput, SyncError> {
        let args = match direction {
            SyncDirection::Pull => self.config.pull_args.clone(),
            SyncDirection::Push => self.config.push_args.clone(),
        };
        tracing::info!("Running sync {:?}", direction);
        self.invoke(args).await
    }

    async fn invoke(&self, args: Vec<String>) -> Result<ExecOutput, SyncError> {
        let program = self.config.program.clone().ok_or(SyncError::NotConfigured)?;
        let spec = ProcessSpec {
            program,
            args,
            cwd: self.workspace.guard().root().to_path_buf(),
            timeout: Duration::from_secs(self.config.timeout_secs),
            output_cap: self.config.output_cap_chars,
            clear_env: false,
        };
        Ok(run_process(&spec).await?)
    }
}

/// Creates and removes a probe file. An existing file of the same name is never touched.
fn probe_writable(root: &Path) -> bool {
    let probe = root.join(format!("{}-{}", PROBE_PREFIX, std::process::id()));
    match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&probe)
    {
        Ok(_) => std::fs::remove_file(&probe).is_ok(),
        Err(e) => {
            tracing::warn!("Volume write probe failed: {}", e);
            false
        }
    }
}

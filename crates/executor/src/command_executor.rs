use crate::command_guard::CommandGuard;
use claw_bridge_tools::truncate_for_display;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::{timeout, Duration};

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Empty command")]
    EmptyCommand,
    #[error("Could not parse command line: {0}")]
    Parse(String),
    #[error("{0}")]
    Blocked(String),
    #[error("Failed to start process: {0}")]
    Spawn(String),
    #[error("Timed out after {0}s")]
    Timeout(u64),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    pub timeout_secs: u64,
    pub output_cap_chars: usize,
    pub blocked_programs: Vec<String>,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            output_cap_chars: 3000,
            blocked_programs: CommandGuard::default_blocked(),
        }
    }
}

/// One bounded invocation of an external program.
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub timeout: Duration,
    pub output_cap: usize,
    pub clear_env: bool,
}

#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub truncated: bool,
    pub elapsed_ms: u128,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn render(&self) -> String {
        let status = match self.exit_code {
            Some(0) => "✅ exit 0".to_string(),
            Some(code) => format!("⚠️ exit {}", code),
            None => "⚠️ terminated by signal".to_string(),
        };

        let mut out = format!("{} ({} ms)", status, self.elapsed_ms);
        if !self.stdout.trim().is_empty() {
            out.push_str(&format!("\n```\n{}\n```", self.stdout.trim_end()));
        }
        if !self.stderr.trim().is_empty() {
            out.push_str(&format!("\nstderr:\n```\n{}\n```", self.stderr.trim_end()));
        }
        if self.stdout.trim().is_empty() && self.stderr.trim().is_empty() {
            out.push_str("\n(no output)");
        }
        out
    }
}

pub async fn run_process(spec: &ProcessSpec) -> Result<ExecOutput, ExecutorError> {
    tracing::info!("Executing command: {} {:?}", spec.program, spec.args);

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .current_dir(&spec.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if spec.clear_env {
        cmd.env_clear()
            .env("PATH", "/usr/local/bin:/usr/bin:/bin")
            .env("HOME", &spec.cwd);
    }

    // New session, so the child leads a process group that can be killed as a whole
    #[cfg(unix)]
    {
        unsafe {
            cmd.pre_exec(|| {
                libc::setsid();
                Ok(())
            });
        }
    }

    let started = Instant::now();
    let mut child = cmd.spawn().map_err(|e| ExecutorError::Spawn(e.to_string()))?;
    let pid = child.id();
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ExecutorError::Spawn("stdout was not captured".into()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| ExecutorError::Spawn("stderr was not captured".into()))?;

    // A char is at most four bytes, so this always holds `output_cap` chars plus one.
    let byte_cap = spec.output_cap.saturating_mul(4).saturating_add(4);
    let collect = async {
        let (out, err) = tokio::try_join!(
            read_capped(stdout, byte_cap),
            read_capped(stderr, byte_cap)
        )?;
        let status = child.wait().await?;
        Ok::<_, std::io::Error>((status, out, err))
    };

    let collected = timeout(spec.timeout, collect).await;
    let (status, (out, out_overflow), (err, err_overflow)) = match collected {
        Ok(result) => result.map_err(|e| ExecutorError::Spawn(e.to_string()))?,
        Err(_) => {
            tracing::warn!("Command {} timed out after {:?}", spec.program, spec.timeout);
            kill_group(pid);
            if let Err(e) = child.kill().await {
                tracing::debug!("Failed to reap {}: {}", spec.program, e);
            }
            return Err(ExecutorError::Timeout(spec.timeout.as_secs()));
        }
    };

    let (stdout, stdout_cut) = capped_text(&out, out_overflow, spec.output_cap);
    let (stderr, stderr_cut) = capped_text(&err, err_overflow, spec.output_cap);

    Ok(ExecOutput {
        exit_code: status.code(),
        stdout,
        stderr,
        truncated: stdout_cut || stderr_cut,
        elapsed_ms: started.elapsed().as_millis(),
    })
}

/// Keeps the first `cap` bytes and drains the rest so the child never blocks on a full pipe.
/// The flag reports whether anything was dropped.
async fn read_capped<R>(mut reader: R, cap: usize) -> std::io::Result<(Vec<u8>, bool)>
where
    R: AsyncRead + Unpin,
{
    let mut kept = Vec::new();
    (&mut reader).take(cap as u64).read_to_end(&mut kept).await?;
    let dropped = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
    Ok((kept, dropped > 0))
}

fn capped_text(bytes: &[u8], overflowed: bool, cap: usize) -> (String, bool) {
    let (text, cut) = truncate_for_display(&String::from_utf8_lossy(bytes), cap);
    if overflowed && !cut {
        (format!("{}\n… [truncated: output exceeded the capture limit]", text), true)
    } else {
        (text, cut || overflowed)
    }
}

#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
    let Some(pid) = pid else {
        return;
    };
    // The group id equals the leader's pid after setsid.
    let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
    if rc != 0 {
        tracing::debug!("killpg({}) failed: {}", pid, std::io::Error::last_os_error());
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>) {}

/// Runs user command lines inside the workspace root.
pub struct CommandExecutor {
    config: ExecConfig,
    workdir: PathBuf,
}

impl CommandExecutor {
    pub fn new(config: ExecConfig, workdir: impl AsRef<Path>) -> Self {
        Self {
            config,
            workdir: workdir.as_ref().to_path_buf(),
        }
    }

    pub fn parse(cmdline: &str) -> Result<Vec<String>, ExecutorError> {
        let argv = shlex::split(cmdline)
            .ok_or_else(|| ExecutorError::Parse("unbalanced quotes".into()))?;
        if argv.is_empty() {
            return Err(ExecutorError::EmptyCommand);
        }
        Ok(argv)
    }

    /// Non-zero exit is a normal result; only guard refusals, spawn failures and timeouts are errors.
    pub async fn execute(&self, cmdline: &str) -> Result<ExecOutput, ExecutorError> {
        let argv = Self::parse(cmdline)?;
        CommandGuard::validate(&argv, &self.config.blocked_programs)?;

        let spec = ProcessSpec {
            program: argv[0].clone(),
            args: argv[1..].to_vec(),
            cwd: self.workdir.clone(),
            timeout: Duration::from_secs(self.config.timeout_secs),
            output_cap: self.config.output_cap_chars,
            clear_env: true,
        };
        run_process(&spec).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor(dir: &Path) -> CommandExecutor {
        CommandExecutor::new(ExecConfig::default(), dir)
    }

    #[test]
    fn test_parse_quotes() {
        let argv = CommandExecutor::parse("echo 'hello world' x").unwrap();
        assert_eq!(argv, vec!["echo", "hello world", "x"]);
        assert!(matches!(
            CommandExecutor::parse("echo 'oops"),
            Err(ExecutorError::Parse(_))
        ));
        assert!(matches!(
            CommandExecutor::parse("   "),
            Err(ExecutorError::EmptyCommand)
        ));
    }

    #[tokio::test]
    async fn test_runs_in_workspace() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
        let output = executor(dir.path()).execute("ls").await.unwrap();
        assert!(output.success());
        assert!(output.stdout.contains("marker.txt"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let output = executor(dir.path()).execute("ls does-not-exist").await.unwrap();
        assert!(!output.success());
        assert!(output.render().contains("exit"));
    }

    #[tokio::test]
    async fn test_blocked_command_not_run() {
        let dir = tempfile::tempdir().unwrap();
        let result = executor(dir.path()).execute("rm -rf .").await;
        assert!(matches!(result, Err(ExecutorError::Blocked(_))));
    }

    #[tokio::test]
    async fn test_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExecConfig {
            timeout_secs: 1,
            ..ExecConfig::default()
        };
        let result = CommandExecutor::new(config, dir.path()).execute("sleep 5").await;
        assert!(matches!(result, Err(ExecutorError::Timeout(1))));
    }

    #[tokio::test]
    async fn test_large_output_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExecConfig {
            output_cap_chars: 100,
            ..ExecConfig::default()
        };
        let output = CommandExecutor::new(config, dir.path())
            .execute("seq 1 2000000")
            .await
            .unwrap();
        assert!(output.success());
        assert!(output.truncated);
        assert!(output.stdout.starts_with("1\n2\n3\n"));
        assert!(output.stdout.len() < 1000);
    }

    #[tokio::test]
    async fn test_read_capped_drains_remainder() {
        let data = vec![b'x'; 10_000];
        let (kept, dropped) = read_capped(&data[..], 16).await.unwrap();
        assert_eq!(kept.len(), 16);
        assert!(dropped);

        let (kept, dropped) = read_capped(&b"short"[..], 16).await.unwrap();
        assert_eq!(kept, b"short");
        assert!(!dropped);
    }

    #[tokio::test]
    async fn test_timeout_kills_background_children() {
        let dir = tempfile::tempdir().unwrap();
        let spec = ProcessSpec {
            program: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                "(sleep 2; touch late.txt) & sleep 10".to_string(),
            ],
            cwd: dir.path().to_path_buf(),
            timeout: Duration::from_secs(1),
            output_cap: 100,
            clear_env: true,
        };
        let result = run_process(&spec).await;
        assert!(matches!(result, Err(ExecutorError::Timeout(1))));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!dir.path().join("late.txt").exists());
    }

    #[tokio::test]
    async fn test_output_cap() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExecConfig {
            output_cap_chars: 10,
            ..ExecConfig::default()
        };
        let output = CommandExecutor::new(config, dir.path())
            .execute("echo aaaaaaaaaaaaaaaaaaaaaaaaaaaaaa")
            .await
            .unwrap();
        assert!(output.truncated);
        assert!(output.stdout.contains("truncated"));
    }
}

//! Explicit command execution and pending-operation continuations.

use crate::conversation::ConversationState;
use crate::error::BridgeError;
use crate::format;
use crate::types::{Command, PendingOp, SyncSubcommand};
use claw_bridge_executor::{CommandExecutor, ExecutorError, SyncError, SyncHealthGate};
use claw_bridge_tools::{EntryKind, SandboxedPath, Workspace, WorkspaceError};

pub const EDITING_DISABLED: &str =
    "🔒 Editing is disabled in this conversation. Send :dangerzone to enable it.";

const MAX_SUGGESTIONS: usize = 3;

/// Runs explicit commands against the workspace, exec runner and sync gate.
///
/// Expected failures (sandbox violations, missing files, bounds errors, blocked or failing
/// commands, unhealthy sync) come back as reply text. Only unexpected I/O errors are returned
/// as `Err` and end up at the dispatcher's error boundary.
pub struct CommandHandler {
    workspace: Workspace,
    executor: CommandExecutor,
    sync: SyncHealthGate,
    prefix: String,
}

impl CommandHandler {
    pub fn new(
        workspace: Workspace,
        executor: CommandExecutor,
        sync: SyncHealthGate,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            workspace,
            executor,
            sync,
            prefix: prefix.into(),
        }
    }

    pub fn help(&self) -> String {
        let p = &self.prefix;
        format!(
            "🧭 Commands:\n\
             {p} ls [path] - list a directory\n\
             {p} cat <file> - show a file\n\
             {p} write <file> <content...> - create or replace a file\n\
             {p} append <file> <content...> - append a line\n\
             {p} edit <file> <line> <content...> - replace one line\n\
             {p} edit <file> - replace the whole file with your next message\n\
             {p} sync [status|test|push] - host sync (bare form pulls)\n\
             {p} exec <cmdline> - run a command in the workspace\n\
             {p} status - workspace summary\n\
             stop / start - pause or resume this conversation\n\
             :dangerzone / :safetyzone - enable or disable editing",
            p = p
        )
    }

    pub fn intent_prompt(&self) -> String {
        format!(
            "👋 What would you like to do? Send `{} help` for the command list.",
            self.prefix
        )
    }

    pub async fn handle(
        &self,
        command: Command,
        state: &mut ConversationState,
    ) -> Result<String, BridgeError> {
        tracing::debug!("Handling command: {:?}", command);

        if command.is_destructive() && !state.editing_enabled {
            tracing::warn!("Refused {} with editing disabled", command.name());
            return Ok(EDITING_DISABLED.to_string());
        }

        let name = command.name();
        match command {
            Command::List(path) => {
                let result = self.list(path.as_deref()).await;
                state.remember(name, None);
                inline(result)
            }
            Command::Read(path) => {
                let result = match self.workspace.resolve(&path) {
                    Ok(file) => self.workspace.read(&file).await.map(|c| format::file_content(&c)),
                    Err(e) => Err(e),
                };
                if result.is_ok() {
                    state.remember(name, Some(path));
                }
                inline(result)
            }
            Command::Write(path, content) => {
                let result = self.write(&path, &content).await;
                if result.is_ok() {
                    state.remember(name, Some(path));
                }
                inline(result)
            }
            Command::Append(path, content) => {
                let result = match self.workspace.resolve(&path) {
                    Ok(file) => self
                        .workspace
                        .append(&file, &content)
                        .await
                        .map(|n| format!("✅ Appended {} bytes to {}", n, file)),
                    Err(e) => Err(e),
                };
                if result.is_ok() {
                    state.remember(name, Some(path));
                }
                inline(result)
            }
            Command::Edit(path, line, content) => {
                let result = match self.workspace.resolve(&path) {
                    Ok(file) => self
                        .workspace
                        .replace_line(&file, line, &content)
                        .await
                        .map(|_| format!("✅ Replaced line {} of {}", line, file)),
                    Err(e) => Err(e),
                };
                if result.is_ok() {
                    state.remember(name, Some(path));
                }
                inline(result)
            }
            Command::BeginWrite(path) => self.begin_write(path, state).await,
            Command::BeginEdit(path) => self.begin_edit(&path, state).await,
            Command::Sync(sub) => {
                state.remember(name, None);
                Ok(self.sync(sub).await)
            }
            Command::Exec(cmdline) => {
                state.remember(name, None);
                Ok(self.exec(&cmdline).await)
            }
            Command::Status => Ok(self.status(state)),
            Command::Help => Ok(self.help()),
            Command::Usage(usage) => Ok(format!("❓ Usage: {} {}", self.prefix, usage)),
            Command::Unknown(raw) => Ok(format!(
                "❓ Unknown command: {}\nSend `{} help` for the command list.",
                raw, self.prefix
            )),
        }
    }

    /// Feeds `text` to the pending operation. The slot is consumed unless the op asks again.
    pub async fn continue_pending(
        &self,
        text: &str,
        state: &mut ConversationState,
    ) -> Result<String, BridgeError> {
        let Some(op) = state.take_pending() else {
            return Ok(self.intent_prompt());
        };

        if !state.editing_enabled {
            tracing::warn!("Dropped pending operation ({}): editing disabled", op.describe());
            return Ok(EDITING_DISABLED.to_string());
        }

        match op {
            PendingOp::EditingFile(file) | PendingOp::WritingFile { path: Some(file), .. } => {
                let result = self.write_resolved(&file, text).await;
                if result.is_ok() {
                    state.remember("write", Some(file.to_string()));
                }
                inline(result)
            }
            PendingOp::WritingFile {
                path: None,
                suggested,
            } => {
                let (first, rest) = text.split_once('\n').unwrap_or((text, ""));
                let first = first.trim();
                let raw = match first.parse::<usize>() {
                    Ok(n) if n >= 1 && n <= suggested.len() => suggested[n - 1].clone(),
                    _ => first.to_string(),
                };

                let file = match self.workspace.resolve(&raw) {
                    Ok(file) => file,
                    Err(e) => {
                        let reply = format!(
                            "{}\nSend another path, or `cancel`.",
                            format::workspace_error(&e)
                        );
                        state.set_pending(PendingOp::WritingFile {
                            path: None,
                            suggested,
                        });
                        return Ok(reply);
                    }
                };

                if rest.trim().is_empty() {
                    let reply = format!("✍️ Send the content for {}, or `cancel`.", file);
                    state.set_pending(PendingOp::WritingFile {
                        path: Some(file),
                        suggested: Vec::new(),
                    });
                    return Ok(reply);
                }

                let result = self.write_resolved(&file, rest).await;
                if result.is_ok() {
                    state.remember("write", Some(file.to_string()));
                }
                inline(result)
            }
        }
    }

    async fn list(&self, path: Option<&str>) -> Result<String, WorkspaceError> {
        let dir = self.workspace.guard().resolve_or_root(path)?;
        let entries = self.workspace.list(&dir).await?;
        Ok(format::listing(&dir, &entries))
    }

    async fn write(&self, raw: &str, content: &str) -> Result<String, WorkspaceError> {
        let file = self.workspace.resolve(raw)?;
        self.write_resolved(&file, content).await
    }

    async fn write_resolved(
        &self,
        file: &SandboxedPath,
        content: &str,
    ) -> Result<String, WorkspaceError> {
        let bytes = self.workspace.write(file, content).await?;
        Ok(format!("✅ Wrote {} bytes to {}", bytes, file))
    }

    async fn begin_write(
        &self,
        path: Option<String>,
        state: &mut ConversationState,
    ) -> Result<String, BridgeError> {
        if let Some(raw) = path {
            let file = match self.workspace.resolve(&raw) {
                Ok(file) => file,
                Err(e) => return inline(Err(e)),
            };
            let reply = format!("✍️ Send the content for {}, or `cancel`.", file);
            state.set_pending(PendingOp::WritingFile {
                path: Some(file),
                suggested: Vec::new(),
            });
            return Ok(reply);
        }

        let suggested = self.suggest_paths(state).await;
        let mut reply = "✍️ Which file should I write? Reply with a path".to_string();
        if suggested.is_empty() {
            reply.push('.');
        } else {
            reply.push_str(" or a number:");
            for (i, path) in suggested.iter().enumerate() {
                reply.push_str(&format!("\n{}. {}", i + 1, path));
            }
        }
        reply.push_str("\nPut the content on the following lines, or send it next. `cancel` aborts.");

        state.set_pending(PendingOp::WritingFile {
            path: None,
            suggested,
        });
        Ok(reply)
    }

    async fn begin_edit(
        &self,
        raw: &str,
        state: &mut ConversationState,
    ) -> Result<String, BridgeError> {
        let result = match self.workspace.resolve(raw) {
            Ok(file) => self.workspace.read(&file).await.map(|c| (file, c)),
            Err(e) => Err(e),
        };
        let (file, content) = match result {
            Ok(found) => found,
            Err(e) => return inline(Err(e)),
        };

        let reply = format!(
            "{}\n✏️ Send the new content for {} to replace it, or `cancel`.",
            format::file_content(&content),
            file
        );
        state.remember("edit", Some(raw.to_string()));
        state.set_pending(PendingOp::EditingFile(file));
        Ok(reply)
    }

    /// Last touched file first, then top-level files of the workspace.
    async fn suggest_paths(&self, state: &ConversationState) -> Vec<String> {
        let mut suggested: Vec<String> = state.last_file.iter().cloned().collect();
        let root = self.workspace.guard().root_path();
        if let Ok(entries) = self.workspace.list(&root).await {
            for entry in entries.into_iter().filter(|e| e.kind == EntryKind::File) {
                if suggested.len() >= MAX_SUGGESTIONS {
                    break;
                }
                if !suggested.contains(&entry.name) {
                    suggested.push(entry.name);
                }
            }
        }
        suggested
    }

    async fn sync(&self, sub: Option<SyncSubcommand>) -> String {
        match sub {
            Some(SyncSubcommand::Status) => self.sync.check().report(),
            Some(SyncSubcommand::Test) => {
                let mut out = self.sync.check().report();
                match self.sync.probe().await {
                    Ok(output) => out.push_str(&format!("\n🔌 Sync daemon: {}", output.render())),
                    Err(e) => out.push_str(&format!("\n🔌 Sync daemon: {}", sync_error(&e))),
                }
                out
            }
            Some(SyncSubcommand::Push) => match self.sync.push().await {
                Ok(output) => format!("⬆️ Pushed workspace to host\n{}", output.render()),
                Err(e) => sync_error(&e),
            },
            None => match self.sync.pull().await {
                Ok(output) => format!("⬇️ Pulled workspace from host\n{}", output.render()),
                Err(e) => sync_error(&e),
            },
        }
    }

    async fn exec(&self, cmdline: &str) -> String {
        match self.executor.execute(cmdline).await {
            Ok(output) => format!("$ {}\n{}", cmdline, output.render()),
            Err(e) => exec_error(&e),
        }
    }

    fn status(&self, state: &ConversationState) -> String {
        let stats = self.workspace.stats();
        let mut out = format!(
            "📊 Workspace status\n📁 Files: {}\n💾 Size: {}\n✏️ Editing: {}",
            stats.file_count,
            format::human_bytes(stats.total_bytes),
            if state.editing_enabled { "enabled" } else { "disabled" }
        );
        if let Some(op) = state.pending() {
            out.push_str(&format!("\n⏳ Pending: {}", op.describe()));
        }
        out
    }
}

/// Turns expected workspace failures into reply text; raw I/O failures propagate.
fn inline(result: Result<String, WorkspaceError>) -> Result<String, BridgeError> {
    match result {
        Ok(reply) => Ok(reply),
        Err(WorkspaceError::Io(e)) => Err(WorkspaceError::Io(e).into()),
        Err(e) => {
            if e.is_violation() {
                tracing::warn!("{}", e);
            }
            Ok(format::workspace_error(&e))
        }
    }
}

fn exec_error(err: &ExecutorError) -> String {
    match err {
        ExecutorError::Blocked(msg) => format!("🚫 Command blocked: {}", msg),
        ExecutorError::Timeout(secs) => format!("⏱️ Command timed out after {}s", secs),
        other => format!("❌ {}", other),
    }
}

fn sync_error(err: &SyncError) -> String {
    match err {
        SyncError::Unhealthy(health) => {
            format!("🛑 Sync refused, workspace is unhealthy.\n{}", health.report())
        }
        SyncError::NotConfigured => "⚠️ No sync daemon is configured.".to_string(),
        SyncError::Daemon(e) => exec_error(e),
    }
}

//! Event pipeline: loop guard, authorization, routing, execution, spam guard, send.

use crate::commands::{CommandHandler, EDITING_DISABLED};
use crate::config::BridgeConfig;
use crate::conversation::{ConversationRegistry, ConversationState};
use crate::directives::DirectiveRunner;
use crate::error::BridgeError;
use crate::prompt;
use crate::router::{Route, Router};
use chrono::Utc;
use claw_bridge_executor::{CommandExecutor, SyncHealthGate};
use claw_bridge_interfaces::{ChatTransport, InboundEvent, TransportError};
use claw_bridge_policy::{AuthDecision, AuthorizationGate, LoopGuard, SpamGuard};
use claw_bridge_providers::CompletionBackend;
use claw_bridge_tools::{Workspace, WorkspaceGuard};
use std::sync::Arc;
use std::time::Duration;

pub const DEGRADED_REPLY: &str =
    "⚠️ Something went wrong while handling your message. Please try again.";

pub struct Dispatcher {
    transport: Arc<dyn ChatTransport>,
    backend: Arc<dyn CompletionBackend>,
    loop_guard: LoopGuard,
    auth: AuthorizationGate,
    spam: SpamGuard,
    router: Router,
    conversations: ConversationRegistry,
    commands: CommandHandler,
    directives: DirectiveRunner,
    system_prompt: String,
    poll_backoff: Duration,
}

impl Dispatcher {
    /// Builds the pipeline. Events sent before this call are treated as backlog and dropped.
    pub fn new(
        config: &BridgeConfig,
        transport: Arc<dyn ChatTransport>,
        backend: Arc<dyn CompletionBackend>,
    ) -> Result<Self, BridgeError> {
        let guard = WorkspaceGuard::new(&config.workspace.root)?;
        let workspace = Workspace::new(guard, config.workspace.read_truncate_chars);
        let root = workspace.guard().root().to_path_buf();

        let commands = CommandHandler::new(
            workspace.clone(),
            CommandExecutor::new(config.exec.clone(), &root),
            SyncHealthGate::new(workspace.clone(), config.sync.clone()),
            config.command_prefix.clone(),
        );

        tracing::info!("Workspace root: {}", root.display());

        Ok(Self {
            transport,
            backend,
            loop_guard: LoopGuard::new(config.bot_id.clone(), Utc::now(), &config.dedup),
            auth: AuthorizationGate::new(
                config.authorized_users.iter().cloned(),
                config.unauthorized_chat,
            ),
            spam: SpamGuard::new(config.spam.clone()),
            router: Router::new(config.command_prefix.clone()),
            conversations: ConversationRegistry::new(config.workspace.editing_enabled),
            commands,
            directives: DirectiveRunner::new(workspace),
            system_prompt: prompt::build_system_prompt(config.system_prompt.as_deref()),
            poll_backoff: Duration::from_secs(config.poll_backoff_secs),
        })
    }

    pub fn conversation(&self, conversation_id: &str) -> Option<&ConversationState> {
        self.conversations.get(conversation_id)
    }

    /// Polls the transport until it reports `Closed`. Other transport errors are retried
    /// after a fixed backoff.
    pub async fn run(&mut self) -> Result<(), BridgeError> {
        tracing::info!(
            "Bridge running (transport: {}, backend: {})",
            self.transport.name(),
            self.backend.name()
        );

        loop {
            match self.transport.receive_events().await {
                Ok(events) => {
                    for event in events {
                        self.process_event(event).await;
                    }
                }
                Err(TransportError::Closed) => {
                    tracing::info!("Transport closed, stopping");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Polling failed: {}. Retrying in {:?}", e, self.poll_backoff);
                    tokio::time::sleep(self.poll_backoff).await;
                }
            }
        }
    }

    /// Handles one event inside the error boundary. Never fails.
    pub async fn process_event(&mut self, event: InboundEvent) {
        if !self.loop_guard.admit(&event) {
            return;
        }

        tracing::debug!(
            "Event {} from {} in {}",
            event.id,
            event.author_id,
            event.conversation_id
        );

        match self.handle_admitted(&event).await {
            Ok(Some(reply)) => self.deliver(&event.conversation_id, &reply).await,
            Ok(None) => {}
            Err(e) => {
                tracing::error!("Failed to handle event {}: {}", event.id, e);
                self.deliver(&event.conversation_id, DEGRADED_REPLY).await;
            }
        }
    }

    async fn handle_admitted(&mut self, event: &InboundEvent) -> Result<Option<String>, BridgeError> {
        let is_command = self.router.is_command(&event.text);
        match self.auth.decide(event, is_command) {
            AuthDecision::Allowed => {}
            AuthDecision::Refuse(message) => return Ok(Some(message)),
            AuthDecision::Ignore => return Ok(None),
        }

        let state = self.conversations.entry(&event.conversation_id);
        let route = self.router.route(state, &event.text);

        let reply = match route {
            Route::Discard => return Ok(None),
            Route::Stop => {
                state.stop();
                tracing::info!("Conversation {} stopped", event.conversation_id);
                "⏸️ Stopped. Send `start` to resume.".to_string()
            }
            Route::Start => {
                state.start();
                tracing::info!("Conversation {} started", event.conversation_id);
                "▶️ Running.".to_string()
            }
            Route::EnableEditing => {
                state.editing_enabled = true;
                tracing::warn!("Editing enabled in {}", event.conversation_id);
                "⚠️ Danger zone: editing is enabled for this conversation.".to_string()
            }
            Route::DisableEditing => {
                state.editing_enabled = false;
                tracing::info!("Editing disabled in {}", event.conversation_id);
                EDITING_DISABLED.to_string()
            }
            Route::Prompt => self.commands.intent_prompt(),
            Route::Command(command) => {
                if let Some(op) = state.take_pending() {
                    tracing::debug!("Command cancelled pending operation ({})", op.describe());
                }
                self.commands.handle(command, state).await?
            }
            Route::Cancel => match state.take_pending() {
                Some(op) => format!("🛑 Cancelled {}.", op.describe()),
                None => "Nothing to cancel.".to_string(),
            },
            Route::Continuation(text) => self.commands.continue_pending(&text, state).await?,
            Route::FreeForm(text) => {
                let user_text = prompt::build_user_text(&text, state.context_summary().as_deref());
                match self.backend.complete(&self.system_prompt, &user_text).await {
                    Ok(completion) => self.directives.run(&completion, state).await,
                    Err(e) => {
                        tracing::warn!("Completion failed for {}: {}", event.conversation_id, e);
                        e.user_message().to_string()
                    }
                }
            }
        };

        Ok(Some(reply))
    }

    /// Sends `text` unless the spam guard suppresses it. Suppression is only logged.
    async fn deliver(&mut self, conversation_id: &str, text: &str) {
        let suppressed = self.spam.should_suppress(conversation_id, text);
        self.spam.record(conversation_id, text);
        if suppressed {
            return;
        }

        if let Err(e) = self.transport.send(conversation_id, text).await {
            tracing::error!("Failed to send reply to {}: {}", conversation_id, e);
        }
    }
}

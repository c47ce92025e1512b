use anyhow::{Context, Result};
use claw_bridge_app::config::{config_path_from_args, Config};
use claw_bridge_core::Dispatcher;
use claw_bridge_interfaces::TerminalTransport;
use claw_bridge_providers::OpenAICompatibleProvider;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays the chat surface.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let path = Config::resolve_path(config_path_from_args(std::env::args().skip(1))?);
    let config = Config::load(&path)?;
    config.validate().context("Invalid configuration")?;
    tracing::info!("Loaded configuration from {}", path.display());

    std::fs::create_dir_all(&config.bridge.workspace.root).with_context(|| {
        format!(
            "Failed to create workspace {}",
            config.bridge.workspace.root.display()
        )
    })?;

    let api_key = config.api_key();
    if api_key.is_none() {
        tracing::warn!(
            "{} is not set; requests are sent without credentials",
            config.provider.api_key_env
        );
    }
    let backend = OpenAICompatibleProvider::new(&config.provider, api_key)
        .context("Failed to create completion backend")?;
    tracing::info!(
        "Completion backend: {} ({})",
        config.provider.base_url,
        config.provider.model
    );

    let transport = TerminalTransport::new(
        config.terminal.conversation_id.clone(),
        config.terminal.author_id.clone(),
    );

    let mut dispatcher = Dispatcher::new(&config.bridge, Arc::new(transport), Arc::new(backend))
        .context("Failed to start dispatcher")?;

    tokio::select! {
        result = dispatcher.run() => result.context("Dispatcher stopped")?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted, shutting down"),
    }

    Ok(())
}

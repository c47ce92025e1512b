use anyhow::{bail, Context, Result};
use claw_bridge_core::BridgeConfig;
use claw_bridge_providers::ProviderConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "CLAW_BRIDGE_CONFIG";
pub const ENV_LLM_ENDPOINT: &str = "CLAW_BRIDGE_LLM_ENDPOINT";
pub const ENV_LLM_MODEL: &str = "CLAW_BRIDGE_LLM_MODEL";
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub conversation_id: String,
    /// Identity attached to every terminal line; must be in `authorized_users`.
    pub author_id: String,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            conversation_id: "terminal".to_string(),
            author_id: "local-user".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(flatten)]
    pub bridge: BridgeConfig,
    pub provider: ProviderConfig,
    pub terminal: TerminalConfig,
}

impl Config {
    /// `--config` wins over `CLAW_BRIDGE_CONFIG`, which wins over `./config.yaml`.
    pub fn resolve_path(cli: Option<PathBuf>) -> PathBuf {
        cli.or_else(|| std::env::var_os(ENV_CONFIG_PATH).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Invalid YAML configuration")
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(endpoint) = lookup(ENV_LLM_ENDPOINT).filter(|v| !v.trim().is_empty()) {
            self.provider.base_url = endpoint;
        }
        if let Some(model) = lookup(ENV_LLM_MODEL).filter(|v| !v.trim().is_empty()) {
            self.provider.model = model;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.bridge
            .validate()
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        if self.provider.base_url.trim().is_empty() {
            bail!("provider.base_url must not be empty");
        }
        if self.provider.model.trim().is_empty() {
            bail!("provider.model must not be empty");
        }
        if self.provider.timeout_secs == 0 {
            bail!("provider.timeout_secs must be positive");
        }
        if !self
            .bridge
            .authorized_users
            .contains(&self.terminal.author_id)
        {
            tracing::warn!(
                "Terminal author {} is not in authorized_users; its commands will be refused",
                self.terminal.author_id
            );
        }
        Ok(())
    }

    /// API key from the configured environment variable, if set.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.provider.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// Reads `--config <path>` or `--config=<path>` from the command line.
pub fn config_path_from_args(args: impl IntoIterator<Item = String>) -> Result<Option<PathBuf>> {
    let mut args = args.into_iter();
    let mut path = None;
    while let Some(arg) = args.next() {
        if arg == "--config" {
            let value = args.next().context("--config needs a path")?;
            path = Some(PathBuf::from(value));
        } else if let Some(value) = arg.strip_prefix("--config=") {
            path = Some(PathBuf::from(value));
        } else {
            bail!("Unknown argument: {}", arg);
        }
    }
    Ok(path)
}

use claw_bridge_app::config::{config_path_from_args, Config, ENV_LLM_ENDPOINT, ENV_LLM_MODEL};
use claw_bridge_policy::UnauthorizedChatPolicy;
use std::fs;
use std::path::PathBuf;

const FULL_CONFIG: &str = r#"
bot_id: bridge-bot
authorized_users: [alice, local-user]
unauthorized_chat: refuse
command_prefix: ":bot"
workspace:
  root: /srv/workspace
  editing_enabled: true
  read_truncate_chars: 1000
exec:
  timeout_secs: 10
  blocked_programs: [rm]
spam:
  repeat_limit: 3
sync:
  critical_files: [package.json, src/index.js]
  min_file_count: 10
  program: unison
  pull_args: [pull]
provider:
  base_url: http://localhost:8080/v1
  model: llama3
"#;

#[test]
fn test_config_full_file() {
    let config = Config::from_yaml(FULL_CONFIG).unwrap();

    assert_eq!(config.bridge.bot_id, "bridge-bot");
    assert_eq!(config.bridge.unauthorized_chat, UnauthorizedChatPolicy::Refuse);
    assert_eq!(config.bridge.command_prefix, ":bot");
    assert_eq!(config.bridge.workspace.root, PathBuf::from("/srv/workspace"));
    assert!(config.bridge.workspace.editing_enabled);
    assert_eq!(config.bridge.exec.timeout_secs, 10);
    assert_eq!(config.bridge.exec.blocked_programs, vec!["rm".to_string()]);
    assert_eq!(config.bridge.spam.repeat_limit, 3);
    // Untouched fields keep their defaults.
    assert_eq!(config.bridge.spam.similarity_window, 6);
    assert_eq!(config.bridge.dedup.capacity, 1000);
    assert_eq!(config.bridge.sync.program.as_deref(), Some("unison"));
    assert_eq!(config.provider.model, "llama3");
    assert_eq!(config.terminal.author_id, "local-user");
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_minimal_uses_defaults() {
    let config = Config::from_yaml("authorized_users: [alice]\n").unwrap();
    assert_eq!(config.bridge.command_prefix, ":h");
    assert_eq!(config.bridge.unauthorized_chat, UnauthorizedChatPolicy::Ignore);
    assert!(!config.bridge.workspace.editing_enabled);
    assert_eq!(config.provider.api_key_env, "OPENAI_API_KEY");
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_rejects_missing_users() {
    let config = Config::from_yaml("bot_id: x\n").unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_rejects_bad_yaml() {
    assert!(Config::from_yaml("unauthorized_chat: maybe\n").is_err());
    assert!(Config::from_yaml("authorized_users: [unclosed\n").is_err());
}

#[test]
fn test_env_overrides() {
    let mut config = Config::from_yaml(FULL_CONFIG).unwrap();
    config.apply_overrides(|key| match key {
        k if k == ENV_LLM_ENDPOINT => Some("https://llm.internal/v1".to_string()),
        k if k == ENV_LLM_MODEL => Some(String::new()),
        _ => None,
    });
    assert_eq!(config.provider.base_url, "https://llm.internal/v1");
    // Empty values do not override.
    assert_eq!(config.provider.model, "llama3");
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bridge.yaml");
    fs::write(&path, FULL_CONFIG).unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.bridge.bot_id, "bridge-bot");

    let missing = Config::load(&dir.path().join("nope.yaml"));
    assert!(missing.is_err());
}

#[test]
fn test_config_path_arguments() {
    let args = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    assert_eq!(config_path_from_args(args(&[])).unwrap(), None);
    assert_eq!(
        config_path_from_args(args(&["--config", "a.yaml"])).unwrap(),
        Some(PathBuf::from("a.yaml"))
    );
    assert_eq!(
        config_path_from_args(args(&["--config=b.yaml"])).unwrap(),
        Some(PathBuf::from("b.yaml"))
    );
    assert!(config_path_from_args(args(&["--config"])).is_err());
    assert!(config_path_from_args(args(&["--verbose"])).is_err());
    assert_eq!(
        Config::resolve_path(Some(PathBuf::from("cli.yaml"))),
        PathBuf::from("cli.yaml")
    );
}

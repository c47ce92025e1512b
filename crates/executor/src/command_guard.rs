use crate::command_executor::ExecutorError;
use claw_bridge_tools::is_sensitive_name;
use std::path::{Component, Path};

pub const DEFAULT_BLOCKED: &[&str] = &[
    "sudo", "su", "doas", "rm", "chmod", "chown", "dd", "mkfs", "shutdown", "reboot", "curl",
    "wget", "nc", "netcat", "ssh", "scp",
];
const SENSITIVE_PATHS: &[&str] = &["/etc/", "/proc/", "/sys/", "/dev/", "/root/", "/home/"];

pub struct CommandGuard;

impl CommandGuard {
    /// Validates an already-split argument vector. The program runs without a shell, so
    /// metacharacters are inert; what is checked is the program and the paths it is handed.
    pub fn validate(argv: &[String], blocked: &[String]) -> Result<(), ExecutorError> {
        let program = argv.first().ok_or(ExecutorError::EmptyCommand)?;

        let base_cmd = program.split('/').next_back().unwrap_or(program);
        if blocked.iter().any(|b| b == base_cmd) {
            return Err(ExecutorError::Blocked(format!("Blocked command: {}", base_cmd)));
        }

        for (idx, arg) in argv.iter().enumerate() {
            Self::validate_argument(arg, idx == 0)?;
        }

        Ok(())
    }

    fn validate_argument(arg: &str, is_program: bool) -> Result<(), ExecutorError> {
        if arg.chars().any(|c| c.is_control() && c != '\t') {
            return Err(ExecutorError::Blocked("Control character in argument".into()));
        }

        if is_program || arg.starts_with('-') || arg.contains(char::is_whitespace) {
            return Ok(());
        }

        let path = Path::new(arg);
        for component in path.components() {
            match component {
                Component::ParentDir => {
                    return Err(ExecutorError::Blocked("Path traversal in argument".into()));
                }
                Component::Normal(part) if is_sensitive_name(&part.to_string_lossy()) => {
                    return Err(ExecutorError::Blocked(format!(
                        "Sensitive name in argument: {}",
                        arg
                    )));
                }
                _ => {}
            }
        }

        if SENSITIVE_PATHS.iter().any(|s| arg.starts_with(s)) {
            return Err(ExecutorError::Blocked(format!(
                "Access to sensitive path: {}",
                arg
            )));
        }

        if path.is_absolute() && !arg.starts_with("/tmp") {
            return Err(ExecutorError::Blocked("Absolute path not allowed".into()));
        }

        Ok(())
    }

    pub fn default_blocked() -> Vec<String> {
        DEFAULT_BLOCKED.iter().map(|s| s.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_blocked_program() {
        let blocked = CommandGuard::default_blocked();
        assert!(matches!(
            CommandGuard::validate(&argv(&["rm", "-rf", "src"]), &blocked),
            Err(ExecutorError::Blocked(_))
        ));
        assert!(matches!(
            CommandGuard::validate(&argv(&["/usr/bin/sudo", "ls"]), &blocked),
            Err(ExecutorError::Blocked(_))
        ));
    }

    #[test]
    fn test_traversal_and_sensitive_args() {
        let blocked = CommandGuard::default_blocked();
        assert!(CommandGuard::validate(&argv(&["cat", "../../etc/passwd"]), &blocked).is_err());
        assert!(CommandGuard::validate(&argv(&["cat", "/etc/passwd"]), &blocked).is_err());
        assert!(CommandGuard::validate(&argv(&["cat", ".env"]), &blocked).is_err());
        assert!(CommandGuard::validate(&argv(&["cat", "config/id_rsa"]), &blocked).is_err());
    }

    #[test]
    fn test_ordinary_commands_pass() {
        let blocked = CommandGuard::default_blocked();
        assert!(CommandGuard::validate(&argv(&["ls", "-la", "."]), &blocked).is_ok());
        assert!(CommandGuard::validate(&argv(&["git", "status"]), &blocked).is_ok());
        assert!(CommandGuard::validate(&argv(&["echo", "fix token bug"]), &blocked).is_ok());
        assert!(CommandGuard::validate(&argv(&["npm", "test"]), &blocked).is_ok());
    }

    #[test]
    fn test_empty_command() {
        assert!(matches!(
            CommandGuard::validate(&[], &[]),
            Err(ExecutorError::EmptyCommand)
        ));
    }
}

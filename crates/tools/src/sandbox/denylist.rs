use crate::error::WorkspaceError;

const SENSITIVE_WORDS: &[&str] = &["secret", "token", "password", "passwd", "credential"];
const KEY_SUFFIXES: &[&str] = &[".key", ".pem", ".p12", ".pfx", ".keystore"];
const KEY_MARKERS: &[&str] = &[
    "api_key",
    "apikey",
    "api-key",
    "private_key",
    "privkey",
    "id_rsa",
    "id_ecdsa",
    "id_ed25519",
];

/// Returns true when a single path component must never be read, written or listed.
///
/// Hidden names (including every `.env*` variant) are always sensitive; other names are
/// checked case-insensitively for credential words and key material.
pub fn is_sensitive_name(name: &str) -> bool {
    if name.starts_with('.') {
        return true;
    }

    let lower = name.to_ascii_lowercase();

    if SENSITIVE_WORDS.iter().any(|w| lower.contains(w)) {
        return true;
    }

    if KEY_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
        return true;
    }

    KEY_MARKERS.iter().any(|m| lower.contains(m))
}

pub fn check_component(name: &str) -> Result<(), WorkspaceError> {
    if is_sensitive_name(name) {
        return Err(WorkspaceError::SandboxViolation(format!(
            "Access to sensitive name denied: {}",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_and_env_files() {
        assert!(is_sensitive_name(".env"));
        assert!(is_sensitive_name(".env.production"));
        assert!(is_sensitive_name(".git"));
        assert!(is_sensitive_name(".bashrc"));
    }

    #[test]
    fn test_credential_words() {
        assert!(is_sensitive_name("client_secret.json"));
        assert!(is_sensitive_name("GITHUB_TOKEN"));
        assert!(is_sensitive_name("passwords.txt"));
        assert!(is_sensitive_name("etc-passwd"));
    }

    #[test]
    fn test_key_material() {
        assert!(is_sensitive_name("server.key"));
        assert!(is_sensitive_name("cert.PEM"));
        assert!(is_sensitive_name("id_rsa"));
        assert!(is_sensitive_name("id_ed25519.pub"));
        assert!(is_sensitive_name("openai_api_key.txt"));
    }

    #[test]
    fn test_ordinary_names_pass() {
        assert!(!is_sensitive_name("README.md"));
        assert!(!is_sensitive_name("package.json"));
        assert!(!is_sensitive_name("keyboard.rs"));
        assert!(!is_sensitive_name("monkey.txt"));
        assert!(check_component("src").is_ok());
    }
}

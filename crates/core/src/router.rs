//! Classification of inbound text and parsing of the explicit command grammar.

use crate::conversation::ConversationState;
use crate::types::{Command, SyncSubcommand};

pub const DEFAULT_PREFIX: &str = ":h";

const USAGE_CAT: &str = "cat <file>";
const USAGE_APPEND: &str = "append <file> <content...>";
const USAGE_EDIT: &str = "edit <file> <line> <content...>";
const USAGE_EXEC: &str = "exec <cmdline>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Stop,
    Start,
    EnableEditing,
    DisableEditing,
    /// Conversation is stopped; drop silently.
    Discard,
    /// Bare prefix with nothing after it.
    Prompt,
    Command(Command),
    Cancel,
    Continuation(String),
    FreeForm(String),
}

#[derive(Debug, Clone)]
pub struct Router {
    prefix: String,
}

impl Router {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Body after the prefix if `text` is an explicit command. `:hx` is not `:h x`.
    fn command_body<'a>(&self, text: &'a str) -> Option<&'a str> {
        let rest = text.trim_start().strip_prefix(self.prefix.as_str())?;
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            Some(rest.trim())
        } else {
            None
        }
    }

    pub fn is_command(&self, text: &str) -> bool {
        self.command_body(text).is_some()
    }

    pub fn route(&self, state: &ConversationState, text: &str) -> Route {
        let trimmed = text.trim();

        if state.stopped {
            return if trimmed == "start" {
                Route::Start
            } else {
                Route::Discard
            };
        }

        match trimmed {
            "stop" => return Route::Stop,
            "start" => return Route::Start,
            ":dangerzone" => return Route::EnableEditing,
            ":safetyzone" => return Route::DisableEditing,
            _ => {}
        }

        if let Some(body) = self.command_body(text) {
            if body.is_empty() {
                return Route::Prompt;
            }
            return Route::Command(parse_command(body));
        }

        if state.pending().is_some() {
            if trimmed.eq_ignore_ascii_case("cancel") {
                return Route::Cancel;
            }
            return Route::Continuation(text.to_string());
        }

        Route::FreeForm(text.to_string())
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

/// Splits off the first whitespace-delimited word, returning it and the trimmed remainder.
fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(idx) => (&text[..idx], text[idx..].trim_start()),
        None => (text, ""),
    }
}

/// Parses the text after the prefix. Content arguments keep their inner whitespace and newlines.
pub fn parse_command(body: &str) -> Command {
    let (name, rest) = split_word(body);

    match name {
        "help" => Command::Help,
        "status" => Command::Status,
        "ls" => {
            let (path, _) = split_word(rest);
            Command::List((!path.is_empty()).then(|| path.to_string()))
        }
        "cat" => {
            let (path, _) = split_word(rest);
            if path.is_empty() {
                Command::Usage(USAGE_CAT)
            } else {
                Command::Read(path.to_string())
            }
        }
        "write" => {
            let (path, content) = split_word(rest);
            match (path.is_empty(), content.is_empty()) {
                (true, _) => Command::BeginWrite(None),
                (false, true) => Command::BeginWrite(Some(path.to_string())),
                (false, false) => Command::Write(path.to_string(), content.to_string()),
            }
        }
        "append" => {
            let (path, content) = split_word(rest);
            if path.is_empty() || content.is_empty() {
                Command::Usage(USAGE_APPEND)
            } else {
                Command::Append(path.to_string(), content.to_string())
            }
        }
        "edit" => {
            let (path, rest) = split_word(rest);
            if path.is_empty() {
                return Command::Usage(USAGE_EDIT);
            }
            if rest.is_empty() {
                return Command::BeginEdit(path.to_string());
            }
            let (line, content) = split_word(rest);
            match line.parse::<usize>() {
                Ok(line) if !content.is_empty() => {
                    Command::Edit(path.to_string(), line, content.to_string())
                }
                _ => Command::Usage(USAGE_EDIT),
            }
        }
        "sync" => match split_word(rest).0 {
            "" => Command::Sync(None),
            "status" => Command::Sync(Some(SyncSubcommand::Status)),
            "test" => Command::Sync(Some(SyncSubcommand::Test)),
            "push" => Command::Sync(Some(SyncSubcommand::Push)),
            _ => Command::Unknown(body.to_string()),
        },
        "exec" => {
            if rest.is_empty() {
                Command::Usage(USAGE_EXEC)
            } else {
                Command::Exec(rest.to_string())
            }
        }
        _ => Command::Unknown(body.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PendingOp;

    fn active() -> ConversationState {
        ConversationState::new(false)
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("ls"), Command::List(None));
        assert_eq!(parse_command("ls src"), Command::List(Some("src".into())));
        assert_eq!(parse_command("cat a.txt"), Command::Read("a.txt".into()));
        assert_eq!(
            parse_command("write a.txt hello  world\nline two"),
            Command::Write("a.txt".into(), "hello  world\nline two".into())
        );
        assert_eq!(
            parse_command("edit notes.txt 3 hello"),
            Command::Edit("notes.txt".into(), 3, "hello".into())
        );
        assert_eq!(
            parse_command("sync push"),
            Command::Sync(Some(SyncSubcommand::Push))
        );
        assert_eq!(parse_command("exec ls -la"), Command::Exec("ls -la".into()));
        assert_eq!(parse_command("frobnicate x"), Command::Unknown("frobnicate x".into()));
    }

    #[test]
    fn test_missing_arguments() {
        assert_eq!(parse_command("cat"), Command::Usage(USAGE_CAT));
        assert_eq!(parse_command("append a.txt"), Command::Usage(USAGE_APPEND));
        assert_eq!(parse_command("edit a.txt x hi"), Command::Usage(USAGE_EDIT));
        assert_eq!(parse_command("edit a.txt 2"), Command::Usage(USAGE_EDIT));
        assert_eq!(parse_command("exec"), Command::Usage(USAGE_EXEC));
    }

    #[test]
    fn test_write_without_content_opens_pending() {
        assert_eq!(parse_command("write"), Command::BeginWrite(None));
        assert_eq!(
            parse_command("write a.txt"),
            Command::BeginWrite(Some("a.txt".into()))
        );
        assert_eq!(parse_command("edit a.txt"), Command::BeginEdit("a.txt".into()));
    }

    #[test]
    fn test_prefix_must_be_followed_by_whitespace() {
        let router = Router::default();
        assert!(router.is_command(":h ls"));
        assert!(router.is_command(":h"));
        assert!(!router.is_command(":help"));
        assert_eq!(router.route(&active(), ":h"), Route::Prompt);
        assert_eq!(
            router.route(&active(), ":hello there"),
            Route::FreeForm(":hello there".into())
        );
    }

    #[test]
    fn test_stopped_discards_everything_but_start() {
        let router = Router::default();
        let mut state = active();
        state.stop();
        assert_eq!(router.route(&state, ":h ls"), Route::Discard);
        assert_eq!(router.route(&state, "hello"), Route::Discard);
        assert_eq!(router.route(&state, "start"), Route::Start);
    }

    #[test]
    fn test_pending_continuation_and_cancel() {
        let router = Router::default();
        let mut state = active();
        state.set_pending(PendingOp::WritingFile {
            path: None,
            suggested: Vec::new(),
        });
        assert_eq!(
            router.route(&state, "notes.txt"),
            Route::Continuation("notes.txt".into())
        );
        assert_eq!(router.route(&state, "cancel"), Route::Cancel);
        assert_eq!(
            router.route(&state, ":h status"),
            Route::Command(Command::Status)
        );
    }

    #[test]
    fn test_grammar_is_case_sensitive() {
        let router = Router::default();
        assert_eq!(router.route(&active(), "STOP"), Route::FreeForm("STOP".into()));
        assert_eq!(router.route(&active(), " stop "), Route::Stop);
        assert_eq!(router.route(&active(), ":dangerzone"), Route::EnableEditing);
    }
}

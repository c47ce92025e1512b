/// Base instructions used when the configuration does not provide its own.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant working inside a project \
workspace on behalf of the user you are chatting with. Keep replies short and suitable for a chat \
message.";

/// Directive grammar appended to every system prompt.
pub const DIRECTIVE_GUIDE: &str = "\
You can act on the workspace by writing these markers in your reply. Each one is replaced by its result.
LIST_FILES or LIST_FILES:<dir> - list the workspace root or a directory
READ_FILE:<path> - show a file
WRITE_FILE:<path>:<content> - replace a file with one line of content
WRITE_FILE:<path>: followed by the file body on the next lines and a final line END_FILE
APPEND_FILE:<path>:<content> - append a line (the END_FILE block form works too)
EDIT_FILE:<path>:<line>=<new content> - replace one line (1-indexed)
EDIT_FILE:<path>:<find>=><replace> - replace the first occurrence of a text
Paths are relative to the workspace root. Hidden files and credentials are not accessible.";

pub fn build_system_prompt(base: Option<&str>) -> String {
    format!(
        "{}\n\n{}",
        base.unwrap_or(DEFAULT_SYSTEM_PROMPT).trim(),
        DIRECTIVE_GUIDE
    )
}

/// User text as sent to the backend, prefixed by the conversation's short context.
pub fn build_user_text(text: &str, context: Option<&str>) -> String {
    match context {
        Some(context) => format!("[context: {}]\n\n{}", context, text),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_always_lists_directives() {
        assert!(build_system_prompt(None).contains("READ_FILE:<path>"));
        let custom = build_system_prompt(Some("Be terse."));
        assert!(custom.starts_with("Be terse."));
        assert!(custom.contains("END_FILE"));
    }

    #[test]
    fn test_user_text_context() {
        assert_eq!(build_user_text("hi", None), "hi");
        assert_eq!(
            build_user_text("hi", Some("last file: a.txt")),
            "[context: last file: a.txt]\n\nhi"
        );
    }
}

//! Single-pass tokenizer for directives embedded in model output.
//!
//! Each marker occurrence becomes one [`DirectiveSpan`] covering exactly the bytes it consumed,
//! so results can be substituted by position even when the same directive text repeats.

use crate::types::Directive;
use std::ops::Range;
use thiserror::Error;

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '"', '\'', '`'];
const LEADING_QUOTES: &[char] = &['`', '"', '\'', '('];
const BLOCK_TERMINATOR: &str = "END_FILE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    List,
    Read,
    Write,
    Append,
    Edit,
}

const MARKERS: [(&str, Kind); 5] = [
    ("LIST_FILES", Kind::List),
    ("READ_FILE", Kind::Read),
    ("WRITE_FILE", Kind::Write),
    ("APPEND_FILE", Kind::Append),
    ("EDIT_FILE", Kind::Edit),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("malformed {0}: expected ':' after the path")]
    MissingSeparator(&'static str),
    #[error("malformed {0}: empty path")]
    EmptyPath(&'static str),
    #[error("malformed {0}: no content")]
    EmptyContent(&'static str),
    #[error("malformed {0}: content block has no END_FILE line")]
    Unterminated(&'static str),
    #[error("malformed EDIT_FILE instructions: {0}")]
    BadInstructions(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveSpan {
    pub range: Range<usize>,
    pub parsed: Result<Directive, ExtractionError>,
}

/// How an `EDIT_FILE` directive changes its file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditInstruction {
    ReplaceLine { line: usize, content: String },
    ReplaceText { find: String, replace: String },
}

impl EditInstruction {
    /// `<line>=<content>` or `<find>=><replace>`.
    pub fn parse(instructions: &str) -> Result<Self, ExtractionError> {
        if let Some((find, replace)) = instructions.split_once("=>") {
            let find = find.trim();
            if find.is_empty() {
                return Err(ExtractionError::BadInstructions(
                    "nothing to find before '=>'".to_string(),
                ));
            }
            return Ok(EditInstruction::ReplaceText {
                find: find.to_string(),
                replace: replace.trim().to_string(),
            });
        }

        if let Some((line, content)) = instructions.split_once('=') {
            return match line.trim().parse::<usize>() {
                Ok(line) => Ok(EditInstruction::ReplaceLine {
                    line,
                    content: content.trim().to_string(),
                }),
                Err(_) => Err(ExtractionError::BadInstructions(format!(
                    "'{}' is not a line number",
                    line.trim()
                ))),
            };
        }

        Err(ExtractionError::BadInstructions(
            "expected <line>=<content> or <find>=><replace>".to_string(),
        ))
    }
}

/// Tokenizes `text` once, left to right. Spans are ordered and never overlap.
pub fn extract(text: &str) -> Vec<DirectiveSpan> {
    let mut spans = Vec::new();
    let mut cursor = 0;

    while let Some((start, marker, kind)) = next_marker(text, cursor) {
        let body = start + marker.len();
        let (end, parsed) = match kind {
            Kind::List => parse_list(text, body),
            Kind::Read => parse_read(text, body),
            Kind::Write => parse_payload(text, body, marker, |path, content| {
                Directive::WriteFile { path, content }
            }),
            Kind::Append => parse_payload(text, body, marker, |path, content| {
                Directive::AppendFile { path, content }
            }),
            Kind::Edit => parse_edit(text, body),
        };
        let end = end.max(body);
        spans.push(DirectiveSpan {
            range: start..end,
            parsed,
        });
        cursor = end;
    }

    spans
}

fn next_marker(text: &str, from: usize) -> Option<(usize, &'static str, Kind)> {
    let mut from = from;
    loop {
        let (start, marker, kind) = MARKERS
            .iter()
            .filter_map(|(marker, kind)| {
                text[from..]
                    .find(marker)
                    .map(|idx| (from + idx, *marker, *kind))
            })
            .min_by_key(|(start, _, _)| *start)?;

        if starts_word(text, start) {
            return Some((start, marker, kind));
        }
        from = start + marker.len();
    }
}

fn starts_word(text: &str, start: usize) -> bool {
    match text[..start].chars().next_back() {
        Some(c) => !(c.is_alphanumeric() || c == '_'),
        None => true,
    }
}

fn line_end(text: &str, from: usize) -> usize {
    text[from..]
        .find('\n')
        .map(|idx| from + idx)
        .unwrap_or(text.len())
}

/// Reads `<path>` up to the next ':' or whitespace. Returns the cleaned path and where it ended.
fn path_token(text: &str, from: usize) -> (String, usize) {
    let len = text[from..]
        .find(|c: char| c == ':' || c.is_whitespace())
        .unwrap_or(text.len() - from);
    let end = from + len;
    let path = text[from..end].trim_matches(LEADING_QUOTES).to_string();
    (path, end)
}

// Path token after a `:`; ends at whitespace with trailing punctuation stripped.
fn path_argument(text: &str, from: usize) -> (usize, &str) {
    let token_len = text[from..]
        .find(char::is_whitespace)
        .unwrap_or(text.len() - from);
    let token = text[from..from + token_len].trim_end_matches(TRAILING_PUNCTUATION);
    (from + token.len(), token.trim_start_matches(LEADING_QUOTES))
}

fn parse_list(text: &str, body: usize) -> (usize, Result<Directive, ExtractionError>) {
    if !text[body..].starts_with(':') {
        return (body, Ok(Directive::ListFiles { path: None }));
    }
    let (end, path) = path_argument(text, body + 1);
    let path = (!path.is_empty()).then(|| path.to_string());
    (end, Ok(Directive::ListFiles { path }))
}

fn parse_read(text: &str, body: usize) -> (usize, Result<Directive, ExtractionError>) {
    if !text[body..].starts_with(':') {
        return (body, Err(ExtractionError::MissingSeparator("READ_FILE")));
    }
    let (end, path) = path_argument(text, body + 1);
    if path.is_empty() {
        return (end, Err(ExtractionError::EmptyPath("READ_FILE")));
    }
    (
        end,
        Ok(Directive::ReadFile {
            path: path.to_string(),
        }),
    )
}

fn parse_payload(
    text: &str,
    body: usize,
    marker: &'static str,
    build: impl FnOnce(String, String) -> Directive,
) -> (usize, Result<Directive, ExtractionError>) {
    if !text[body..].starts_with(':') {
        return (body, Err(ExtractionError::MissingSeparator(marker)));
    }
    let (path, path_end) = path_token(text, body + 1);
    if !text[path_end..].starts_with(':') {
        return (path_end, Err(ExtractionError::MissingSeparator(marker)));
    }
    if path.is_empty() {
        return (path_end + 1, Err(ExtractionError::EmptyPath(marker)));
    }

    let content_start = path_end + 1;
    let first_line_end = line_end(text, content_start);
    let inline = text[content_start..first_line_end].trim();
    if !inline.is_empty() {
        return (first_line_end, Ok(build(path, inline.to_string())));
    }

    match read_block(text, first_line_end) {
        Some((content, end)) => {
            if content.is_empty() && marker == "APPEND_FILE" {
                return (end, Err(ExtractionError::EmptyContent(marker)));
            }
            (end, Ok(build(path, content)))
        }
        None => (first_line_end, Err(ExtractionError::Unterminated(marker))),
    }
}

/// Collects the lines after `header_end` up to a line reading `END_FILE`.
/// Returns the content and the end of the terminator line.
fn read_block(text: &str, header_end: usize) -> Option<(String, usize)> {
    if header_end >= text.len() {
        return None;
    }
    let block_start = header_end + 1;
    let mut pos = block_start;

    loop {
        let stop = line_end(text, pos);
        if text[pos..stop].trim() == BLOCK_TERMINATOR {
            let content = strip_fence(&text[block_start..pos]);
            return Some((content, stop));
        }
        if stop >= text.len() {
            return None;
        }
        pos = stop + 1;
    }
}

/// Drops a surrounding markdown code fence, which models like to add around file bodies.
fn strip_fence(block: &str) -> String {
    let lines: Vec<&str> = block.lines().collect();
    match (lines.first(), lines.last()) {
        (Some(first), Some(last))
            if lines.len() >= 2 && first.trim_start().starts_with("```") && last.trim() == "```" =>
        {
            let mut inner = lines[1..lines.len() - 1].join("\n");
            inner.push('\n');
            inner
        }
        _ => block.replace("\r\n", "\n"),
    }
}

fn parse_edit(text: &str, body: usize) -> (usize, Result<Directive, ExtractionError>) {
    if !text[body..].starts_with(':') {
        return (body, Err(ExtractionError::MissingSeparator("EDIT_FILE")));
    }
    let (path, path_end) = path_token(text, body + 1);
    if !text[path_end..].starts_with(':') {
        return (path_end, Err(ExtractionError::MissingSeparator("EDIT_FILE")));
    }
    if path.is_empty() {
        return (path_end + 1, Err(ExtractionError::EmptyPath("EDIT_FILE")));
    }

    let end = line_end(text, path_end + 1);
    let instructions = text[path_end + 1..end].trim();
    if instructions.is_empty() {
        return (
            end,
            Err(ExtractionError::BadInstructions("no instructions".to_string())),
        );
    }
    (
        end,
        Ok(Directive::EditFile {
            path,
            instructions: instructions.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directives(text: &str) -> Vec<Result<Directive, ExtractionError>> {
        extract(text).into_iter().map(|s| s.parsed).collect()
    }

    fn read(path: &str) -> Result<Directive, ExtractionError> {
        Ok(Directive::ReadFile {
            path: path.to_string(),
        })
    }

    #[test]
    fn test_read_strips_trailing_punctuation() {
        let text = "Let me look at READ_FILE:src/main.rs.";
        let spans = extract(text);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].parsed, read("src/main.rs"));
        assert_eq!(&text[spans[0].range.clone()], "READ_FILE:src/main.rs");
    }

    #[test]
    fn test_repeated_directives_are_all_extracted() {
        let text = "READ_FILE:a.txt and READ_FILE:a.txt then LIST_FILES";
        assert_eq!(
            directives(text),
            vec![
                read("a.txt"),
                read("a.txt"),
                Ok(Directive::ListFiles { path: None })
            ]
        );
    }

    #[test]
    fn test_list_takes_optional_path() {
        let text = "Here: LIST_FILES:src. and LIST_FILES: done";
        let spans = extract(text);
        assert_eq!(spans.len(), 2);
        assert_eq!(
            spans[0].parsed,
            Ok(Directive::ListFiles {
                path: Some("src".into())
            })
        );
        assert_eq!(&text[spans[0].range.clone()], "LIST_FILES:src");
        assert_eq!(spans[1].parsed, Ok(Directive::ListFiles { path: None }));
        assert_eq!(&text[spans[1].range.clone()], "LIST_FILES:");
    }

    #[test]
    fn test_write_inline() {
        assert_eq!(
            directives("WRITE_FILE:notes.txt: hello world\nmore text"),
            vec![Ok(Directive::WriteFile {
                path: "notes.txt".into(),
                content: "hello world".into()
            })]
        );
    }

    #[test]
    fn test_write_block() {
        let text = "Saving.\nWRITE_FILE:src/lib.rs:\nfn a() {}\nfn b() {}\nEND_FILE\nDone.";
        let spans = extract(text);
        assert_eq!(spans.len(), 1);
        assert_eq!(
            spans[0].parsed,
            Ok(Directive::WriteFile {
                path: "src/lib.rs".into(),
                content: "fn a() {}\nfn b() {}\n".into()
            })
        );
        assert_eq!(&text[spans[0].range.end..], "\nDone.");
    }

    #[test]
    fn test_block_code_fence_is_stripped() {
        let text = "APPEND_FILE:log.md:\n```markdown\n- item\n```\nEND_FILE";
        assert_eq!(
            directives(text),
            vec![Ok(Directive::AppendFile {
                path: "log.md".into(),
                content: "- item\n".into()
            })]
        );
    }

    #[test]
    fn test_unterminated_block() {
        assert_eq!(
            directives("WRITE_FILE:a.txt:\nno terminator"),
            vec![Err(ExtractionError::Unterminated("WRITE_FILE"))]
        );
    }

    #[test]
    fn test_malformed_does_not_stop_extraction() {
        assert_eq!(
            directives("WRITE_FILE oops READ_FILE:b.txt"),
            vec![
                Err(ExtractionError::MissingSeparator("WRITE_FILE")),
                read("b.txt")
            ]
        );
        assert_eq!(
            directives("READ_FILE: x"),
            vec![Err(ExtractionError::EmptyPath("READ_FILE"))]
        );
    }

    #[test]
    fn test_marker_inside_word_is_ignored() {
        assert!(extract("MY_READ_FILE:x and XLIST_FILES").is_empty());
    }

    #[test]
    fn test_edit_directive() {
        assert_eq!(
            directives("EDIT_FILE:notes.txt:2=second line"),
            vec![Ok(Directive::EditFile {
                path: "notes.txt".into(),
                instructions: "2=second line".into()
            })]
        );
    }

    #[test]
    fn test_edit_instruction_forms() {
        assert_eq!(
            EditInstruction::parse("3=hello"),
            Ok(EditInstruction::ReplaceLine {
                line: 3,
                content: "hello".into()
            })
        );
        assert_eq!(
            EditInstruction::parse("foo => bar"),
            Ok(EditInstruction::ReplaceText {
                find: "foo".into(),
                replace: "bar".into()
            })
        );
        assert!(EditInstruction::parse("x=1").is_err());
        assert!(EditInstruction::parse("just words").is_err());
    }
}

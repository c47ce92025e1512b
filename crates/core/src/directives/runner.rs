use super::parser::{extract, EditInstruction, ExtractionError};
use crate::conversation::ConversationState;
use crate::format;
use crate::types::Directive;
use claw_bridge_tools::{Workspace, WorkspaceError};
use thiserror::Error;

pub const PROCESSED_ACK: &str = "✅ Processed.";

#[derive(Debug, Error)]
enum DirectiveError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error(transparent)]
    Malformed(#[from] ExtractionError),
}

/// Executes directives found in model output and substitutes their results in place.
pub struct DirectiveRunner {
    workspace: Workspace,
}

impl DirectiveRunner {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }

    /// Runs every directive in `text` left to right. Failures become inline markers and never
    /// stop the remaining directives.
    pub async fn run(&self, text: &str, state: &mut ConversationState) -> String {
        let spans = extract(text);
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        let mut last_success: Option<Directive> = None;

        tracing::debug!("Found {} directives in reply", spans.len());

        for span in spans {
            out.push_str(&text[cursor..span.range.start]);
            cursor = span.range.end;

            let directive = match span.parsed {
                Ok(directive) => directive,
                Err(e) => {
                    tracing::debug!("Malformed directive: {}", e);
                    out.push_str(&format!("⚠️ [{}]", e));
                    continue;
                }
            };

            if directive.is_destructive() && !state.editing_enabled {
                tracing::warn!("Skipped {} with editing disabled", directive.marker());
                out.push_str(&format!(
                    "🔒 [editing disabled: {} {} was not applied]",
                    directive.marker(),
                    directive.path().unwrap_or_default()
                ));
                continue;
            }

            match self.execute(&directive).await {
                Ok(result) => {
                    out.push_str(&result);
                    last_success = Some(directive);
                }
                Err(e) => {
                    tracing::debug!("{} failed: {}", directive.marker(), e);
                    let reason = match &e {
                        DirectiveError::Workspace(err) => format::workspace_error(err),
                        DirectiveError::Malformed(err) => err.to_string(),
                    };
                    out.push_str(&format!("[{} failed: {}]", directive.marker(), reason));
                }
            }
        }
        out.push_str(&text[cursor..]);

        if let Some(directive) = last_success {
            let file = match &directive {
                Directive::ListFiles { .. } => None,
                other => other.path().map(str::to_string),
            };
            state.remember(directive.marker(), file);
        }

        if out.trim().is_empty() {
            PROCESSED_ACK.to_string()
        } else {
            out
        }
    }

    async fn execute(&self, directive: &Directive) -> Result<String, DirectiveError> {
        match directive {
            Directive::ListFiles { path } => {
                let dir = self.workspace.guard().resolve_or_root(path.as_deref())?;
                let entries = self.workspace.list(&dir).await?;
                Ok(format::listing(&dir, &entries))
            }
            Directive::ReadFile { path } => {
                let file = self.workspace.resolve(path)?;
                let content = self.workspace.read(&file).await?;
                Ok(format::file_content(&content))
            }
            Directive::WriteFile { path, content } => {
                let file = self.workspace.resolve(path)?;
                let bytes = self.workspace.write(&file, content).await?;
                Ok(format!("✅ [wrote {} bytes to {}]", bytes, file))
            }
            Directive::AppendFile { path, content } => {
                let file = self.workspace.resolve(path)?;
                self.workspace.append(&file, content).await?;
                Ok(format!("✅ [appended to {}]", file))
            }
            Directive::EditFile { path, instructions } => {
                let instruction = EditInstruction::parse(instructions)?;
                let file = self.workspace.resolve(path)?;
                match instruction {
                    EditInstruction::ReplaceLine { line, content } => {
                        self.workspace.replace_line(&file, line, &content).await?;
                        Ok(format!("✅ [edited {}: line {}]", file, line))
                    }
                    EditInstruction::ReplaceText { find, replace } => {
                        self.workspace.replace_text(&file, &find, &replace).await?;
                        Ok(format!("✅ [edited {}]", file))
                    }
                }
            }
        }
    }
}

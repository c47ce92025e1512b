use async_trait::async_trait;
use thiserror::Error;

/// Failure categories of a completion call. None of them is retried automatically.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Rate limited by provider")]
    RateLimited,
    #[error("Provider rejected credentials: {0}")]
    Auth(String),
    #[error("Provider timed out")]
    Timeout,
    #[error("Network error: {0}")]
    Network(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

impl CompletionError {
    /// Message shown to the chat user for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            CompletionError::RateLimited => {
                "⏳ The AI service is rate limiting requests. Please wait a minute and try again."
            }
            CompletionError::Auth(_) => {
                "🔑 The AI service rejected the configured credentials. Check the API key."
            }
            CompletionError::Timeout => "⌛ The AI service took too long to answer. Please try again.",
            CompletionError::Network(_) => "🌐 Could not reach the AI service. Please try again later.",
            CompletionError::Api(_) | CompletionError::Parse(_) => {
                "⚠️ The AI service returned an unexpected response."
            }
        }
    }
}

/// Completion backend port: system prompt and user text in, reply text out.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_text: &str)
        -> Result<String, CompletionError>;

    fn name(&self) -> &str;
}

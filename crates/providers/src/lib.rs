pub mod openai_compatible;
pub mod traits;

pub use openai_compatible::{OpenAICompatibleProvider, ProviderConfig};
pub use traits::{CompletionBackend, CompletionError};

mod parser;
mod runner;

pub use parser::{extract, DirectiveSpan, EditInstruction, ExtractionError};
pub use runner::{DirectiveRunner, PROCESSED_ACK};

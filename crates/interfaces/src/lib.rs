pub mod terminal;
pub mod traits;

pub use terminal::TerminalTransport;
pub use traits::{ChatTransport, InboundEvent, TransportError};

//! Line-oriented command terminals.
//!
//! ```text
//!   UART1 / stdin ──┐
//!                   ├──▶ Session ──▶ CommandProcessor ──▶ WateringSystem
//!   TCP :31415 ─────┘
//! ```

pub mod codec;
pub mod session;
pub mod tcp;
pub mod transport;
pub mod uart;

pub use session::{PROMPT, Session, SessionEnd, SessionOptions};
pub use transport::{ScriptedTransport, Transport, TransportError};

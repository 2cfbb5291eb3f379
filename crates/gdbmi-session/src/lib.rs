//! gdbmi-session: command/result correlation over a GDB/MI connection.
//!
//! This crate assigns tokens to outgoing commands, matches result records
//! back to them, broadcasts everything else, and runs the debugger process
//! that feeds it.
pub mod command;
pub mod error;
pub mod process;
pub mod session;
pub mod transport;

// Re-export key types for convenience.
pub use error::{CallbackError, SessionError};
pub use process::{DebuggerCommand, DebuggerProcess, UNKNOWN_EXIT_CODE};
pub use session::{
    PendingCommand, ResultCallback, Session, SessionEvent, DEFAULT_EVENT_CAPACITY,
};
pub use transport::{ChannelTransport, Transport, WriterTransport};

// Cancellation handles accepted by `Session::send_with`.
pub use tokio_util::sync::CancellationToken;

//! Session error types.
use gdbmi_proto::ParseError;

/// Boxed error returned by a result callback.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Errors from sending commands and awaiting their results.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Nothing left to send once the token was stripped.
    #[error("command is empty")]
    EmptyCommand,

    /// The command spans more than one line.
    #[error("command must be a single line")]
    MultilineCommand,

    /// The leading digits do not fit an unsigned 32-bit token.
    #[error("invalid command token: {0}")]
    InvalidToken(String),

    /// A command with this token is still in flight.
    #[error("token {0} is already in flight")]
    DuplicateToken(u32),

    /// Writing to the transport failed.
    #[error("transport write failed: {0}")]
    Io(#[from] std::io::Error),

    /// The command was cancelled before its result was delivered.
    #[error("command {0} was cancelled")]
    Cancelled(u32),

    /// The result callback rejected the record.
    #[error("result callback for command {token} failed: {source}")]
    Callback {
        /// Token of the command.
        token: u32,
        /// Error raised by the callback.
        #[source]
        source: CallbackError,
    },

    /// The debugger exited while the command was pending.
    #[error("debugger exited with code {0}")]
    DebuggerExited(i32),

    /// The session dropped the command without resolving it.
    #[error("session closed before the command completed")]
    Closed,

    /// The debugger process could not be started.
    #[error("debugger failed to start: {0}")]
    SpawnFailed(String),

    /// An output line could not be parsed.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
}

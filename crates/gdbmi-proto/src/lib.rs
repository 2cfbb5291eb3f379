//! gdbmi-proto: value tree, line parser and record model for the GDB/MI
//! output protocol.
//!
//! Everything here is synchronous and allocation-only: one output line in,
//! one immutable [`Record`] out.
pub mod error;
pub mod parser;
pub mod record;
pub mod value;
pub mod views;

// Re-export key types for convenience.
pub use error::{ParseError, ValueError};
pub use parser::{parse_payload, parse_record, parse_value, MAX_NESTING};
pub use record::{
    AsyncKind, AsyncRecord, Record, ResultClass, ResultRecord, StreamKind, StreamRecord, PROMPT,
};
pub use value::{unescape, List, Named, Tuple, Value};
pub use views::{Breakpoint, Frame, Thread};

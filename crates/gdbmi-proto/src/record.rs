//! Output records: one per line of debugger output.

use std::fmt;

use serde::Serialize;

use crate::error::ParseError;
use crate::value::Tuple;

/// The idle prompt sentinel.
pub const PROMPT: &str = "(gdb)";

/// Which output stream a stream record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    /// Textual responses to CLI commands (`~`).
    Console,
    /// Output of the running target (`@`).
    Target,
    /// Debugger-internal diagnostics (`&`).
    Log,
}

impl StreamKind {
    /// Map a line prefix to a stream kind.
    pub fn from_prefix(c: char) -> Option<Self> {
        match c {
            '~' => Some(Self::Console),
            '@' => Some(Self::Target),
            '&' => Some(Self::Log),
            _ => None,
        }
    }

    /// The line prefix for this kind.
    pub fn prefix(self) -> char {
        match self {
            Self::Console => '~',
            Self::Target => '@',
            Self::Log => '&',
        }
    }
}

/// Which asynchronous channel a notification arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AsyncKind {
    /// Target state changes: running, stopped (`*`).
    Exec,
    /// Progress of slow operations (`+`).
    Status,
    /// Supplementary notifications such as new breakpoints (`=`).
    Notify,
}

impl AsyncKind {
    /// Map a type character to an async kind.
    pub fn from_prefix(c: char) -> Option<Self> {
        match c {
            '*' => Some(Self::Exec),
            '+' => Some(Self::Status),
            '=' => Some(Self::Notify),
            _ => None,
        }
    }

    /// The type character for this kind.
    pub fn prefix(self) -> char {
        match self {
            Self::Exec => '*',
            Self::Status => '+',
            Self::Notify => '=',
        }
    }
}

/// Type character of a result record.
pub const RESULT_PREFIX: char = '^';

/// Well-known result classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultClass {
    /// `^done`
    Done,
    /// `^running`
    Running,
    /// `^connected`
    Connected,
    /// `^error`
    Error,
    /// `^exit`
    Exit,
    /// Any other class, verbatim.
    Other(String),
}

impl ResultClass {
    fn from_class(class: &str) -> Self {
        match class {
            "done" => Self::Done,
            "running" => Self::Running,
            "connected" => Self::Connected,
            "error" => Self::Error,
            "exit" => Self::Exit,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Text emitted on one of the output streams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamRecord {
    kind: StreamKind,
    content: String,
}

impl StreamRecord {
    /// Build a stream record; the content must not be empty.
    pub fn new(kind: StreamKind, content: impl Into<String>) -> Result<Self, ParseError> {
        let content = content.into();
        if content.is_empty() {
            return Err(ParseError::EmptyStream);
        }
        Ok(Self { kind, content })
    }

    /// The stream this text belongs to.
    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    /// Raw text with the outer quotes removed and escapes left intact.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Text with C-style escapes resolved.
    pub fn unescaped(&self) -> String {
        crate::value::unescape(&self.content)
    }
}

/// An asynchronous notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AsyncRecord {
    kind: AsyncKind,
    token: u32,
    class: String,
    payload: Tuple,
}

impl AsyncRecord {
    /// Build an async record; the class must contain non-whitespace text.
    pub fn new(
        kind: AsyncKind,
        token: u32,
        class: impl Into<String>,
        payload: Tuple,
    ) -> Result<Self, ParseError> {
        let class = validate_class(class.into())?;
        Ok(Self {
            kind,
            token,
            class,
            payload,
        })
    }

    /// Channel the notification arrived on.
    pub fn kind(&self) -> AsyncKind {
        self.kind
    }

    /// Token, or 0 when the line carried none.
    pub fn token(&self) -> u32 {
        self.token
    }

    /// Notification class, e.g. `stopped`.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Named results carried by the notification.
    pub fn payload(&self) -> &Tuple {
        &self.payload
    }
}

/// The result of a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRecord {
    token: u32,
    class: String,
    payload: Tuple,
}

impl ResultRecord {
    /// Build a result record; the class must contain non-whitespace text.
    pub fn new(token: u32, class: impl Into<String>, payload: Tuple) -> Result<Self, ParseError> {
        let class = validate_class(class.into())?;
        Ok(Self {
            token,
            class,
            payload,
        })
    }

    /// Token, or 0 when the line carried none.
    pub fn token(&self) -> u32 {
        self.token
    }

    /// Result class, e.g. `done`.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// The class as a [`ResultClass`].
    pub fn result_class(&self) -> ResultClass {
        ResultClass::from_class(&self.class)
    }

    /// Named results carried by the record.
    pub fn payload(&self) -> &Tuple {
        &self.payload
    }

    /// The `msg` field of an `^error` record, escapes resolved.
    pub fn error_message(&self) -> Option<String> {
        if self.result_class() != ResultClass::Error {
            return None;
        }
        self.payload.get("msg").and_then(|msg| msg.unescaped())
    }
}

fn validate_class(class: String) -> Result<String, ParseError> {
    if class.trim().is_empty() {
        Err(ParseError::EmptyClass)
    } else {
        Ok(class)
    }
}

/// One classified output line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    /// The debugger is idle and waiting for input.
    Prompt,
    /// Stream text.
    Stream(StreamRecord),
    /// Asynchronous notification.
    Async(AsyncRecord),
    /// Command result.
    Result(ResultRecord),
}

impl Record {
    /// Whether this record is not the answer to a command.
    pub fn is_out_of_band(&self) -> bool {
        matches!(self, Record::Stream(_) | Record::Async(_))
    }

    /// Token of a keyed record.
    pub fn token(&self) -> Option<u32> {
        match self {
            Record::Async(record) => Some(record.token()),
            Record::Result(record) => Some(record.token()),
            Record::Prompt | Record::Stream(_) => None,
        }
    }

    /// Class of a keyed record.
    pub fn class(&self) -> Option<&str> {
        match self {
            Record::Async(record) => Some(record.class()),
            Record::Result(record) => Some(record.class()),
            Record::Prompt | Record::Stream(_) => None,
        }
    }

    /// Payload of a keyed record.
    pub fn payload(&self) -> Option<&Tuple> {
        match self {
            Record::Async(record) => Some(record.payload()),
            Record::Result(record) => Some(record.payload()),
            Record::Prompt | Record::Stream(_) => None,
        }
    }
}

fn write_keyed(
    f: &mut fmt::Formatter<'_>,
    token: u32,
    prefix: char,
    class: &str,
    payload: &Tuple,
) -> fmt::Result {
    if token != 0 {
        write!(f, "{token}")?;
    }
    write!(f, "{prefix}{class}")?;
    for (name, value) in payload.iter() {
        write!(f, ",{name}={value}")?;
    }
    Ok(())
}

/// Renders the record back into its wire form.
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::Prompt => f.write_str(PROMPT),
            Record::Stream(record) => {
                write!(f, "{}\"{}\"", record.kind.prefix(), record.content)
            }
            Record::Async(record) => write_keyed(
                f,
                record.token,
                record.kind.prefix(),
                &record.class,
                &record.payload,
            ),
            Record::Result(record) => {
                write_keyed(f, record.token, RESULT_PREFIX, &record.class, &record.payload)
            }
        }
    }
}

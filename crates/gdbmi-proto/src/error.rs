//! Parser and value-access error types.

use thiserror::Error;

/// Errors raised while turning one output line into a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The line is empty or whitespace only.
    #[error("blank line")]
    Blank,

    /// A keyed line used a type character outside `^ * + =`.
    #[error("unknown record type character '{0}'")]
    UnknownRecordType(char),

    /// The line ended before any record type character was found.
    #[error("missing record type character")]
    MissingRecordType,

    /// The text before the type character is not an unsigned 32-bit token.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// A result or async record has an empty class.
    #[error("record class is empty")]
    EmptyClass,

    /// A stream record carries no content.
    #[error("stream record content is empty")]
    EmptyStream,

    /// A closing bracket without an opener, or an opener never closed.
    #[error("unbalanced enclosure at byte {offset}")]
    UnbalancedEnclosure {
        /// Byte offset into the data where the imbalance was detected.
        offset: usize,
    },

    /// Brackets and braces nest deeper than the parser allows.
    #[error("value nesting exceeds {limit} levels at byte {offset}")]
    TooDeep {
        /// Maximum accepted nesting.
        limit: usize,
        /// Byte offset of the opener that went past the limit.
        offset: usize,
    },

    /// A quoted string was never closed.
    #[error("unterminated string")]
    UnterminatedString,

    /// A value position holds no text (e.g. `a=` or `,,`).
    #[error("empty value")]
    EmptyValue,

    /// A `=` with nothing before it.
    #[error("empty result name")]
    EmptyName,

    /// Text follows the closing delimiter of a value.
    #[error("unexpected characters after value: {0}")]
    TrailingCharacters(String),

    /// A `{...}` tuple contains an entry without a name.
    #[error("tuple entry is missing a name")]
    UnnamedTupleEntry,

    /// Top-level record data contains only unnamed values.
    #[error("record data has no named results")]
    UnnamedPayload,
}

/// Errors raised by accessors on the value tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The key does not exist in the tuple.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The index is past the end of the collection.
    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of elements available.
        len: usize,
    },

    /// Key lookup on a value that has no keys.
    #[error("{0} value cannot be indexed by key")]
    NotKeyed(&'static str),

    /// Positional lookup on a value that has no elements.
    #[error("{0} value cannot be indexed by position")]
    NotIndexable(&'static str),

    /// A view expected a tuple.
    #[error("expected a tuple, found {0}")]
    NotATuple(&'static str),

    /// A named value was built with an empty name.
    #[error("result name must not be empty")]
    EmptyName,

    /// A tuple was built from a value that has no name.
    #[error("tuple entries must be named")]
    UnnamedTupleEntry,
}

impl From<ValueError> for ParseError {
    fn from(err: ValueError) -> Self {
        match err {
            ValueError::EmptyName => ParseError::EmptyName,
            _ => ParseError::UnnamedTupleEntry,
        }
    }
}

//! Unified error type for query compilation.

use crate::parser::ParseError;
use crate::token::Span;
use thiserror::Error;

/// Errors that can occur while compiling a query specification into SQL.
///
/// Every error is the sole outcome of a `build()` call; no partial query is
/// ever returned alongside one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The DSL input contained a character outside the language alphabet.
    #[error("unexpected character '{ch}' at byte {position}")]
    Lexical { ch: char, position: usize },

    /// The input violated the grammar. The span is present when the offending
    /// token is known.
    #[error("syntax error: {message}")]
    Syntax { message: String, span: Option<Span> },

    /// The input parsed but its meaning is invalid, e.g. an operator/value
    /// mismatch or a malformed relative-time literal.
    #[error("semantic error: {0}")]
    Semantic(String),

    /// Raw SQL validation failed: disallowed table, join, subquery or
    /// dangerous keyword.
    #[error("security violation: {0}")]
    Security(String),

    /// A builder is missing required configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn semantic(message: impl Into<String>) -> Self {
        Error::Semantic(message.into())
    }

    pub(crate) fn security(message: impl Into<String>) -> Self {
        Error::Security(message.into())
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::Syntax { message: err.message, span: err.span }
    }
}

//! The token definition for the log filter language.

/// A token is a single unit of the language, with a specific kind and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

/// The kind of a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'a> {
    // Literals
    Ident(&'a str),
    /// The content between the quotes; escape sequences are still raw.
    String(&'a str),
    /// The raw digits, optionally signed and fractional.
    Number(&'a str),
    /// A relative-time literal such as "-1h". The unit is validated by the
    /// compiler, so "-1x" still lexes as this kind.
    RelativeTime(&'a str),

    // Punctuation
    Dot,       // . field path separator
    Semicolon, // ; filter separator

    // Operators
    Eq,      // =
    NotEq,   // !=
    Like,    // ~
    NotLike, // !~
    Gt,      // >
    Lt,      // <
    Gte,     // >=
    Lte,     // <=

    // Special
    Illegal, // An illegal/unknown character
}

/// Represents a span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// The starting byte offset.
    pub start: usize,
    /// The ending byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

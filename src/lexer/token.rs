//! Token definitions

use crate::location::SourceLocation;

/// Token categories produced by the Plain lexer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Alphabetic word or identifier (`let`, `total_count`)
    Word,
    /// Numeric literal, raw text kept (`3.14`, `1_000`)
    Number,
    /// String literal including quotes and prefix (`"hi"`, `f'{x}'`)
    Str,
    /// Operator or delimiter (`(`, `==`, `,`)
    Punct,

    // Layout
    Newline,
    Indent,
    Dedent,

    Eof,
}

/// A single token. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub loc: SourceLocation,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, loc: SourceLocation) -> Self {
        Self {
            kind,
            text: text.into(),
            loc,
        }
    }

    /// Case-insensitive word comparison
    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(word)
    }

    pub fn is_punct(&self, punct: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == punct
    }

    /// True for tokens that end a logical line
    pub fn ends_line(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Newline | TokenKind::Eof | TokenKind::Dedent | TokenKind::Indent
        )
    }

    /// Lowercased text, used for phrase matching
    pub fn lower(&self) -> String {
        self.text.to_ascii_lowercase()
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TokenKind::Newline => write!(f, "end of line"),
            TokenKind::Indent => write!(f, "indent"),
            TokenKind::Dedent => write!(f, "dedent"),
            TokenKind::Eof => write!(f, "end of input"),
            _ => write!(f, "'{}'", self.text),
        }
    }
}

/// Multi-character punctuation, longest first
pub const MULTI_PUNCT: &[&str] = &[
    "**", "//", "==", "!=", "<=", ">=", "->", "+=", "-=", "*=", "/=",
];

/// Single-character punctuation
pub const SINGLE_PUNCT: &str = "()[]{},:.;+-*/%=<>@";

//! Error types for the Plain compiler

use crate::location::SourceLocation;
use thiserror::Error;

/// Main error type for the compile pipeline.
///
/// Every pipeline variant carries the position in the original Plain source.
/// `InternalGenerator` is a compiler defect, never a user mistake.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Lex error at {loc}: {message}")]
    Lex { message: String, loc: SourceLocation },

    #[error("Syntax error at {loc}: {message}{}", hint_suffix(.hint))]
    Syntax {
        message: String,
        loc: SourceLocation,
        /// Text of the token window that failed to match
        window: String,
        hint: Option<String>,
    },

    #[error("Unbound name '{name}' at {loc}{}", hint_suffix(.hint))]
    UnboundName {
        name: String,
        loc: SourceLocation,
        hint: Option<String>,
    },

    #[error("Type hint error at {loc}: '{hint}' is not a recognized type")]
    TypeHint { hint: String, loc: SourceLocation },

    #[error("Internal generator error at {loc}: {message}")]
    InternalGenerator { message: String, loc: SourceLocation },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn hint_suffix(hint: &Option<String>) -> String {
    match hint {
        Some(h) => format!(" (did you mean {h}?)"),
        None => String::new(),
    }
}

/// Coarse classification used by diagnostics and the session driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lex,
    Syntax,
    UnboundName,
    TypeHint,
    InternalGenerator,
    InvalidInput,
    Io,
}

impl CompileError {
    pub fn lex(message: impl Into<String>, loc: SourceLocation) -> Self {
        CompileError::Lex {
            message: message.into(),
            loc,
        }
    }

    pub fn syntax(message: impl Into<String>, loc: SourceLocation, window: impl Into<String>) -> Self {
        CompileError::Syntax {
            message: message.into(),
            loc,
            window: window.into(),
            hint: None,
        }
    }

    pub fn internal(message: impl Into<String>, loc: SourceLocation) -> Self {
        CompileError::InternalGenerator {
            message: message.into(),
            loc,
        }
    }

    /// Attach an advisory hint to a syntax or unbound-name error
    pub fn with_hint(mut self, new_hint: Option<String>) -> Self {
        match &mut self {
            CompileError::Syntax { hint, .. } | CompileError::UnboundName { hint, .. } => {
                *hint = new_hint;
            }
            _ => {}
        }
        self
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CompileError::Lex { .. } => ErrorKind::Lex,
            CompileError::Syntax { .. } => ErrorKind::Syntax,
            CompileError::UnboundName { .. } => ErrorKind::UnboundName,
            CompileError::TypeHint { .. } => ErrorKind::TypeHint,
            CompileError::InternalGenerator { .. } => ErrorKind::InternalGenerator,
            CompileError::InvalidInput(_) => ErrorKind::InvalidInput,
            CompileError::Io(_) => ErrorKind::Io,
        }
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            CompileError::Lex { loc, .. }
            | CompileError::Syntax { loc, .. }
            | CompileError::UnboundName { loc, .. }
            | CompileError::TypeHint { loc, .. }
            | CompileError::InternalGenerator { loc, .. } => Some(loc),
            CompileError::InvalidInput(_) | CompileError::Io(_) => None,
        }
    }

    /// True for compiler defects as opposed to problems in the user's source
    pub fn is_internal(&self) -> bool {
        matches!(self, CompileError::InternalGenerator { .. })
    }

    /// Stamp a file name onto the error's location
    pub fn in_file(mut self, file: &str) -> Self {
        match &mut self {
            CompileError::Lex { loc, .. }
            | CompileError::Syntax { loc, .. }
            | CompileError::UnboundName { loc, .. }
            | CompileError::TypeHint { loc, .. }
            | CompileError::InternalGenerator { loc, .. } => {
                loc.file = Some(file.to_string());
            }
            _ => {}
        }
        self
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;

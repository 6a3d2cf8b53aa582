//! PlainDiagnostic - compile error reporting for the CLI and tools
//!
//! Compilation stops at the first error, so a failed unit produces exactly one
//! diagnostic: a stable code, the phase that failed, a span, and the hint and
//! source window the error carried.

use crate::error::CompileError;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticSpan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub line: usize,
    pub column: usize,
    pub end_column: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlainDiagnostic {
    pub code: &'static str,
    pub phase: &'static str,
    pub message: String,
    pub span: DiagnosticSpan,
    /// Closest known phrase or name, already quoted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Source text around a syntax error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<String>,
}

impl PlainDiagnostic {
    pub fn from_error(err: &CompileError, file: Option<&Path>) -> Self {
        let (message, len, phase, hint, window) = match err {
            CompileError::Lex { message, .. } => (message.clone(), 1, "lex", None, None),
            CompileError::Syntax {
                message,
                window,
                hint,
                ..
            } => (
                message.clone(),
                window.len(),
                "parse",
                hint.clone(),
                Some(window.clone()),
            ),
            CompileError::UnboundName { name, hint, .. } => (
                format!("Unbound name '{name}'"),
                name.len(),
                "semantic",
                hint.clone(),
                None,
            ),
            CompileError::TypeHint { hint, .. } => (
                format!("'{hint}' is not a recognized type"),
                hint.len(),
                "semantic",
                None,
                None,
            ),
            CompileError::InternalGenerator { message, .. } => (
                format!("internal compiler error: {message}"),
                1,
                "generate",
                None,
                None,
            ),
            CompileError::Io(_) | CompileError::InvalidInput(_) => (err.to_string(), 0, "input", None, None),
        };

        let (line, column) = err.location().map_or((1, 1), |l| (l.line.max(1), l.column.max(1)));
        let file = err
            .location()
            .and_then(|l| l.file.clone())
            .or_else(|| file.map(|p| p.display().to_string()));

        Self {
            code: code_for(err),
            phase,
            message,
            span: DiagnosticSpan {
                file,
                line,
                column,
                end_column: column + len.saturating_sub(1),
            },
            hint,
            window: window.filter(|w| !w.is_empty()),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn to_text(&self) -> String {
        let file = self.span.file.as_deref().unwrap_or("<input>");
        let mut out = format!(
            "[{}] {}:{}:{} {}\n",
            self.code, file, self.span.line, self.span.column, self.message
        );
        if let Some(window) = &self.window {
            out.push_str(&format!("    near: {window}\n"));
        }
        if let Some(hint) = &self.hint {
            out.push_str(&format!("    hint: did you mean {hint}?\n"));
        }
        out
    }
}

/// Stable code for an error, e.g. `PLN-SYNTAX-ERROR`
pub fn code_for(err: &CompileError) -> &'static str {
    match err {
        CompileError::Lex { .. } => "PLN-LEX-ERROR",
        CompileError::Syntax { .. } => "PLN-SYNTAX-ERROR",
        CompileError::UnboundName { .. } => "PLN-UNBOUND-NAME",
        CompileError::TypeHint { .. } => "PLN-TYPE-HINT",
        CompileError::InternalGenerator { .. } => "PLN-INTERNAL",
        CompileError::Io(_) => "PLN-IO-ERROR",
        CompileError::InvalidInput(_) => "PLN-INVALID-INPUT",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::SourceLocation;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_syntax_error_diagnostic() {
        let err = CompileError::syntax("expected an expression", SourceLocation::new(2, 7), "let x be")
            .with_hint(Some("'let'".to_string()));
        let diag = PlainDiagnostic::from_error(&err, Some(Path::new("main.pln")));

        assert_eq!(diag.code, "PLN-SYNTAX-ERROR");
        assert_eq!(diag.phase, "parse");
        assert_eq!(diag.span.line, 2);
        assert_eq!(diag.span.end_column, 14);
        assert_eq!(
            diag.to_text(),
            "[PLN-SYNTAX-ERROR] main.pln:2:7 expected an expression\n    near: let x be\n    hint: did you mean 'let'?\n"
        );
    }

    #[test]
    fn test_codes_are_stable() {
        let loc = SourceLocation::new(1, 1);
        let cases = [
            (CompileError::lex("bad", loc.clone()), "PLN-LEX-ERROR"),
            (
                CompileError::TypeHint {
                    hint: "widget".to_string(),
                    loc: loc.clone(),
                },
                "PLN-TYPE-HINT",
            ),
            (CompileError::internal("bad node", loc), "PLN-INTERNAL"),
            (CompileError::InvalidInput("empty".to_string()), "PLN-INVALID-INPUT"),
        ];
        for (err, code) in cases {
            assert_eq!(code_for(&err), code);
        }
    }

    #[test]
    fn test_json_output() {
        let err = CompileError::UnboundName {
            name: "totl".to_string(),
            loc: SourceLocation::new(3, 5),
            hint: Some("'total'".to_string()),
        };
        let json = PlainDiagnostic::from_error(&err, None).to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["code"], "PLN-UNBOUND-NAME");
        assert_eq!(value["span"]["column"], 5);
        assert_eq!(value["span"]["end_column"], 8);
        assert_eq!(value["hint"], "'total'");
        assert!(value.get("window").is_none());
        assert!(value["span"].get("file").is_none());
    }

    #[test]
    fn test_file_from_error_location_wins() {
        let err = CompileError::lex("bad", SourceLocation::new(1, 2)).in_file("inner.pln");
        let diag = PlainDiagnostic::from_error(&err, Some(Path::new("outer.pln")));
        assert_eq!(diag.span.file.as_deref(), Some("inner.pln"));
    }

    #[test]
    fn test_input_errors_have_no_extent() {
        let diag = PlainDiagnostic::from_error(&CompileError::InvalidInput("empty source".to_string()), None);
        assert_eq!(diag.phase, "input");
        assert_eq!((diag.span.line, diag.span.column, diag.span.end_column), (1, 1, 1));
        assert_eq!(diag.hint, None);
    }
}

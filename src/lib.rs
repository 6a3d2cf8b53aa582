//! Plain - natural-English language compiler targeting Python
//!
//! # Overview
//! Plain source is lexed, parsed through phrase rule tables, resolved against
//! scopes and the auto-import table, and rendered as Python with a line map
//! back to the original text. REPL use goes through [`Session`], which
//! compiles each fragment against everything committed before it.

pub mod diagnostics;
pub mod emitter;
pub mod error;
pub mod grammar;
pub mod import_table;
pub mod lexer;
pub mod location;
pub mod parser;
pub mod runner;
pub mod semantic;
pub mod session;
pub mod suggest;

pub use emitter::{LineMap, LineMapping};
pub use error::{CompileError, ErrorKind, Result};
pub use session::{FragmentStage, Session};

use serde::Serialize;
use std::path::Path;

/// File suffix accepted by [`compile_file`]
pub const SOURCE_EXTENSION: &str = "pln";

/// Generator settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Spaces per indentation level in the generated Python
    pub indent_width: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            indent_width: emitter::DEFAULT_INDENT_WIDTH,
        }
    }
}

/// Python source plus the map back to Plain lines
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledUnit {
    pub python: String,
    pub line_map: LineMap,
}

/// Compile a whole Plain program
pub fn compile(source: &str) -> Result<CompiledUnit> {
    compile_with_options(source, &CompileOptions::default())
}

pub fn compile_with_options(source: &str, options: &CompileOptions) -> Result<CompiledUnit> {
    // 1. Lex and parse
    let program = parser::parse(source)?;

    // 2. Resolve names, imports and hints
    let analysis = semantic::analyze(program)?;

    // 3. Emit Python
    let (python, line_map) = emitter::PythonEmitter::new(options.indent_width)
        .emit_unit(&analysis.program, &analysis.new_imports)?;

    Ok(CompiledUnit { python, line_map })
}

/// Compile one REPL fragment against a session; the Python is only the delta
pub fn compile_incremental(session: &mut Session, fragment: &str) -> Result<CompiledUnit> {
    session.submit(fragment)
}

/// Compile Plain source, returning a diagnostic on failure
pub fn compile_with_diagnostics(
    source: &str,
    file: Option<&Path>,
) -> std::result::Result<CompiledUnit, diagnostics::PlainDiagnostic> {
    compile(source).map_err(|err| diagnostics::PlainDiagnostic::from_error(&err, file))
}

/// Compile a `.pln` file
pub fn compile_file(path: &Path) -> Result<CompiledUnit> {
    let source = read_source(path)?;
    let name = path.display().to_string();
    compile(&source).map_err(|err| err.in_file(&name))
}

/// Read a `.pln` file, rejecting other suffixes and empty files
pub fn read_source(path: &Path) -> Result<String> {
    let has_suffix = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(SOURCE_EXTENSION));
    if !has_suffix {
        return Err(CompileError::InvalidInput(format!(
            "{} is not a .{} file",
            path.display(),
            SOURCE_EXTENSION
        )));
    }

    let source = std::fs::read_to_string(path)?;
    if source.trim().is_empty() {
        return Err(CompileError::InvalidInput(format!("{} is empty", path.display())));
    }
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_compile_simple_assignment() {
        let unit = compile("let x be 5").unwrap();
        assert_eq!(unit.python, "x = 5\n");
        assert_eq!(unit.line_map.source_line(1), Some(1));
    }

    #[test]
    fn test_compile_with_indent_option() {
        let options = CompileOptions { indent_width: 2 };
        let unit = compile_with_options("repeat 2 times\n    say \"hi\"", &options).unwrap();
        assert_eq!(unit.python, "for _ in range(2):\n  print(\"hi\")\n");
    }

    #[test]
    fn test_compile_with_diagnostics_reports_code() {
        let diag = compile_with_diagnostics("let x be", None).unwrap_err();
        assert_eq!(diag.code, "PLN-SYNTAX-ERROR");
    }

    #[test]
    fn test_read_source_checks_suffix() {
        let err = read_source(Path::new("program.py")).unwrap_err();
        assert!(matches!(err, CompileError::InvalidInput(_)));
    }

    #[test]
    fn test_compile_incremental_uses_session() {
        let mut session = Session::new();
        compile_incremental(&mut session, "let x be 1").unwrap();
        let unit = compile_incremental(&mut session, "say x").unwrap();
        assert_eq!(unit.python, "print(x)\n");
    }
}

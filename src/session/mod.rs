//! REPL session state
//!
//! A [`Session`] owns everything that outlives one fragment: the global scope,
//! the imports already emitted, the accepted statements and the transcript of
//! generated Python. Each fragment is analysed against a copy of that state
//! and the copy is committed only once Python has been generated, so a failed
//! fragment leaves the session exactly as it was.

use crate::emitter::{LineMap, PythonEmitter};
use crate::error::Result;
use crate::lexer::tokenize;
use crate::parser::{parse_tokens, Stmt};
use crate::semantic::{analyze_with, GlobalState};
use crate::{CompileOptions, CompiledUnit};
use uuid::Uuid;

/// Progress of one fragment through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentStage {
    Received,
    Lexed,
    Parsed,
    Analyzed,
    Generated,
    Committed,
    Rejected,
}

impl FragmentStage {
    /// Legal transitions; `Rejected` and `Committed` are terminal
    pub fn can_advance_to(self, next: FragmentStage) -> bool {
        use FragmentStage::*;
        matches!(
            (self, next),
            (Received, Lexed)
                | (Lexed, Parsed)
                | (Parsed, Analyzed)
                | (Analyzed, Generated)
                | (Generated, Committed)
                | (Received | Lexed | Parsed | Analyzed, Rejected)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, FragmentStage::Committed | FragmentStage::Rejected)
    }
}

/// Outcome of one submitted fragment
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentRecord {
    pub source: String,
    /// `Committed` or `Rejected`
    pub stage: FragmentStage,
    /// Last stage reached before a rejection
    pub rejected_after: Option<FragmentStage>,
    pub error: Option<String>,
}

/// A committed fragment's Python, as it appears in the transcript
#[derive(Debug, Clone, PartialEq)]
struct TranscriptEntry {
    source: String,
    python: String,
    line_map: LineMap,
}

/// Stage tracker for the fragment currently in flight
struct FragmentRun {
    stage: FragmentStage,
}

impl FragmentRun {
    fn new() -> Self {
        Self {
            stage: FragmentStage::Received,
        }
    }

    fn advance(&mut self, next: FragmentStage) {
        debug_assert!(self.stage.can_advance_to(next), "{:?} -> {:?}", self.stage, next);
        self.stage = next;
    }
}

/// Persistent state of one REPL
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    options: CompileOptions,
    globals: GlobalState,
    statements: Vec<Stmt>,
    transcript: Vec<TranscriptEntry>,
    history: Vec<FragmentRecord>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_options(CompileOptions::default())
    }

    pub fn with_options(options: CompileOptions) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            options,
            globals: GlobalState::default(),
            statements: Vec::new(),
            transcript: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Compile one fragment against the session; commit only on success
    pub fn submit(&mut self, fragment: &str) -> Result<CompiledUnit> {
        let mut run = FragmentRun::new();
        match self.run_pipeline(fragment, &mut run) {
            Ok(unit) => Ok(unit),
            Err(err) => {
                let rejected_after = run.stage;
                run.advance(FragmentStage::Rejected);
                self.history.push(FragmentRecord {
                    source: fragment.to_string(),
                    stage: run.stage,
                    rejected_after: Some(rejected_after),
                    error: Some(err.to_string()),
                });
                Err(err)
            }
        }
    }

    fn run_pipeline(&mut self, fragment: &str, run: &mut FragmentRun) -> Result<CompiledUnit> {
        let tokens = tokenize(fragment)?;
        run.advance(FragmentStage::Lexed);

        let program = parse_tokens(tokens)?;
        run.advance(FragmentStage::Parsed);

        // Analysis works on a copy; `self.globals` is untouched until commit
        let analysis = analyze_with(program, &self.globals)?;
        run.advance(FragmentStage::Analyzed);

        let (python, line_map) = PythonEmitter::new(self.options.indent_width)
            .emit_unit(&analysis.program, &analysis.new_imports)?;
        run.advance(FragmentStage::Generated);

        self.globals = analysis.globals;
        self.statements.extend(analysis.program.statements);
        self.transcript.push(TranscriptEntry {
            source: fragment.to_string(),
            python: python.clone(),
            line_map: line_map.clone(),
        });
        run.advance(FragmentStage::Committed);
        self.history.push(FragmentRecord {
            source: fragment.to_string(),
            stage: run.stage,
            rejected_after: None,
            error: None,
        });

        Ok(CompiledUnit { python, line_map })
    }

    /// Top-level statements of every committed fragment, analysed
    pub fn statements(&self) -> &[Stmt] {
        &self.statements
    }

    pub fn globals(&self) -> &GlobalState {
        &self.globals
    }

    /// Import lines emitted so far, in first-required order
    pub fn imports(&self) -> &[String] {
        self.globals.imports.lines()
    }

    pub fn history(&self) -> &[FragmentRecord] {
        &self.history
    }

    /// Number of committed fragments
    pub fn len(&self) -> usize {
        self.transcript.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transcript.is_empty()
    }

    /// Plain source of every committed fragment, one after another
    pub fn source(&self) -> String {
        self.transcript.iter().map(|e| ensure_newline(&e.source)).collect()
    }

    /// Generated Python of every committed fragment, one after another
    pub fn transcript(&self) -> String {
        self.transcript.iter().map(|e| e.python.as_str()).collect()
    }

    /// Line map from [`Session::transcript`] lines to [`Session::source`] lines
    pub fn transcript_line_map(&self) -> LineMap {
        let mut map = LineMap::new();
        let mut python_lines = 0;
        let mut source_lines = 0;
        for entry in &self.transcript {
            map.append(&entry.line_map.shifted(python_lines, source_lines));
            python_lines += entry.python.lines().count();
            source_lines += ensure_newline(&entry.source).lines().count();
        }
        map
    }

    /// Forget every binding, import and fragment; the id is kept
    pub fn reset(&mut self) {
        self.globals = GlobalState::default();
        self.statements.clear();
        self.transcript.clear();
        self.history.clear();
    }
}

fn ensure_newline(text: &str) -> String {
    if text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{text}\n")
    }
}

//! PythonRunner - hands generated code to a Python interpreter
//!
//! Used by the CLI only. The compiler itself never starts a process. Whole
//! programs run in a fresh `python -`; REPL sessions keep one [`ReplWorker`]
//! alive for their whole life.

pub mod protocol;
mod worker;

pub use protocol::FragmentOutcome;
pub use worker::{FragmentOutput, ReplWorker};

use crate::emitter::LineMap;
use anyhow::{bail, Context, Result};
use std::io::Write;
use std::process::{Command, Stdio};

/// Interpreters tried in order
const INTERPRETERS: &[&str] = &["python3", "python"];

/// File name Python gives a script read from stdin
const STDIN_FILE: &str = "<stdin>";

const FRAME_FILE: &str = "File \"";
const FRAME_LINE: &str = "\", line ";

/// Exit status and captured streams of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    /// `None` when the process was killed by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

pub struct PythonRunner {
    interpreter: String,
}

impl PythonRunner {
    /// First interpreter on PATH that answers `--version`
    pub fn detect() -> Result<Self> {
        for candidate in INTERPRETERS {
            let found = Command::new(candidate)
                .arg("--version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|s| s.success())
                .unwrap_or(false);
            if found {
                return Ok(Self::with_interpreter(candidate));
            }
        }
        bail!("no Python interpreter found (tried {})", INTERPRETERS.join(", "))
    }

    pub fn with_interpreter(interpreter: &str) -> Self {
        Self {
            interpreter: interpreter.to_string(),
        }
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    /// Run a whole program, with traceback lines pointing at the Plain source
    pub fn run(&self, python: &str, line_map: &LineMap) -> Result<RunOutput> {
        let mut output = self.execute(python)?;
        output.stderr = rewrite_traceback(&output.stderr, line_map);
        Ok(output)
    }

    fn execute(&self, source: &str) -> Result<RunOutput> {
        let mut child = Command::new(&self.interpreter)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to start {}", self.interpreter))?;

        {
            let stdin = child.stdin.as_mut().context("failed to open interpreter stdin")?;
            stdin.write_all(source.as_bytes())?;
        }
        drop(child.stdin.take());

        let output = child
            .wait_with_output()
            .with_context(|| format!("failed to wait for {}", self.interpreter))?;
        Ok(RunOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Rewrite `File "<stdin>", line N` frames to Plain line numbers
///
/// Frames on unmapped lines, or from other files, are left as they are.
pub fn rewrite_traceback(stderr: &str, line_map: &LineMap) -> String {
    rewrite_frames(stderr, |file, line| {
        if file == STDIN_FILE {
            line_map.source_line(line)
        } else {
            None
        }
    })
}

/// Rewrite every `File "F", line N` frame for which `resolve(F, N)` gives a
/// Plain line
pub(crate) fn rewrite_frames(stderr: &str, resolve: impl Fn(&str, usize) -> Option<usize>) -> String {
    let mut out = String::with_capacity(stderr.len());
    for line in stderr.split_inclusive('\n') {
        out.push_str(&rewrite_frame(line, &resolve).unwrap_or_else(|| line.to_string()));
    }
    out
}

fn rewrite_frame(line: &str, resolve: &impl Fn(&str, usize) -> Option<usize>) -> Option<String> {
    let start = line.find(FRAME_FILE)?;
    let file_at = start + FRAME_FILE.len();
    let file_len = line[file_at..].find(FRAME_LINE)?;
    let file = &line[file_at..file_at + file_len];

    let digits_at = file_at + file_len + FRAME_LINE.len();
    let digits: String = line[digits_at..].chars().take_while(char::is_ascii_digit).collect();
    let source = resolve(file, digits.parse().ok()?)?;

    let rest = &line[digits_at + digits.len()..];
    Some(format!("{}File \"<plain>\", line {}{}", &line[..start], source, rest))
}

//! ReplWorker - one resident Python interpreter per REPL session
//!
//! Only the new fragment is sent each time. Earlier fragments are never
//! replayed, so a fragment that raised leaves the namespace as it was at the
//! point of failure and later fragments keep running against it.

use super::protocol::{FragmentOutcome, Request, Response};
use super::{rewrite_frames, PythonRunner};
use crate::emitter::LineMap;
use anyhow::{bail, Context, Result};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

/// Embedded worker loop
const WORKER_CODE: &str = include_str!("python/worker.py");

/// Traceback file name of the fragment with index `n`
fn fragment_file(n: usize) -> String {
    format!("<fragment-{n}>")
}

/// Captured streams and outcome of one fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentOutput {
    /// Output not already handed to the input handler
    pub stdout: String,
    /// Traceback frames point at Plain lines
    pub stderr: String,
    pub outcome: FragmentOutcome,
}

pub struct ReplWorker {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    request_id: u64,
    session_id: String,
    /// Line maps of executed fragments, by fragment index
    fragments: Vec<LineMap>,
}

impl ReplWorker {
    /// Start the worker under the runner's interpreter
    pub fn spawn(runner: &PythonRunner, session_id: &str) -> Result<Self> {
        let mut process = Command::new(runner.interpreter())
            .args(["-u", "-c", WORKER_CODE])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("failed to start {}", runner.interpreter()))?;

        let stdin = process.stdin.take().context("failed to open worker stdin")?;
        let stdout = process.stdout.take().context("failed to open worker stdout")?;
        Ok(Self {
            process,
            stdin,
            stdout: BufReader::new(stdout),
            request_id: 0,
            session_id: session_id.to_string(),
            fragments: Vec::new(),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn next_req_id(&mut self) -> String {
        self.request_id += 1;
        self.request_id.to_string()
    }

    fn send(&mut self, request: &Request) -> Result<()> {
        let json = serde_json::to_string(request)?;
        writeln!(self.stdin, "{json}")?;
        self.stdin.flush()?;
        Ok(())
    }

    /// Next protocol message. Lines that are not protocol JSON were written
    /// past the capture (`os.write(1, ...)`) and are collected into `stray`.
    fn receive(&mut self, stray: &mut String) -> Result<Response> {
        loop {
            let mut line = String::new();
            if self.stdout.read_line(&mut line)? == 0 {
                bail!("python worker exited unexpectedly");
            }
            match serde_json::from_str::<Response>(line.trim_end()) {
                Ok(response) => return Ok(response),
                Err(_) => stray.push_str(&line),
            }
        }
    }

    /// Run one compiled fragment. `on_input` gets the output produced so far
    /// and the prompt, and returns the line `input()` reads (`None` for EOF).
    pub fn execute(
        &mut self,
        python: &str,
        line_map: &LineMap,
        on_input: &mut dyn FnMut(&str, &str) -> Option<String>,
    ) -> Result<FragmentOutput> {
        let req_id = self.next_req_id();
        let filename = fragment_file(self.fragments.len());
        self.fragments.push(line_map.clone());
        self.send(&Request::Exec {
            session_id: self.session_id.clone(),
            req_id: req_id.clone(),
            filename,
            code: python.to_string(),
        })?;

        let mut stdout = String::new();
        loop {
            match self.receive(&mut stdout)? {
                Response::Input { prompt, stdout: pending } => {
                    stdout.push_str(&pending);
                    let value = on_input(&std::mem::take(&mut stdout), &prompt);
                    self.send(&Request::InputReply { value })?;
                }
                Response::Done {
                    req_id: answered,
                    stdout: rest,
                    stderr,
                    outcome,
                } => {
                    if answered.as_deref() != Some(req_id.as_str()) {
                        bail!("python worker answered request {answered:?}, expected {req_id}");
                    }
                    stdout.push_str(&rest);
                    return Ok(FragmentOutput {
                        stdout,
                        stderr: self.rewrite(&stderr),
                        outcome,
                    });
                }
            }
        }
    }

    /// Clear the namespace; the process keeps running
    pub fn reset(&mut self) -> Result<()> {
        let req_id = self.next_req_id();
        self.send(&Request::Reset {
            session_id: self.session_id.clone(),
            req_id,
        })?;
        let mut stray = String::new();
        match self.receive(&mut stray)? {
            Response::Done { .. } => Ok(()),
            Response::Input { .. } => bail!("python worker asked for input during reset"),
        }
    }

    /// Frames of any earlier fragment map through that fragment's line map
    fn rewrite(&self, stderr: &str) -> String {
        rewrite_frames(stderr, |file, line| {
            let index: usize = file.strip_prefix("<fragment-")?.strip_suffix('>')?.parse().ok()?;
            self.fragments.get(index)?.source_line(line)
        })
    }
}

impl Drop for ReplWorker {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

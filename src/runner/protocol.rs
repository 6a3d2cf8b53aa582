//! NDJSON messages between the REPL and its resident Python worker

use serde::{Deserialize, Serialize};

// --- Requests ---

#[derive(Debug, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Request {
    /// Run one fragment in the session namespace
    Exec {
        session_id: String,
        req_id: String,
        /// Name the fragment's frames carry in tracebacks
        filename: String,
        code: String,
    },
    /// Answer to an `input` message; `None` means end of input
    InputReply { value: Option<String> },
    /// Drop every binding in the session namespace
    Reset { session_id: String, req_id: String },
}

// --- Responses ---

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Response {
    /// The fragment called `input()`; `stdout` is its output so far
    Input { prompt: String, stdout: String },
    Done {
        req_id: Option<String>,
        stdout: String,
        stderr: String,
        outcome: FragmentOutcome,
    },
}

/// How a fragment ended
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FragmentOutcome {
    Completed,
    /// An exception escaped; the traceback is on stderr
    Raised { error: String },
    /// `sys.exit` was called
    Exited { code: i32 },
}

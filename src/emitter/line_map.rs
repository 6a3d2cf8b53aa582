//! Generated-line to Plain-line mapping
//!
//! Handed to whatever runs the generated Python so tracebacks can point at
//! the Plain source. Import lines and blank separators have no entry.

use serde::{Deserialize, Serialize};

/// One mapped line; both numbers are 1-indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineMapping {
    pub generated: usize,
    pub source: usize,
}

/// Ordered generated line -> source line table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineMap {
    entries: Vec<LineMapping>,
}

impl LineMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a mapping; lines must be recorded in increasing order
    pub fn record(&mut self, generated: usize, source: usize) {
        if source == 0 {
            return;
        }
        debug_assert!(self.entries.last().map_or(true, |e| e.generated < generated));
        self.entries.push(LineMapping { generated, source });
    }

    /// Plain line for a generated line, if the line came from a statement
    pub fn source_line(&self, generated: usize) -> Option<usize> {
        self.entries
            .binary_search_by_key(&generated, |e| e.generated)
            .ok()
            .map(|i| self.entries[i].source)
    }

    pub fn entries(&self) -> &[LineMapping] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Same map placed after `generated` Python lines and `source` Plain lines
    pub fn shifted(&self, generated: usize, source: usize) -> LineMap {
        LineMap {
            entries: self
                .entries
                .iter()
                .map(|e| LineMapping {
                    generated: e.generated + generated,
                    source: e.source + source,
                })
                .collect(),
        }
    }

    /// Append a map whose generated lines all follow ours
    pub fn append(&mut self, other: &LineMap) {
        self.entries.extend_from_slice(&other.entries);
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

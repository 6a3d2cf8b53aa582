//! Source Location Definitions
//!
//! Position information carried by tokens, AST nodes and errors so that every
//! stage of the pipeline can point back at the original Plain source.

use serde::Serialize;

/// Position in Plain source (shared by every compile stage)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SourceLocation {
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
    /// File name, when compiling from a file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self {
            line,
            column,
            file: None,
        }
    }

    pub fn with_file(line: usize, column: usize, file: String) -> Self {
        Self {
            line,
            column,
            file: Some(file),
        }
    }

    /// Location for nodes synthesized by the compiler
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_known(&self) -> bool {
        self.line > 0
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.is_known() {
            return write!(f, "unknown position");
        }

        if let Some(ref file) = self.file {
            write!(f, "{}:{}:{}", file, self.line, self.column)
        } else {
            write!(f, "line {}, column {}", self.line, self.column)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_location_new() {
        let loc = SourceLocation::new(10, 5);
        assert_eq!(loc.line, 10);
        assert_eq!(loc.column, 5);
        assert!(loc.file.is_none());
    }

    #[test]
    fn test_source_location_display() {
        let loc = SourceLocation::new(10, 1);
        assert_eq!(format!("{}", loc), "line 10, column 1");

        let loc_with_file = SourceLocation::with_file(15, 3, "main.pln".to_string());
        assert_eq!(format!("{}", loc_with_file), "main.pln:15:3");
    }

    #[test]
    fn test_source_location_unknown() {
        let loc = SourceLocation::unknown();
        assert!(!loc.is_known());
        assert_eq!(format!("{}", loc), "unknown position");
    }
}

//! Source location tracking for error reporting
//!
//! ILOC input is line-oriented, so a location is just a 1-based line and
//! column pair.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A location in the input (line and column are 1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Location carrying only a line number (column unknown)
    pub fn line(line: u32) -> Self {
        Self { line, column: 0 }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.column == 0 {
            write!(f, "line {}", self.line)
        } else {
            write!(f, "line {}, column {}", self.line, self.column)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_column() {
        let loc = SourceLocation::new(42, 10);
        assert_eq!(format!("{}", loc), "line 42, column 10");
    }

    #[test]
    fn test_display_line_only() {
        let loc = SourceLocation::line(7);
        assert_eq!(format!("{}", loc), "line 7");
    }
}

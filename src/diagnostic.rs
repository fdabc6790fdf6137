//! Diagnostics reported by rules and by the engine itself

use crate::position::SourceLocation;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::PathBuf;

/// Severity level for diagnostics
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    #[default]
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" | "hint" | "note" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" | "err" => Ok(Severity::Error),
            _ => Err(()),
        }
    }
}

/// How safe a fix is to apply without review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixSafety {
    /// Preserves meaning; applied by `--fix`
    #[default]
    Safe,
    /// May change the cascade; needs `--unsafe-fixes`
    Unsafe,
    /// Shown, never applied
    Display,
}

impl std::fmt::Display for FixSafety {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FixSafety::Safe => write!(f, "safe"),
            FixSafety::Unsafe => write!(f, "unsafe"),
            FixSafety::Display => write!(f, "display"),
        }
    }
}

/// Where a diagnostic points
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
    /// Length of the highlighted region on the first line
    pub length: usize,
}

impl Location {
    pub fn new(file: PathBuf, line: usize, column: usize) -> Self {
        Self {
            file,
            line,
            column,
            end_line: line,
            end_column: column,
            length: 0,
        }
    }

    /// Location covering a node or comment
    pub fn from_source(file: PathBuf, loc: &SourceLocation) -> Self {
        let length = if loc.spans_lines() {
            0
        } else {
            loc.end.column.saturating_sub(loc.start.column)
        };
        Self {
            file,
            line: loc.start.line,
            column: loc.start.column,
            end_line: loc.end.line,
            end_column: loc.end.column,
            length,
        }
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }
}

/// A text edit that resolves a diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fix {
    pub description: String,
    pub replacement: String,
    /// Byte offset where the replaced text starts
    pub start_offset: usize,
    /// Byte offset just past the replaced text
    pub end_offset: usize,
    #[serde(default)]
    pub safety: FixSafety,
}

impl Fix {
    pub fn safe(description: &str, range: Range<usize>, replacement: &str) -> Self {
        Self::with_safety(description, range, replacement, FixSafety::Safe)
    }

    pub fn unsafe_fix(description: &str, range: Range<usize>, replacement: &str) -> Self {
        Self::with_safety(description, range, replacement, FixSafety::Unsafe)
    }

    pub fn with_safety(
        description: &str,
        range: Range<usize>,
        replacement: &str,
        safety: FixSafety,
    ) -> Self {
        Self {
            description: description.to_string(),
            replacement: replacement.to_string(),
            start_offset: range.start,
            end_offset: range.end,
            safety,
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.start_offset..self.end_offset
    }

    pub fn is_safe(&self) -> bool {
        self.safety == FixSafety::Safe
    }

    pub fn is_unsafe(&self) -> bool {
        self.safety == FixSafety::Unsafe
    }
}

/// A lint diagnostic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Rule that produced it, or an engine id such as `parse-error`
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    pub location: Location,
    pub source_line: Option<String>,
    #[serde(default)]
    pub context_before: Vec<(usize, String)>,
    #[serde(default)]
    pub context_after: Vec<(usize, String)>,
    pub help: Option<String>,
    pub fix: Option<Fix>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(rule_id: &str, severity: Severity, message: &str, location: Location) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            severity,
            message: message.to_string(),
            location,
            source_line: None,
            context_before: Vec::new(),
            context_after: Vec::new(),
            help: None,
            fix: None,
            notes: Vec::new(),
        }
    }

    pub fn with_source_line(mut self, line: &str) -> Self {
        self.source_line = Some(line.to_string());
        self
    }

    /// Attach up to `context_count` lines around the diagnostic's line
    pub fn with_context(mut self, source_lines: &[&str], context_count: usize) -> Self {
        if context_count == 0 || self.location.line == 0 {
            return self;
        }

        let line_num = self.location.line;

        let start = line_num.saturating_sub(context_count + 1);
        let end = line_num.saturating_sub(1);
        for (i, line) in source_lines
            .iter()
            .enumerate()
            .skip(start)
            .take(end.saturating_sub(start))
        {
            self.context_before.push((i + 1, line.to_string()));
        }

        let end = (line_num + context_count).min(source_lines.len());
        for (i, line) in source_lines
            .iter()
            .enumerate()
            .skip(line_num)
            .take(end.saturating_sub(line_num))
        {
            self.context_after.push((i + 1, line.to_string()));
        }

        self
    }

    pub fn with_help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    pub fn with_fix(mut self, fix: Fix) -> Self {
        self.fix = Some(fix);
        self
    }

    pub fn with_note(mut self, note: &str) -> Self {
        self.notes.push(note.to_string());
        self
    }

    pub fn has_fix(&self) -> bool {
        self.fix.is_some()
    }

    pub fn has_safe_fix(&self) -> bool {
        self.fix.as_ref().is_some_and(|f| f.is_safe())
    }

    pub fn has_unsafe_fix(&self) -> bool {
        self.fix.as_ref().is_some_and(|f| f.is_unsafe())
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn test_severity_from_str() {
        assert_eq!("error".parse::<Severity>(), Ok(Severity::Error));
        assert_eq!("warn".parse::<Severity>(), Ok(Severity::Warning));
        assert_eq!("hint".parse::<Severity>(), Ok(Severity::Info));
        assert!("off".parse::<Severity>().is_err());
    }

    #[test]
    fn test_location_from_source() {
        let at = |line, column, offset| Position {
            line,
            column,
            offset,
        };
        let single = SourceLocation::new(at(2, 3, 10), at(2, 8, 15));
        let loc = Location::from_source(PathBuf::from("a.css"), &single);
        assert_eq!((loc.line, loc.column, loc.length), (2, 3, 5));
        assert_eq!((loc.end_line, loc.end_column), (2, 8));

        let multi = SourceLocation::new(at(1, 3, 2), at(3, 1, 20));
        let loc = Location::from_source(PathBuf::from("a.css"), &multi);
        assert_eq!(loc.length, 0);
        assert_eq!(loc.end_line, 3);
    }

    #[test]
    fn test_diagnostic_with_fix() {
        let loc = Location::new(PathBuf::from("a.css"), 1, 1);
        let diag = Diagnostic::new("no-important", Severity::Warning, "Unexpected !important", loc)
            .with_source_line("a { color: red !important }")
            .with_help("Avoid !important")
            .with_fix(Fix::safe("Remove !important", 14..25, ""));

        assert!(diag.has_safe_fix());
        assert!(!diag.has_unsafe_fix());
        assert_eq!(diag.fix.as_ref().unwrap().range(), 14..25);
        assert!(diag.is_warning());
    }

    #[test]
    fn test_context_lines() {
        let lines = ["a {", "  color: red;", "}", ""];
        let loc = Location::new(PathBuf::from("a.css"), 2, 3);
        let diag = Diagnostic::new("x", Severity::Info, "m", loc).with_context(&lines, 1);
        assert_eq!(diag.context_before, vec![(1, "a {".to_string())]);
        assert_eq!(diag.context_after, vec![(3, "}".to_string())]);
    }
}

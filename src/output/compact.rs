//! Compact output formatter
//!
//! One line per diagnostic, for editors and scripts:
//! `file:line:col: severity [rule] message`

use super::OutputFormatter;
use crate::diagnostic::Diagnostic;
use crate::engine::LintResult;

/// Compact one-line-per-diagnostic formatter
pub struct CompactFormatter {
    pub show_severity: bool,
    pub show_rule: bool,
}

impl CompactFormatter {
    pub fn new() -> Self {
        Self {
            show_severity: true,
            show_rule: true,
        }
    }

    pub fn without_severity(mut self) -> Self {
        self.show_severity = false;
        self
    }

    pub fn without_rule(mut self) -> Self {
        self.show_rule = false;
        self
    }
}

impl Default for CompactFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for CompactFormatter {
    fn format(&self, result: &LintResult) -> String {
        let mut output = String::new();

        for diag in &result.diagnostics {
            output.push_str(&self.format_diagnostic(diag));
            output.push('\n');
        }

        output
    }

    fn format_diagnostic(&self, diagnostic: &Diagnostic) -> String {
        let mut line = format!(
            "{}:{}:{}:",
            diagnostic.location.file.display(),
            diagnostic.location.line,
            diagnostic.location.column
        );

        if self.show_severity {
            line.push_str(&format!(" {}", diagnostic.severity));
        }
        if self.show_rule {
            line.push_str(&format!(" [{}]", diagnostic.rule_id));
        }
        line.push(' ');
        line.push_str(&diagnostic.message);

        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::{Location, Severity};
    use std::path::PathBuf;

    fn diag(rule: &str, severity: Severity, message: &str, line: usize) -> Diagnostic {
        Diagnostic::new(
            rule,
            severity,
            message,
            Location::new(PathBuf::from("site.css"), line, 5),
        )
    }

    #[test]
    fn test_compact_format() {
        let formatter = CompactFormatter::new();
        let output = formatter.format_diagnostic(&diag(
            "no-important",
            Severity::Warning,
            "Unexpected !important flag found.",
            10,
        ));
        assert_eq!(
            output,
            "site.css:10:5: warning [no-important] Unexpected !important flag found."
        );
    }

    #[test]
    fn test_compact_minimal() {
        let formatter = CompactFormatter::new().without_severity().without_rule();
        let output = formatter.format_diagnostic(&diag("r", Severity::Error, "Error", 1));
        assert_eq!(output, "site.css:1:5: Error");
    }

    #[test]
    fn test_compact_result() {
        let formatter = CompactFormatter::new();
        let result = LintResult {
            diagnostics: vec![
                diag("r1", Severity::Error, "E1", 1),
                diag("r2", Severity::Warning, "E2", 2),
            ],
            files_processed: 1,
            error_count: 1,
            warning_count: 1,
            ..Default::default()
        };

        let output = formatter.format(&result);
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with("warning [r2] E2"));
    }
}

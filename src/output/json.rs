//! JSON output formatter

use super::OutputFormatter;
use crate::diagnostic::{Diagnostic, FixSafety, Severity};
use crate::engine::LintResult;
use serde::Serialize;

/// JSON formatter for machine-readable output
#[derive(Default)]
pub struct JsonFormatter {
    /// Pretty print with indentation
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    fn render<T: Serialize>(&self, value: &T) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_else(|e| {
            log::error!("failed to serialize lint output: {}", e);
            String::new()
        })
    }
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    diagnostics: Vec<JsonDiagnostic<'a>>,
    summary: JsonSummary,
}

#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    rule_id: &'a str,
    severity: Severity,
    message: &'a str,
    file: String,
    line: usize,
    column: usize,
    end_line: usize,
    end_column: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_line: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    help: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fix: Option<JsonFix<'a>>,
}

#[derive(Serialize)]
struct JsonFix<'a> {
    description: &'a str,
    replacement: &'a str,
    range: [usize; 2],
    safety: FixSafety,
}

#[derive(Serialize)]
struct JsonSummary {
    files_processed: usize,
    files_with_errors: usize,
    files_with_warnings: usize,
    error_count: usize,
    warning_count: usize,
    info_count: usize,
    duration_ms: u128,
}

impl<'a> From<&'a Diagnostic> for JsonDiagnostic<'a> {
    fn from(d: &'a Diagnostic) -> Self {
        JsonDiagnostic {
            rule_id: &d.rule_id,
            severity: d.severity,
            message: &d.message,
            file: d.location.file.display().to_string(),
            line: d.location.line,
            column: d.location.column,
            end_line: d.location.end_line,
            end_column: d.location.end_column,
            source_line: d.source_line.as_deref(),
            help: d.help.as_deref(),
            fix: d.fix.as_ref().map(|f| JsonFix {
                description: &f.description,
                replacement: &f.replacement,
                range: [f.start_offset, f.end_offset],
                safety: f.safety,
            }),
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, result: &LintResult) -> String {
        let output = JsonOutput {
            diagnostics: result.diagnostics.iter().map(JsonDiagnostic::from).collect(),
            summary: JsonSummary {
                files_processed: result.files_processed,
                files_with_errors: result.files_with_errors,
                files_with_warnings: result.files_with_warnings,
                error_count: result.error_count,
                warning_count: result.warning_count,
                info_count: result.info_count,
                duration_ms: result.duration.as_millis(),
            },
        };
        self.render(&output)
    }

    fn format_diagnostic(&self, diagnostic: &Diagnostic) -> String {
        self.render(&JsonDiagnostic::from(diagnostic))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::{Fix, Location};
    use std::path::PathBuf;

    #[test]
    fn test_json_format_diagnostic() {
        let formatter = JsonFormatter::new();
        let diag = Diagnostic::new(
            "no-important",
            Severity::Warning,
            "Unexpected !important flag found.",
            Location::new(PathBuf::from("a.css"), 10, 5),
        )
        .with_fix(Fix::safe("Remove !important", 20..31, ""));

        let output = formatter.format_diagnostic(&diag);
        assert!(output.contains("\"rule_id\":\"no-important\""));
        assert!(output.contains("\"severity\":\"warning\""));
        assert!(output.contains("\"line\":10"));
        assert!(output.contains("\"range\":[20,31]"));
        assert!(output.contains("\"safety\":\"safe\""));
    }

    #[test]
    fn test_json_format_result() {
        let formatter = JsonFormatter::new();
        let result = LintResult {
            files_processed: 5,
            error_count: 2,
            warning_count: 3,
            ..Default::default()
        };

        let output = formatter.format(&result);
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["summary"]["files_processed"], 5);
        assert_eq!(parsed["summary"]["error_count"], 2);
        assert_eq!(parsed["summary"]["warning_count"], 3);
        assert!(parsed["diagnostics"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_json_pretty() {
        let formatter = JsonFormatter::new().pretty();
        let diag = Diagnostic::new(
            "test",
            Severity::Info,
            "msg",
            Location::new(PathBuf::from("f.css"), 1, 1),
        );

        let output = formatter.format_diagnostic(&diag);
        assert!(output.contains('\n'));
    }
}

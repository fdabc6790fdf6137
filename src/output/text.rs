//! Human-readable text output formatter

use super::OutputFormatter;
use crate::diagnostic::{Diagnostic, Severity};
use crate::engine::LintResult;
use colored::*;
use std::collections::BTreeMap;
use std::path::Path;

/// Text formatter with optional color support
pub struct TextFormatter {
    pub colored: bool,

    /// Show the offending source line with a caret underline
    pub show_source: bool,

    pub show_help: bool,

    pub show_fixes: bool,

    /// Show the summary footer
    pub show_stats: bool,

    /// Show context lines before/after
    pub show_context: bool,

    /// Append per-rule timings to the summary
    pub show_timings: bool,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            colored: true,
            show_source: true,
            show_help: true,
            show_fixes: true,
            show_stats: true,
            show_context: true,
            show_timings: false,
        }
    }
}

impl TextFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_color(mut self) -> Self {
        self.colored = false;
        self
    }

    fn paint(&self, text: &str, style: fn(&str) -> ColoredString) -> String {
        if self.colored {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn gutter(&self) -> String {
        self.paint("|", |s| s.blue())
    }

    fn severity_str(&self, severity: Severity) -> String {
        let s = severity.to_string();
        match severity {
            Severity::Error => self.paint(&s, |s| s.red().bold()),
            Severity::Warning => self.paint(&s, |s| s.yellow().bold()),
            Severity::Info => self.paint(&s, |s| s.blue()),
        }
    }

    fn push_context(&self, output: &mut String, lines: &[(usize, String)]) {
        for (line_num, line) in lines {
            output.push_str(&format!(
                "{} {} {}\n",
                self.paint(&format!("{:>4}", line_num), |s| s.dimmed()),
                self.gutter(),
                self.paint(line, |s| s.dimmed())
            ));
        }
    }

    fn summary(&self, result: &LintResult) -> String {
        let plural = |n: usize, one: &str, many: &str| {
            format!("{} {}", n, if n == 1 { one } else { many })
        };

        let mut output = format!(
            "\n{} processed",
            plural(result.files_processed, "file", "files")
        );

        let mut counts = Vec::new();
        if result.error_count > 0 {
            counts.push(self.paint(&plural(result.error_count, "error", "errors"), |s| s.red()));
        }
        if result.warning_count > 0 {
            counts.push(self.paint(
                &plural(result.warning_count, "warning", "warnings"),
                |s| s.yellow(),
            ));
        }
        if result.info_count > 0 {
            counts.push(self.paint(&plural(result.info_count, "info", "infos"), |s| s.blue()));
        }
        if !counts.is_empty() {
            output.push_str(&format!(": {}", counts.join(", ")));
        }
        output.push('\n');

        output.push_str(&format!(
            "Finished in {:.2}s\n",
            result.duration.as_secs_f64()
        ));

        if self.show_timings {
            output.push('\n');
            output.push_str(&result.format_timings());
        }

        output
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, result: &LintResult) -> String {
        let mut output = String::new();

        let mut by_file: BTreeMap<&Path, Vec<&Diagnostic>> = BTreeMap::new();
        for diag in &result.diagnostics {
            by_file
                .entry(diag.location.file.as_path())
                .or_default()
                .push(diag);
        }

        for (file, diagnostics) in &by_file {
            output.push_str(&self.paint(&file.display().to_string(), |s| s.underline()));
            output.push('\n');

            for diag in diagnostics {
                output.push_str(&self.format_diagnostic(diag));
                output.push('\n');
            }
        }

        if self.show_stats {
            output.push_str(&self.summary(result));
        }

        output
    }

    fn format_diagnostic(&self, diag: &Diagnostic) -> String {
        let mut output = format!(
            "{}:{}:{}: {}[{}]: {}\n",
            diag.location.file.display(),
            diag.location.line,
            diag.location.column,
            self.severity_str(diag.severity),
            self.paint(&diag.rule_id, |s| s.cyan()),
            diag.message
        );

        if self.show_source {
            if let Some(source) = &diag.source_line {
                output.push_str(&format!("   {}\n", self.gutter()));
                if self.show_context {
                    self.push_context(&mut output, &diag.context_before);
                }

                output.push_str(&format!(
                    "{} {} {}\n",
                    self.paint(&format!("{:>4}", diag.location.line), |s| s.blue()),
                    self.gutter(),
                    source
                ));

                if diag.location.column > 0 {
                    // Columns are byte based; pad with the source prefix width in chars
                    let prefix_end = (diag.location.column - 1).min(source.len());
                    let padding = source
                        .get(..prefix_end)
                        .map_or(prefix_end, |prefix| prefix.chars().count());
                    let underline = "^".repeat(diag.location.length.max(1));
                    output.push_str(&format!(
                        "   {} {}{}\n",
                        self.gutter(),
                        " ".repeat(padding),
                        self.paint(&underline, |s| s.red())
                    ));
                }

                if self.show_context {
                    self.push_context(&mut output, &diag.context_after);
                }
            }
        }

        if self.show_help {
            if let Some(help) = &diag.help {
                output.push_str(&format!("   {} help: {}\n", self.paint("=", |s| s.blue()), help));
            }
        }

        if self.show_fixes {
            if let Some(fix) = &diag.fix {
                let replacement = if fix.replacement.is_empty() {
                    "(remove)".to_string()
                } else {
                    fix.replacement.clone()
                };
                output.push_str(&format!(
                    "   {} fix ({}): {} -> {}\n",
                    self.paint("=", |s| s.green()),
                    fix.safety,
                    fix.description,
                    self.paint(&replacement, |s| s.green())
                ));
            }
        }

        for note in &diag.notes {
            output.push_str(&format!("   {} note: {}\n", self.paint("=", |s| s.blue()), note));
        }

        output
    }
}

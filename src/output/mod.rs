//! Output formatters for lint results

mod compact;
mod json;
mod text;

pub use compact::CompactFormatter;
pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::config::OutputFormat;
use crate::diagnostic::Diagnostic;
use crate::engine::LintResult;

/// Output formatter trait
pub trait OutputFormatter: Send + Sync {
    /// Format the entire lint result
    fn format(&self, result: &LintResult) -> String;

    /// Format a single diagnostic
    fn format_diagnostic(&self, diagnostic: &Diagnostic) -> String;
}

/// Formatter for a configured output format
pub fn formatter_for(format: OutputFormat, colored: bool, verbose: bool) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Text => {
            let mut text = TextFormatter::new();
            text.colored = colored;
            text.show_timings = verbose;
            Box::new(text)
        }
        OutputFormat::Json => Box::new(JsonFormatter::new().pretty()),
        OutputFormat::Compact => Box::new(CompactFormatter::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::{Location, Severity};
    use std::path::PathBuf;

    #[test]
    fn test_formatter_for_each_format() {
        let diag = Diagnostic::new(
            "no-empty-blocks",
            Severity::Error,
            "Unexpected empty block found.",
            Location::new(PathBuf::from("a.css"), 1, 3),
        );
        let compact = formatter_for(OutputFormat::Compact, false, false).format_diagnostic(&diag);
        assert!(compact.starts_with("a.css:1:3"));
        let json = formatter_for(OutputFormat::Json, false, false).format_diagnostic(&diag);
        assert!(json.contains("\"rule_id\": \"no-empty-blocks\""));
        let text = formatter_for(OutputFormat::Text, false, false).format_diagnostic(&diag);
        assert!(text.contains("error[no-empty-blocks]"));
    }
}

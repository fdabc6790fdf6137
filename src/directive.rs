//! Inline directive comments
//!
//! Comments such as `/* eslint-disable no-important -- legacy */` or
//! `/* eslint no-empty-blocks: off */` turn into [`Directive`]s and
//! [`InlineConfig`]s. Malformed comments never fail: they become [`Problem`]s.

use crate::ast::Comment;
use crate::position::SourceLocation;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use thiserror::Error;

/// Keyword that starts a directive comment unless configured otherwise
pub const DEFAULT_KEYWORD: &str = "eslint";

static SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s-{2,}\s").expect("valid regex"));
static LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-z]+(?:-[a-z]+)*)(?:\s|$)").expect("valid regex"));
static UNQUOTED_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([-a-zA-Z0-9/]+):").expect("valid regex"));
static MISSING_COMMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\]|[0-9])\s+""#).expect("valid regex"));
static BARE_SEVERITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\[:,]\s*)(off|warn|error|info)\b").expect("valid regex"));

/// Kinds suffixes checked longest first
const KIND_SUFFIXES: [&str; 4] = ["-disable-next-line", "-disable-line", "-disable", "-enable"];

/// A directive comment split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveComment<'a> {
    pub label: &'a str,
    pub value: &'a str,
    pub justification: &'a str,
}

/// Split comment text into label, value and justification
///
/// The justification follows the first whitespace-surrounded run of two or
/// more dashes. Returns `None` when the text has no leading label.
pub fn parse_directive(text: &str) -> Option<DirectiveComment<'_>> {
    let (directive_part, justification) = match SEPARATOR_RE.find(text) {
        Some(m) => (&text[..m.start()], &text[m.end()..]),
        None => (text, ""),
    };
    let directive_part = directive_part.trim();
    let label = LABEL_RE.captures(directive_part)?.get(1)?.as_str();

    Some(DirectiveComment {
        label,
        value: directive_part[label.len()..].trim(),
        justification: justification.trim(),
    })
}

/// Whether comment text starts with `<keyword>` or one of its directive labels
pub fn is_directive_candidate(text: &str, keyword: &str) -> bool {
    let Some(rest) = text.trim_start().strip_prefix(keyword) else {
        return false;
    };
    let rest = KIND_SUFFIXES
        .iter()
        .find_map(|suffix| rest.strip_prefix(suffix))
        .unwrap_or(rest);
    rest.is_empty() || rest.starts_with(char::is_whitespace)
}

/// What a directive does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DirectiveKind {
    Disable,
    Enable,
    DisableLine,
    DisableNextLine,
}

impl DirectiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DirectiveKind::Disable => "disable",
            DirectiveKind::Enable => "enable",
            DirectiveKind::DisableLine => "disable-line",
            DirectiveKind::DisableNextLine => "disable-next-line",
        }
    }

    /// Kind for a label such as `eslint-disable-line`
    pub fn from_label(label: &str, keyword: &str) -> Option<Self> {
        match label.strip_prefix(keyword)?.strip_prefix('-')? {
            "disable" => Some(DirectiveKind::Disable),
            "enable" => Some(DirectiveKind::Enable),
            "disable-line" => Some(DirectiveKind::DisableLine),
            "disable-next-line" => Some(DirectiveKind::DisableNextLine),
            _ => None,
        }
    }
}

impl std::fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A disable/enable instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive<'a> {
    pub kind: DirectiveKind,
    /// Raw rule list; empty means every rule
    pub value: String,
    pub justification: String,
    pub comment: &'a Comment,
}

impl Directive<'_> {
    /// Rule ids named by the directive (empty for all rules)
    pub fn rule_ids(&self) -> Vec<&str> {
        self.value
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .collect()
    }

    pub fn loc(&self) -> &SourceLocation {
        &self.comment.loc
    }
}

/// A recoverable problem found in a directive comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    /// Always `None` for directive problems
    pub rule_id: Option<String>,
    pub message: String,
    pub loc: SourceLocation,
}

impl Problem {
    pub fn new(message: impl Into<String>, loc: SourceLocation) -> Self {
        Self {
            rule_id: None,
            message: message.into(),
            loc,
        }
    }
}

/// Rule settings from one `<keyword> ...` comment
#[derive(Debug, Clone, PartialEq)]
pub struct InlineConfig {
    pub rules: Map<String, Value>,
    pub loc: SourceLocation,
}

/// Output of [`extract_directives`]
#[derive(Debug, Clone, Default)]
pub struct DirectiveReport<'a> {
    pub problems: Vec<Problem>,
    pub directives: Vec<Directive<'a>>,
}

/// Output of [`extract_inline_configs`]
#[derive(Debug, Clone, Default)]
pub struct InlineConfigReport {
    pub problems: Vec<Problem>,
    pub configs: Vec<InlineConfig>,
}

/// Turn candidate comments into disable/enable directives
pub fn extract_directives<'a, I>(candidates: I, keyword: &str) -> DirectiveReport<'a>
where
    I: IntoIterator<Item = &'a Comment>,
{
    let mut report = DirectiveReport::default();
    for comment in candidates {
        let Some(parsed) = parse_directive(&comment.value) else {
            continue;
        };
        let Some(kind) = DirectiveKind::from_label(parsed.label, keyword) else {
            continue;
        };
        if kind == DirectiveKind::DisableLine && comment.loc.spans_lines() {
            report.problems.push(Problem::new(
                format!("{} comment should not span multiple lines.", parsed.label),
                comment.loc,
            ));
            continue;
        }
        report.directives.push(Directive {
            kind,
            value: parsed.value.to_string(),
            justification: parsed.justification.to_string(),
            comment,
        });
    }
    report
}

/// Turn candidate `<keyword> rule: setting` comments into rule settings
pub fn extract_inline_configs<'a, I>(candidates: I, keyword: &str) -> InlineConfigReport
where
    I: IntoIterator<Item = &'a Comment>,
{
    let mut report = InlineConfigReport::default();
    for comment in candidates {
        let Some(parsed) = parse_directive(&comment.value) else {
            continue;
        };
        if parsed.label != keyword {
            continue;
        }
        match parse_json_config(parsed.value) {
            Ok(rules) => report.configs.push(InlineConfig {
                rules,
                loc: comment.loc,
            }),
            Err(err) => report.problems.push(Problem::new(err.message, comment.loc)),
        }
    }
    report
}

/// An inline rule configuration that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConfigParseError {
    pub message: String,
}

/// Parse the relaxed JSON used in inline config comments
///
/// Accepts strict JSON object members (`"rule": "off"`) as well as unquoted
/// keys, bare severities and a missing comma between entries
/// (`rule-a: [error, 2] rule-b: off`).
pub fn parse_json_config(text: &str) -> Result<Map<String, Value>, ConfigParseError> {
    if let Ok(Value::Object(map)) = serde_json::from_str(&format!("{{{text}}}")) {
        return Ok(map);
    }

    let normalized = UNQUOTED_KEY_RE.replace_all(text, "\"$1\":");
    let normalized = MISSING_COMMA_RE.replace_all(&normalized, "$1,\"");
    let normalized = BARE_SEVERITY_RE.replace_all(&normalized, "$1\"$2\"");

    match serde_json::from_str::<Value>(&format!("{{{normalized}}}")) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ConfigParseError {
            message: format!("Failed to parse JSON from '{normalized}': expected an object"),
        }),
        Err(err) => Err(ConfigParseError {
            message: format!("Failed to parse JSON from '{normalized}': {err}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;
    use serde_json::json;

    fn comment(value: &str, start_line: usize, end_line: usize) -> Comment {
        let at = |line| Position {
            line,
            column: 1,
            offset: 0,
        };
        Comment::new(value, SourceLocation::new(at(start_line), at(end_line)))
    }

    #[test]
    fn test_parse_directive_parts() {
        let parsed = parse_directive(" eslint-disable no-empty -- reason ").unwrap();
        assert_eq!(parsed.label, "eslint-disable");
        assert_eq!(parsed.value, "no-empty");
        assert_eq!(parsed.justification, "reason");

        let parsed = parse_directive("eslint-enable").unwrap();
        assert_eq!((parsed.value, parsed.justification), ("", ""));

        let parsed = parse_directive("eslint a, b --- why -- not").unwrap();
        assert_eq!(parsed.value, "a, b");
        assert_eq!(parsed.justification, "why -- not");
    }

    #[test]
    fn test_parse_directive_needs_label() {
        assert!(parse_directive("  ").is_none());
        assert!(parse_directive("Eslint-disable").is_none());
        assert!(parse_directive("eslint-disable-").is_none());
    }

    #[test]
    fn test_candidate_filter() {
        for text in [
            "eslint",
            " eslint-disable",
            "eslint-enable a",
            "\neslint-disable-line",
            "eslint-disable-next-line x",
            "eslint rule: off",
        ] {
            assert!(is_directive_candidate(text, "eslint"), "{text:?}");
        }
        for text in [
            "eslintx",
            "eslint-disabled",
            "eslint-disable-lines",
            "ESLINT-disable",
            "not eslint",
            "eslint-next-line",
        ] {
            assert!(!is_directive_candidate(text, "eslint"), "{text:?}");
        }
        assert!(is_directive_candidate("cascade-disable", "cascade"));
    }

    #[test]
    fn test_kind_from_label() {
        assert_eq!(
            DirectiveKind::from_label("eslint-disable-next-line", "eslint"),
            Some(DirectiveKind::DisableNextLine)
        );
        assert_eq!(DirectiveKind::from_label("eslint", "eslint"), None);
        assert_eq!(DirectiveKind::from_label("eslint-foo", "eslint"), None);
        assert_eq!(DirectiveKind::from_label("other-disable", "eslint"), None);
    }

    #[test]
    fn test_extract_directives() {
        let comments = vec![
            comment(" eslint-disable no-empty -- reason ", 1, 1),
            comment(" eslint-enable ", 2, 2),
            comment(" eslint-disable-line a,\n b ", 3, 4),
            comment(" eslint rule: off ", 5, 5),
            comment(" eslint-disable-next-line a, b ", 6, 7),
        ];
        let report = extract_directives(&comments, "eslint");

        assert_eq!(report.directives.len(), 3);
        assert_eq!(report.directives[0].kind, DirectiveKind::Disable);
        assert_eq!(report.directives[0].justification, "reason");
        assert_eq!(report.directives[1].kind, DirectiveKind::Enable);
        assert_eq!(report.directives[1].justification, "");
        assert!(report.directives[1].rule_ids().is_empty());
        assert_eq!(report.directives[2].rule_ids(), vec!["a", "b"]);
        assert!(std::ptr::eq(report.directives[0].comment, &comments[0]));

        assert_eq!(report.problems.len(), 1);
        assert_eq!(report.problems[0].rule_id, None);
        assert_eq!(
            report.problems[0].message,
            "eslint-disable-line comment should not span multiple lines."
        );
        assert_eq!(report.problems[0].loc, comments[2].loc);
    }

    #[test]
    fn test_extract_inline_configs() {
        let comments = vec![
            comment(" eslint no-important: off, no-empty-blocks: [error] ", 1, 1),
            comment(" eslint rule-name: [error ", 2, 2),
            comment(" eslint-disable x ", 3, 3),
        ];
        let report = extract_inline_configs(&comments, "eslint");

        assert_eq!(report.configs.len(), 1);
        assert_eq!(report.configs[0].rules["no-important"], json!("off"));
        assert_eq!(report.configs[0].rules["no-empty-blocks"], json!(["error"]));

        assert_eq!(report.problems.len(), 1);
        assert!(report.problems[0].message.starts_with("Failed to parse"));
        assert_eq!(report.problems[0].loc, comments[1].loc);
    }

    #[test]
    fn test_parse_json_config_forms() {
        let strict = parse_json_config(r#""a": "warn", "b": [2, {"max": 3}]"#).unwrap();
        assert_eq!(strict["b"], json!([2, {"max": 3}]));

        let relaxed = parse_json_config("a: 2 b: [1, \"x\"] c/d: error").unwrap();
        assert_eq!(relaxed["a"], json!(2));
        assert_eq!(relaxed["b"], json!([1, "x"]));
        assert_eq!(relaxed["c/d"], json!("error"));

        assert!(parse_json_config("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_json_config_error_message() {
        let err = parse_json_config("rule-name: [error").unwrap_err();
        assert!(err
            .message
            .starts_with("Failed to parse JSON from '\"rule-name\": [\"error\"':"));
    }
}

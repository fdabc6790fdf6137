//! Rule definition and per-file rule state

use crate::ast::Node;
use crate::diagnostic::{Diagnostic, Fix, Location, Severity};
use crate::source_code::SourceCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Rule category for grouping related rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    /// Code that is definitely wrong or useless
    Correctness,
    /// Code that is likely wrong or suspicious
    Suspicious,
    #[default]
    Style,
    /// Patterns banned by policy
    Restriction,
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleCategory::Correctness => write!(f, "correctness"),
            RuleCategory::Suspicious => write!(f, "suspicious"),
            RuleCategory::Style => write!(f, "style"),
            RuleCategory::Restriction => write!(f, "restriction"),
        }
    }
}

impl std::str::FromStr for RuleCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "correctness" => Ok(RuleCategory::Correctness),
            "suspicious" => Ok(RuleCategory::Suspicious),
            "style" => Ok(RuleCategory::Style),
            "restriction" => Ok(RuleCategory::Restriction),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

/// Static description of a rule
#[derive(Debug, Clone)]
pub struct RuleMeta {
    /// Unique rule identifier (e.g., "no-empty-blocks")
    pub id: &'static str,
    pub description: &'static str,
    /// Severity used when configuration does not override it
    pub severity: Severity,
    pub category: RuleCategory,
    /// Node types whose enter/exit steps the rule receives
    pub node_types: &'static [&'static str],
    pub fixable: bool,
    pub docs: Option<&'static str>,
}

/// A lint rule: metadata plus a factory for per-file visitors
pub trait Rule: Send + Sync {
    fn meta(&self) -> &RuleMeta;

    /// Fresh visitor for one file, configured with the rule's options
    fn create(&self, options: &[Value]) -> Box<dyn RuleVisitor>;
}

/// Per-file rule state driven by the traversal steps
pub trait RuleVisitor {
    fn enter(&mut self, _node: &Node, _cx: &mut RuleContext<'_>) {}

    fn exit(&mut self, _node: &Node, _cx: &mut RuleContext<'_>) {}
}

/// What a visitor sees of the file, and where it reports
pub struct RuleContext<'a> {
    source: &'a SourceCode,
    rule_id: &'static str,
    severity: Severity,
    help: &'static str,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> RuleContext<'a> {
    pub fn new(source: &'a SourceCode, meta: &RuleMeta, severity: Severity) -> Self {
        Self {
            source,
            rule_id: meta.id,
            severity,
            help: meta.description,
            diagnostics: Vec::new(),
        }
    }

    pub fn source_code(&self) -> &'a SourceCode {
        self.source
    }

    pub fn rule_id(&self) -> &str {
        self.rule_id
    }

    pub fn report(&mut self, node: &Node, message: &str) {
        let diagnostic = self.diagnostic(node, message);
        self.diagnostics.push(diagnostic);
    }

    pub fn report_with_fix(&mut self, node: &Node, message: &str, fix: Fix) {
        let diagnostic = self.diagnostic(node, message).with_fix(fix);
        self.diagnostics.push(diagnostic);
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    fn diagnostic(&self, node: &Node, message: &str) -> Diagnostic {
        let location = Location::from_source(self.source.path().to_path_buf(), node.loc());
        let mut diagnostic =
            Diagnostic::new(self.rule_id, self.severity, message, location).with_help(self.help);
        if let Some(line) = self.source.line(node.loc().start.line) {
            diagnostic = diagnostic.with_source_line(line);
        }
        diagnostic
    }
}

/// Whether a rule runs, and at which severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleLevel {
    Off,
    On(Severity),
}

/// Level plus options for one rule
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSetting {
    pub level: RuleLevel,
    pub options: Vec<Value>,
}

impl RuleSetting {
    pub fn on(severity: Severity) -> Self {
        Self {
            level: RuleLevel::On(severity),
            options: Vec::new(),
        }
    }

    pub fn off() -> Self {
        Self {
            level: RuleLevel::Off,
            options: Vec::new(),
        }
    }

    /// Read an inline setting: `"off"|0`, `"warn"|1`, `"error"|2`, `"info"`,
    /// or `[level, ...options]`
    pub fn from_value(rule_id: &str, value: &Value) -> Result<Self, String> {
        let (level, options) = match value {
            Value::Array(items) => match items.split_first() {
                Some((head, rest)) => (head, rest.to_vec()),
                None => return Err(invalid_setting(rule_id, value)),
            },
            other => (other, Vec::new()),
        };
        let level = parse_level(level).ok_or_else(|| invalid_setting(rule_id, value))?;
        Ok(Self { level, options })
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self.level, RuleLevel::On(_))
    }
}

fn parse_level(value: &Value) -> Option<RuleLevel> {
    match value {
        Value::Number(n) => match n.as_u64()? {
            0 => Some(RuleLevel::Off),
            1 => Some(RuleLevel::On(Severity::Warning)),
            2 => Some(RuleLevel::On(Severity::Error)),
            _ => None,
        },
        Value::String(s) if s == "off" => Some(RuleLevel::Off),
        Value::String(s) => s.parse::<Severity>().ok().map(RuleLevel::On),
        _ => None,
    }
}

fn invalid_setting(rule_id: &str, value: &Value) -> String {
    format!(
        "Configuration for rule \"{rule_id}\" is invalid: Severity should be one of the following: 0 = off, 1 = warn, 2 = error, \"info\" (you passed '{value}')."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_category_from_str() {
        assert_eq!("style".parse::<RuleCategory>(), Ok(RuleCategory::Style));
        assert!("bogus".parse::<RuleCategory>().is_err());
    }

    #[test]
    fn test_setting_scalars() {
        let s = RuleSetting::from_value("r", &json!("off")).unwrap();
        assert_eq!(s.level, RuleLevel::Off);
        assert!(!s.is_enabled());

        let s = RuleSetting::from_value("r", &json!(1)).unwrap();
        assert_eq!(s.level, RuleLevel::On(Severity::Warning));

        let s = RuleSetting::from_value("r", &json!("error")).unwrap();
        assert_eq!(s.level, RuleLevel::On(Severity::Error));

        let s = RuleSetting::from_value("r", &json!("info")).unwrap();
        assert_eq!(s.level, RuleLevel::On(Severity::Info));
    }

    #[test]
    fn test_setting_array_with_options() {
        let s = RuleSetting::from_value("r", &json!(["warn", {"max": 2}, "x"])).unwrap();
        assert_eq!(s.level, RuleLevel::On(Severity::Warning));
        assert_eq!(s.options, vec![json!({"max": 2}), json!("x")]);
    }

    #[test]
    fn test_setting_invalid() {
        for bad in [json!(3), json!("loud"), json!([]), json!(true), json!({"a": 1})] {
            let err = RuleSetting::from_value("no-important", &bad).unwrap_err();
            assert!(err.contains("\"no-important\" is invalid"), "{err}");
        }
    }
}

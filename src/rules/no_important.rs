use crate::ast::Node;
use crate::diagnostic::{Fix, Severity};
use crate::rule::{Rule, RuleCategory, RuleContext, RuleMeta, RuleVisitor};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static IMPORTANT_FLAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*!\s*important\s*$").expect("valid regex"));

static META: RuleMeta = RuleMeta {
    id: "no-important",
    description: "Disallow !important flags",
    severity: Severity::Warning,
    category: RuleCategory::Restriction,
    node_types: &["Declaration"],
    fixable: true,
    docs: None,
};

/// Reports declarations flagged `!important`; the fix drops the flag
pub struct NoImportant;

impl Rule for NoImportant {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn create(&self, _options: &[Value]) -> Box<dyn RuleVisitor> {
        Box::new(Visitor)
    }
}

struct Visitor;

impl RuleVisitor for Visitor {
    fn enter(&mut self, node: &Node, cx: &mut RuleContext<'_>) {
        if !node.bool_field("important") {
            return;
        }
        let source = cx.source_code();
        let range = source.get_range(node);
        let message = "Unexpected !important flag found.";
        match IMPORTANT_FLAG_RE.find(source.get_text(node)) {
            Some(flag) => {
                let fix = Fix::safe(
                    "Remove !important",
                    range.start + flag.start()..range.start + flag.end(),
                    "",
                );
                cx.report_with_fix(node, message, fix);
            }
            None => cx.report(node, message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::run;

    #[test]
    fn test_reports_with_fix() {
        let text = "a { color: red !important; margin: 0 }";
        let diags = run(&NoImportant, text);
        assert_eq!(diags.len(), 1);

        let fix = diags[0].fix.as_ref().unwrap();
        assert!(fix.is_safe());
        let mut fixed = text.to_string();
        fixed.replace_range(fix.range(), &fix.replacement);
        assert_eq!(fixed, "a { color: red; margin: 0 }");
    }

    #[test]
    fn test_spaced_and_uppercase_flag() {
        let text = "a { color: red ! IMPORTANT }";
        let diags = run(&NoImportant, text);
        let fix = diags[0].fix.as_ref().unwrap();
        assert_eq!(&text[fix.range()], " ! IMPORTANT");
    }

    #[test]
    fn test_plain_declarations_pass() {
        assert!(run(&NoImportant, "a { color: red; content: \"!important\" }").is_empty());
    }
}

use crate::ast::Node;
use crate::diagnostic::Severity;
use crate::rule::{Rule, RuleCategory, RuleContext, RuleMeta, RuleVisitor};
use serde_json::Value;
use std::collections::HashSet;

static META: RuleMeta = RuleMeta {
    id: "no-duplicate-imports",
    description: "Disallow importing the same stylesheet twice",
    severity: Severity::Error,
    category: RuleCategory::Correctness,
    node_types: &["Atrule"],
    fixable: false,
    docs: None,
};

/// Reports a second `@import` of the same URL
pub struct NoDuplicateImports;

impl Rule for NoDuplicateImports {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn create(&self, _options: &[Value]) -> Box<dyn RuleVisitor> {
        Box::new(Visitor::default())
    }
}

#[derive(Default)]
struct Visitor {
    seen: HashSet<String>,
}

impl RuleVisitor for Visitor {
    fn enter(&mut self, node: &Node, cx: &mut RuleContext<'_>) {
        if !node
            .str_field("name")
            .is_some_and(|name| name.eq_ignore_ascii_case("import"))
        {
            return;
        }
        let source = cx.source_code();
        let Some(prelude) = node.child("prelude").and_then(|id| source.node(id)) else {
            return;
        };
        let Some(url) = prelude.str_field("value").and_then(import_url) else {
            return;
        };
        if !self.seen.insert(url.to_string()) {
            cx.report(node, &format!("Unexpected duplicate @import rule for {url}."));
        }
    }
}

/// URL of an `@import` prelude: `url(x)`, `url("x")` or `"x"`, ignoring media queries
fn import_url(prelude: &str) -> Option<&str> {
    let prelude = prelude.trim();
    let target = match prelude.get(..4) {
        Some(head) if head.eq_ignore_ascii_case("url(") => {
            let end = prelude.find(')')?;
            prelude[4..end].trim()
        }
        _ => prelude.split_whitespace().next()?,
    };
    let target = target.trim_matches(|c| c == '"' || c == '\'');
    (!target.is_empty()).then_some(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::run;

    #[test]
    fn test_import_url_forms() {
        assert_eq!(import_url("url(a.css)"), Some("a.css"));
        assert_eq!(import_url("URL( \"a.css\" ) screen"), Some("a.css"));
        assert_eq!(import_url("'a.css' print"), Some("a.css"));
        assert_eq!(import_url("\"\""), None);
    }

    #[test]
    fn test_reports_second_import() {
        let text = "@import \"a.css\";\n@import url(b.css);\n@import url('a.css') screen;\n";
        let diags = run(&NoDuplicateImports, text);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].location.line, 3);
        assert_eq!(diags[0].message, "Unexpected duplicate @import rule for a.css.");
    }

    #[test]
    fn test_other_atrules_ignored() {
        assert!(run(&NoDuplicateImports, "@charset \"a\";\n@charset \"a\";").is_empty());
    }
}

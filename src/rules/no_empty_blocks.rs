use crate::ast::Node;
use crate::diagnostic::Severity;
use crate::rule::{Rule, RuleCategory, RuleContext, RuleMeta, RuleVisitor};
use serde_json::Value;

static META: RuleMeta = RuleMeta {
    id: "no-empty-blocks",
    description: "Disallow empty blocks",
    severity: Severity::Error,
    category: RuleCategory::Suspicious,
    node_types: &["Block"],
    fixable: false,
    docs: None,
};

/// Reports `{}` blocks with nothing inside
pub struct NoEmptyBlocks;

impl Rule for NoEmptyBlocks {
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
        if node.children("children").is_empty() {
            cx.report(node, "Unexpected empty block found.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::run;

    #[test]
    fn test_reports_empty_blocks() {
        let diags = run(&NoEmptyBlocks, "a {}\nb { color: red }\n@media print {\n}");
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].location.line, 1);
        assert_eq!(diags[0].location.column, 3);
        assert_eq!(diags[1].location.line, 3);
        assert_eq!(diags[0].severity, Severity::Error);
    }

    #[test]
    fn test_comment_only_block_is_empty() {
        assert_eq!(run(&NoEmptyBlocks, "a { /* todo */ }").len(), 1);
    }
}

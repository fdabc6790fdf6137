use crate::ast::{Node, NodeId};
use crate::diagnostic::Severity;
use crate::rule::{Rule, RuleCategory, RuleContext, RuleMeta, RuleVisitor};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

static META: RuleMeta = RuleMeta {
    id: "no-duplicate-properties",
    description: "Disallow the same property twice in one block",
    severity: Severity::Warning,
    category: RuleCategory::Suspicious,
    node_types: &["Declaration"],
    fixable: false,
    docs: None,
};

/// Reports repeated properties within a block
///
/// Custom properties (`--x`) compare case-sensitively, everything else does not.
pub struct NoDuplicateProperties;

impl Rule for NoDuplicateProperties {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn create(&self, _options: &[Value]) -> Box<dyn RuleVisitor> {
        Box::new(Visitor::default())
    }
}

#[derive(Default)]
struct Visitor {
    /// Properties seen so far, per enclosing block
    seen: HashMap<Option<NodeId>, HashSet<String>>,
}

impl RuleVisitor for Visitor {
    fn enter(&mut self, node: &Node, cx: &mut RuleContext<'_>) {
        let Some(property) = node.str_field("property") else {
            return;
        };
        let key = if property.starts_with("--") {
            property.to_string()
        } else {
            property.to_ascii_lowercase()
        };
        let block = cx.source_code().get_parent(node).map(Node::id);
        if !self.seen.entry(block).or_default().insert(key) {
            cx.report(node, &format!("Duplicate property '{property}' found."));
        }
    }
}

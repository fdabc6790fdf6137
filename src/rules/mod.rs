//! Built-in rules

mod no_duplicate_imports;
mod no_duplicate_properties;
mod no_empty_blocks;
mod no_important;

pub use no_duplicate_imports::NoDuplicateImports;
pub use no_duplicate_properties::NoDuplicateProperties;
pub use no_empty_blocks::NoEmptyBlocks;
pub use no_important::NoImportant;

use crate::rule::Rule;
use std::sync::Arc;

/// Every rule shipped with the linter
pub fn builtin_rules() -> Vec<Arc<dyn Rule>> {
    vec![
        Arc::new(NoEmptyBlocks),
        Arc::new(NoDuplicateImports),
        Arc::new(NoImportant),
        Arc::new(NoDuplicateProperties),
    ]
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::ast::VisitorKeys;
    use crate::diagnostic::Diagnostic;
    use crate::parser::{self, ParseOutcome};
    use crate::rule::{Rule, RuleContext};
    use crate::source_code::{SourceCode, VirtualFile};
    use crate::traverse::Phase;

    /// Run one rule over `text` with default severity and options
    pub fn run(rule: &dyn Rule, text: &str) -> Vec<Diagnostic> {
        let ParseOutcome::Ok { ast, comments } = parser::parse(text) else {
            panic!("fixture does not parse: {text:?}");
        };
        let source = SourceCode::new(
            VirtualFile::new("test.css", text),
            ast,
            comments,
            VisitorKeys::css(),
        );
        let meta = rule.meta();
        let mut visitor = rule.create(&[]);
        let mut cx = RuleContext::new(&source, meta, meta.severity);
        for step in source.traverse().unwrap() {
            let node = source.node(step.target).unwrap();
            if !meta.node_types.iter().any(|kind| *kind == node.kind()) {
                continue;
            }
            match step.phase {
                Phase::Enter => visitor.enter(node, &mut cx),
                Phase::Exit => visitor.exit(node, &mut cx),
            }
        }
        cx.into_diagnostics()
    }
}

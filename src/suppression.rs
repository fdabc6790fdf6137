//! Applying disable/enable directives to rule diagnostics

use crate::diagnostic::{Diagnostic, Location, Severity};
use crate::directive::{Directive, DirectiveKind};
use crate::position::LineColumn;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Rule id used for unused-directive warnings
pub const UNUSED_DIRECTIVE_ID: &str = "unused-directive";

/// Diagnostics split by whether a directive silenced them
#[derive(Debug, Default)]
pub struct FilterOutcome {
    pub kept: Vec<Diagnostic>,
    pub suppressed: Vec<Diagnostic>,
    /// Indices into the directive list of disables that silenced nothing
    pub unused: Vec<usize>,
}

/// Disable/enable state derived from a file's directives
pub struct Suppressions<'d, 'a> {
    directives: &'d [Directive<'a>],
}

impl<'d, 'a> Suppressions<'d, 'a> {
    /// Directives must be in document order
    pub fn new(directives: &'d [Directive<'a>]) -> Self {
        Self { directives }
    }

    pub fn filter(&self, diagnostics: Vec<Diagnostic>) -> FilterOutcome {
        let mut used = vec![false; self.directives.len()];
        let mut outcome = FilterOutcome::default();

        for diagnostic in diagnostics {
            match self.suppressing_directive(&diagnostic) {
                Some(index) => {
                    used[index] = true;
                    outcome.suppressed.push(diagnostic);
                }
                None => outcome.kept.push(diagnostic),
            }
        }

        outcome.unused = self
            .directives
            .iter()
            .enumerate()
            .filter(|(i, d)| d.kind != DirectiveKind::Enable && !used[*i])
            .map(|(i, _)| i)
            .collect();
        outcome
    }

    /// Index of the directive that silences `diagnostic`, if any
    fn suppressing_directive(&self, diagnostic: &Diagnostic) -> Option<usize> {
        let rule_id = diagnostic.rule_id.as_str();
        let at = LineColumn::new(diagnostic.location.line, diagnostic.location.column);

        let line_hit = self.directives.iter().position(|d| {
            let target_line = match d.kind {
                DirectiveKind::DisableLine => d.loc().start.line,
                DirectiveKind::DisableNextLine => d.loc().end.line + 1,
                _ => return false,
            };
            target_line == at.line && applies_to(d, rule_id)
        });
        if line_hit.is_some() {
            return line_hit;
        }

        let mut blanket: Option<usize> = None;
        let mut exceptions: HashSet<&str> = HashSet::new();
        let mut disabled: HashMap<&str, usize> = HashMap::new();

        for (index, d) in self.directives.iter().enumerate() {
            if d.loc().start.line_column() > at {
                break;
            }
            let ids = d.rule_ids();
            match (d.kind, ids.is_empty()) {
                (DirectiveKind::Disable, true) => {
                    blanket = Some(index);
                    exceptions.clear();
                    disabled.clear();
                }
                (DirectiveKind::Disable, false) => {
                    for id in ids {
                        exceptions.remove(id);
                        disabled.insert(id, index);
                    }
                }
                (DirectiveKind::Enable, true) => {
                    blanket = None;
                    exceptions.clear();
                    disabled.clear();
                }
                (DirectiveKind::Enable, false) => {
                    for id in ids {
                        disabled.remove(id);
                        if blanket.is_some() {
                            exceptions.insert(id);
                        }
                    }
                }
                _ => {}
            }
        }

        if let Some(&index) = disabled.get(rule_id) {
            return Some(index);
        }
        blanket.filter(|_| !exceptions.contains(rule_id))
    }
}

fn applies_to(directive: &Directive<'_>, rule_id: &str) -> bool {
    let ids = directive.rule_ids();
    ids.is_empty() || ids.contains(&rule_id)
}

/// Warning for a disable directive that suppressed nothing
pub fn unused_directive_diagnostic(directive: &Directive<'_>, keyword: &str, file: &Path) -> Diagnostic {
    let ids = directive.rule_ids();
    let message = if ids.is_empty() {
        format!(
            "Unused {keyword}-{} directive (no problems were reported).",
            directive.kind
        )
    } else {
        format!(
            "Unused {keyword}-{} directive (no problems were reported from '{}').",
            directive.kind,
            ids.join(", ")
        )
    };
    Diagnostic::new(
        UNUSED_DIRECTIVE_ID,
        Severity::Warning,
        &message,
        Location::from_source(file.to_path_buf(), directive.loc()),
    )
}

//! Applying rule fixes to stylesheets
//!
//! Every fix is a byte-range replacement in the linted text. Fixes in a
//! file are accepted in offset order and applied back to front; a fix
//! overlapping one already accepted is skipped and left for a later run.
//!
//! Fixes are classified as safe or unsafe:
//! - Safe fixes preserve the cascade and are applied by `--fix`
//! - Unsafe fixes may change what the page renders and need `--unsafe-fixes`

use crate::diagnostic::{Diagnostic, Fix, FixSafety, Location};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A fix waiting to be applied to a file
#[derive(Debug, Clone)]
pub struct PendingFix {
    pub file: PathBuf,
    pub location: Location,
    pub fix: Fix,
    /// Rule ID that generated this fix
    pub rule_id: String,
}

impl PendingFix {
    pub fn safety(&self) -> FixSafety {
        self.fix.safety
    }
}

/// Result of applying fixes
#[derive(Debug, Default)]
pub struct FixResult {
    /// Number of files modified
    pub files_modified: usize,
    /// Number of fixes applied
    pub fixes_applied: usize,
    pub safe_fixes_applied: usize,
    pub unsafe_fixes_applied: usize,
    /// Fixes that could not be applied (IO errors, stale or overlapping ranges)
    pub fixes_failed: usize,
    /// Number of fixes skipped (unsafe when not allowed)
    pub fixes_skipped: usize,
    pub errors: Vec<String>,
    /// Diff output (if diff mode enabled)
    pub diffs: HashMap<PathBuf, String>,
}

/// Fix mode options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FixMode {
    /// Apply only safe fixes (default)
    #[default]
    SafeOnly,
    /// Apply all fixes including unsafe
    All,
    /// Diff mode - show changes without applying
    Diff,
    /// Show fixes without applying
    ShowOnly,
}

/// Outcome of [`apply_fixes`] on one text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedFixes {
    pub output: String,
    /// Indices of the fixes that were applied
    pub applied: Vec<usize>,
    /// Indices of fixes dropped for overlapping or invalid ranges
    pub rejected: Vec<usize>,
}

/// Apply non-overlapping fixes to `text`
///
/// Fixes are taken in start-offset order. A fix whose range overlaps an
/// earlier accepted fix, runs past the end of the text, or splits a UTF-8
/// character is rejected.
pub fn apply_fixes(text: &str, fixes: &[&Fix]) -> AppliedFixes {
    let mut order: Vec<usize> = (0..fixes.len()).collect();
    order.sort_by_key(|&i| (fixes[i].start_offset, fixes[i].end_offset));

    let mut applied = Vec::new();
    let mut rejected = Vec::new();
    let mut cursor = 0;

    for i in order {
        let range = fixes[i].range();
        let valid = range.start >= cursor
            && range.start <= range.end
            && range.end <= text.len()
            && text.is_char_boundary(range.start)
            && text.is_char_boundary(range.end);
        if valid {
            cursor = range.end;
            applied.push(i);
        } else {
            rejected.push(i);
        }
    }

    let mut output = text.to_string();
    for &i in applied.iter().rev() {
        output.replace_range(fixes[i].range(), &fixes[i].replacement);
    }

    applied.sort_unstable();
    rejected.sort_unstable();
    AppliedFixes {
        output,
        applied,
        rejected,
    }
}

/// Auto-fixer that applies fixes to files
pub struct Fixer {
    /// Dry run mode (don't write changes)
    dry_run: bool,
    fixes_by_file: HashMap<PathBuf, Vec<PendingFix>>,
    mode: FixMode,
    include_unsafe: bool,
}

impl Fixer {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            fixes_by_file: HashMap::new(),
            mode: FixMode::SafeOnly,
            include_unsafe: false,
        }
    }

    pub fn with_mode(mut self, mode: FixMode) -> Self {
        self.mode = mode;
        self
    }

    /// Include unsafe fixes
    pub fn with_unsafe_fixes(mut self, include: bool) -> Self {
        self.include_unsafe = include;
        if include && self.mode == FixMode::SafeOnly {
            self.mode = FixMode::All;
        }
        self
    }

    pub fn with_diff_mode(mut self) -> Self {
        self.mode = FixMode::Diff;
        self
    }

    pub fn with_show_only(mut self) -> Self {
        self.mode = FixMode::ShowOnly;
        self
    }

    /// Collect fixes from diagnostics
    pub fn collect_from_diagnostics(&mut self, diagnostics: &[Diagnostic]) {
        for diag in diagnostics {
            if let Some(fix) = &diag.fix {
                self.add_fix(PendingFix {
                    file: diag.location.file.clone(),
                    location: diag.location.clone(),
                    fix: fix.clone(),
                    rule_id: diag.rule_id.clone(),
                });
            }
        }
    }

    pub fn add_fix(&mut self, fix: PendingFix) {
        self.fixes_by_file
            .entry(fix.file.clone())
            .or_default()
            .push(fix);
    }

    /// Check if a fix should be applied based on mode and safety
    fn should_apply_fix(&self, fix: &PendingFix) -> bool {
        match (self.mode, fix.safety()) {
            (_, FixSafety::Display) => false,
            (_, FixSafety::Safe) => true,
            (FixMode::All, FixSafety::Unsafe) => true,
            (FixMode::SafeOnly, FixSafety::Unsafe) => false,
            (FixMode::Diff | FixMode::ShowOnly, FixSafety::Unsafe) => self.include_unsafe,
        }
    }

    /// Apply all collected fixes
    pub fn apply_all(&self) -> FixResult {
        let mut result = FixResult::default();

        let mut files: Vec<_> = self.fixes_by_file.iter().collect();
        files.sort_by(|a, b| a.0.cmp(b.0));

        for (file, fixes) in files {
            let applicable: Vec<&PendingFix> =
                fixes.iter().filter(|f| self.should_apply_fix(f)).collect();
            result.fixes_skipped += fixes.len() - applicable.len();

            if self.mode == FixMode::ShowOnly {
                for fix in &applicable {
                    count_applied(&mut result, fix.safety());
                }
                continue;
            }

            if let Err(e) = self.apply_fixes_to_file(file, &applicable, &mut result) {
                result.fixes_failed += applicable.len();
                result.errors.push(format!("{}: {}", file.display(), e));
            }
        }

        result
    }

    /// Get all fixes that would be applied (for --show-fixes)
    pub fn get_pending_fixes(&self) -> Vec<&PendingFix> {
        let mut all_fixes: Vec<_> = self
            .fixes_by_file
            .values()
            .flatten()
            .filter(|fix| self.should_apply_fix(fix))
            .collect();
        all_fixes.sort_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then(a.fix.start_offset.cmp(&b.fix.start_offset))
        });
        all_fixes
    }

    /// Format fixes for display (--show-fixes)
    pub fn format_fixes(&self) -> String {
        let fixes = self.get_pending_fixes();
        if fixes.is_empty() {
            return "No fixes available.\n".to_string();
        }

        let mut output = format!("Found {} fix(es):\n\n", fixes.len());
        let mut current_file: Option<&PathBuf> = None;
        for fix in fixes {
            if current_file != Some(&fix.file) {
                current_file = Some(&fix.file);
                output.push_str(&format!("{}:\n", fix.file.display()));
            }
            output.push_str(&format!(
                "  {}:{}: [{}] {} - {}\n",
                fix.location.line,
                fix.location.column,
                fix.safety(),
                fix.rule_id,
                fix.fix.description
            ));
        }

        output
    }

    fn apply_fixes_to_file(
        &self,
        file: &Path,
        fixes: &[&PendingFix],
        result: &mut FixResult,
    ) -> Result<(), std::io::Error> {
        if fixes.is_empty() {
            return Ok(());
        }

        let content = std::fs::read_to_string(file)?;
        let edits: Vec<&Fix> = fixes.iter().map(|f| &f.fix).collect();
        let AppliedFixes {
            output,
            applied,
            rejected,
        } = apply_fixes(&content, &edits);

        for &i in &rejected {
            log::debug!(
                "{}: skipped overlapping fix from {}",
                file.display(),
                fixes[i].rule_id
            );
        }
        result.fixes_failed += rejected.len();

        if applied.is_empty() {
            return Ok(());
        }

        if self.mode == FixMode::Diff {
            let diff = generate_unified_diff(file, &content, &output);
            result.diffs.insert(file.to_path_buf(), diff);
        } else if !self.dry_run {
            std::fs::write(file, &output)?;
        }

        result.files_modified += 1;
        for &i in &applied {
            count_applied(result, fixes[i].safety());
        }
        Ok(())
    }

    pub fn pending_count(&self) -> usize {
        self.fixes_by_file.values().map(|v| v.len()).sum()
    }

    pub fn fixes_by_file(&self) -> &HashMap<PathBuf, Vec<PendingFix>> {
        &self.fixes_by_file
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn mode(&self) -> FixMode {
        self.mode
    }

    /// Format diff output for display
    pub fn format_diffs(&self, result: &FixResult) -> String {
        let mut files: Vec<_> = result.diffs.iter().collect();
        files.sort_by(|a, b| a.0.cmp(b.0));

        let mut output = String::new();
        for (file, diff) in files {
            output.push_str(&format!(
                "diff --cascade a/{} b/{}\n",
                file.display(),
                file.display()
            ));
            output.push_str(diff);
            output.push('\n');
        }
        output
    }
}

fn count_applied(result: &mut FixResult, safety: FixSafety) {
    result.fixes_applied += 1;
    if safety == FixSafety::Safe {
        result.safe_fixes_applied += 1;
    } else {
        result.unsafe_fixes_applied += 1;
    }
}

/// Unified diff with one hunk spanning the changed lines plus one line of context
pub fn generate_unified_diff(file: &Path, original: &str, modified: &str) -> String {
    let old: Vec<&str> = original.lines().collect();
    let new: Vec<&str> = modified.lines().collect();

    let mut diff = format!("--- a/{}\n+++ b/{}\n", file.display(), file.display());

    let prefix = old.iter().zip(&new).take_while(|(a, b)| a == b).count();
    if prefix == old.len() && prefix == new.len() {
        return diff;
    }
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let start = prefix.saturating_sub(1);
    let old_end = (old.len() - suffix + 1).min(old.len());
    let new_end = (new.len() - suffix + 1).min(new.len());

    diff.push_str(&format!(
        "@@ -{},{} +{},{} @@\n",
        start + 1,
        old_end - start,
        start + 1,
        new_end - start
    ));
    for line in &old[start..prefix] {
        diff.push_str(&format!(" {}\n", line));
    }
    for line in &old[prefix..old.len() - suffix] {
        diff.push_str(&format!("-{}\n", line));
    }
    for line in &new[prefix..new.len() - suffix] {
        diff.push_str(&format!("+{}\n", line));
    }
    for line in &old[old.len() - suffix..old_end] {
        diff.push_str(&format!(" {}\n", line));
    }

    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Severity;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn diagnostic(file: &Path, fix: Fix) -> Diagnostic {
        Diagnostic::new(
            "no-important",
            Severity::Warning,
            "m",
            Location::new(file.to_path_buf(), 1, 1),
        )
        .with_fix(fix)
    }

    #[test]
    fn test_fixer_new() {
        let fixer = Fixer::new(true);
        assert!(fixer.is_dry_run());
        assert_eq!(fixer.pending_count(), 0);
    }

    #[test]
    fn test_apply_fixes_in_offset_order() {
        let text = "a { color: red !important; margin: 0 !important }";
        let first = Fix::safe("drop", 14..25, "");
        let second = Fix::safe("drop", 36..47, "");
        let applied = apply_fixes(text, &[&second, &first]);
        assert_eq!(applied.output, "a { color: red; margin: 0 }");
        assert_eq!(applied.applied, vec![0, 1]);
        assert!(applied.rejected.is_empty());
    }

    #[test]
    fn test_apply_fixes_rejects_overlap_and_bad_ranges() {
        let text = "héllo";
        let keep = Fix::safe("x", 0..1, "H");
        let overlap = Fix::safe("y", 0..3, "");
        let split_char = Fix::safe("z", 2..3, "");
        let past_end = Fix::safe("w", 4..40, "");
        let applied = apply_fixes(text, &[&keep, &overlap, &split_char, &past_end]);
        assert_eq!(applied.output, "Héllo");
        assert_eq!(applied.applied, vec![0]);
        assert_eq!(applied.rejected, vec![1, 2, 3]);
    }

    #[test]
    fn test_apply_all_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.css");
        fs::write(&path, "a { color: red !important }\n").unwrap();

        let mut fixer = Fixer::new(false);
        fixer.collect_from_diagnostics(&[diagnostic(&path, Fix::safe("drop", 14..25, ""))]);
        let result = fixer.apply_all();

        assert_eq!(result.files_modified, 1);
        assert_eq!(result.safe_fixes_applied, 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "a { color: red }\n");
    }

    #[test]
    fn test_dry_run_and_diff_leave_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.css");
        let original = "a {\n  color: red !important;\n}\n";
        fs::write(&path, original).unwrap();

        let mut fixer = Fixer::new(false).with_diff_mode();
        fixer.collect_from_diagnostics(&[diagnostic(&path, Fix::safe("drop", 16..27, ""))]);
        let result = fixer.apply_all();

        assert_eq!(fs::read_to_string(&path).unwrap(), original);
        let diff = &result.diffs[&path];
        assert!(diff.contains("-  color: red !important;\n+  color: red;\n"), "{diff}");
        assert!(fixer.format_diffs(&result).starts_with("diff --cascade"));
    }

    #[test]
    fn test_safe_fix_filtering() {
        let path = PathBuf::from("missing.css");
        let diags = [
            diagnostic(&path, Fix::safe("s", 0..1, "")),
            diagnostic(&path, Fix::unsafe_fix("u", 2..3, "")),
        ];

        let mut safe_only = Fixer::new(true).with_show_only();
        safe_only.collect_from_diagnostics(&diags);
        let result = safe_only.apply_all();
        assert_eq!(result.fixes_applied, 1);
        assert_eq!(result.fixes_skipped, 1);

        let mut all = Fixer::new(true).with_unsafe_fixes(true).with_show_only();
        all.collect_from_diagnostics(&diags);
        assert_eq!(all.get_pending_fixes().len(), 2);
        assert!(all.format_fixes().contains("[unsafe] no-important - u"));
    }

    #[test]
    fn test_missing_file_counts_failures() {
        let mut fixer = Fixer::new(false);
        fixer.collect_from_diagnostics(&[diagnostic(
            Path::new("/no/such/file.css"),
            Fix::safe("s", 0..1, ""),
        )]);
        let result = fixer.apply_all();
        assert_eq!(result.fixes_failed, 1);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_generate_diff_identical() {
        let diff = generate_unified_diff(Path::new("a.css"), "a {}\n", "a {}\n");
        assert_eq!(diff, "--- a/a.css\n+++ b/a.css\n");
    }
}

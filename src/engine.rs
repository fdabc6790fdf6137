//! Core linter engine

use crate::ast::VisitorKeys;
use crate::config::Config;
use crate::diagnostic::{Diagnostic, Location, Severity};
use crate::directive::Problem;
use crate::parser::{self, ParseError, ParseOutcome};
use crate::rule::{Rule, RuleContext, RuleLevel, RuleSetting, RuleVisitor};
use crate::rules::builtin_rules;
use crate::source_code::{SourceCode, SourceCodeOptions, VirtualFile};
use crate::suppression::{unused_directive_diagnostic, Suppressions};
use crate::traverse::{Phase, TraversalError};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Rule id for files that could not be read
pub const FILE_READ_ERROR_ID: &str = "file-read-error";
/// Rule id for stylesheet syntax errors
pub const PARSE_ERROR_ID: &str = "parse-error";
/// Rule id for malformed directive and inline config comments
pub const INVALID_DIRECTIVE_ID: &str = "invalid-directive";
/// Rule id for trees that do not match the visitor keys
pub const INTERNAL_ERROR_ID: &str = "internal-error";

/// File extensions the engine lints
const EXTENSIONS: &[&str] = &["css"];

/// Per-rule timing statistics
#[derive(Debug, Clone, Default)]
pub struct RuleTiming {
    pub rule_id: String,
    /// Total time spent in the rule's visitor callbacks
    pub total_time: Duration,
    /// Number of enter/exit callbacks
    pub evaluation_count: usize,
    /// Number of diagnostics reported
    pub match_count: usize,
}

impl RuleTiming {
    pub fn new(rule_id: &str) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            ..Default::default()
        }
    }

    /// Average time per callback
    pub fn avg_time(&self) -> Duration {
        if self.evaluation_count > 0 {
            self.total_time / self.evaluation_count as u32
        } else {
            Duration::ZERO
        }
    }
}

/// Result of linting operation
#[derive(Debug, Default)]
pub struct LintResult {
    pub diagnostics: Vec<Diagnostic>,
    pub files_processed: usize,
    pub files_with_errors: usize,
    pub files_with_warnings: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
    pub duration: Duration,
    /// Per-rule timing statistics (rule_id -> timing)
    pub rule_timings: HashMap<String, RuleTiming>,
}

impl LintResult {
    /// Result for one file with the given diagnostics
    pub fn for_file(diagnostics: Vec<Diagnostic>) -> Self {
        let mut result = LintResult {
            files_processed: 1,
            ..LintResult::default()
        };
        for diag in &diagnostics {
            match diag.severity {
                Severity::Error => result.error_count += 1,
                Severity::Warning => result.warning_count += 1,
                Severity::Info => result.info_count += 1,
            }
        }
        if result.error_count > 0 {
            result.files_with_errors = 1;
        }
        if result.warning_count > 0 {
            result.files_with_warnings = 1;
        }
        result.diagnostics = diagnostics;
        result
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// No errors or warnings
    pub fn is_clean(&self) -> bool {
        self.error_count == 0 && self.warning_count == 0
    }

    /// Get exit code (0 = success, 1 = warnings, 2 = errors)
    pub fn exit_code(&self) -> i32 {
        if self.error_count > 0 {
            2
        } else if self.warning_count > 0 {
            1
        } else {
            0
        }
    }

    /// Merge another result into this one
    pub fn merge(&mut self, other: LintResult) {
        self.diagnostics.extend(other.diagnostics);
        self.files_processed += other.files_processed;
        self.files_with_errors += other.files_with_errors;
        self.files_with_warnings += other.files_with_warnings;
        self.error_count += other.error_count;
        self.warning_count += other.warning_count;
        self.info_count += other.info_count;

        for (rule_id, timing) in other.rule_timings {
            let entry = self
                .rule_timings
                .entry(rule_id)
                .or_insert_with(|| RuleTiming::new(&timing.rule_id));
            entry.total_time += timing.total_time;
            entry.evaluation_count += timing.evaluation_count;
            entry.match_count += timing.match_count;
        }
    }

    /// Get rule timings sorted by total time (descending)
    pub fn sorted_timings(&self) -> Vec<&RuleTiming> {
        let mut timings: Vec<_> = self.rule_timings.values().collect();
        timings.sort_by(|a, b| b.total_time.cmp(&a.total_time));
        timings
    }

    /// Format timing statistics as a table
    pub fn format_timings(&self) -> String {
        let timings = self.sorted_timings();
        if timings.is_empty() {
            return "No timing data available".to_string();
        }

        let mut output = String::from("Rule Timing Statistics:\n");
        output.push_str(&format!(
            "{:<32} {:>12} {:>12} {:>10} {:>10}\n",
            "Rule ID", "Total", "Avg", "Calls", "Reports"
        ));
        output.push_str(&"-".repeat(80));
        output.push('\n');

        for timing in timings {
            let total_ms = timing.total_time.as_secs_f64() * 1000.0;
            let avg_us = timing.avg_time().as_secs_f64() * 1_000_000.0;
            output.push_str(&format!(
                "{:<32} {:>10.2}ms {:>10.2}µs {:>10} {:>10}\n",
                timing.rule_id, total_ms, avg_us, timing.evaluation_count, timing.match_count
            ));
        }

        output
    }
}

/// A rule instance running over one file
struct ActiveRule<'s> {
    visitor: Box<dyn RuleVisitor>,
    cx: RuleContext<'s>,
    timing: RuleTiming,
}

/// The main linter engine
pub struct Engine {
    config: Config,
    rules: Vec<Arc<dyn Rule>>,
    /// Number of context lines to attach to diagnostics
    context_lines: usize,
}

impl Engine {
    /// Engine running the built-in rules
    pub fn new(config: Config) -> Self {
        Self::with_rules(config, builtin_rules())
    }

    pub fn with_rules(config: Config, rules: Vec<Arc<dyn Rule>>) -> Self {
        Self {
            config,
            rules,
            context_lines: 0,
        }
    }

    pub fn with_context_lines(mut self, lines: usize) -> Self {
        self.context_lines = lines;
        self
    }

    /// Add a rule, replacing any rule with the same id
    pub fn register_rule(&mut self, rule: Arc<dyn Rule>) {
        let id = rule.meta().id;
        self.rules.retain(|r| r.meta().id != id);
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[Arc<dyn Rule>] {
        &self.rules
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether the file has an extension the engine lints
    pub fn can_lint(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
    }

    /// Lint multiple files
    pub fn lint(&self, files: &[PathBuf]) -> LintResult {
        let start = Instant::now();

        let results: Vec<LintResult> = if self.config.engine.parallel {
            let jobs = if self.config.engine.jobs > 0 {
                self.config.engine.jobs
            } else {
                num_cpus::get()
            };
            match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
                Ok(pool) => pool.install(|| files.par_iter().map(|f| self.lint_file(f)).collect()),
                Err(e) => {
                    log::warn!("could not build a {jobs}-thread pool ({e}), using the global pool");
                    files.par_iter().map(|f| self.lint_file(f)).collect()
                }
            }
        } else {
            files.iter().map(|f| self.lint_file(f)).collect()
        };

        let mut combined = LintResult::default();
        for result in results {
            combined.merge(result);
        }

        combined.duration = start.elapsed();
        combined
    }

    /// Lint a single file from disk
    pub fn lint_file(&self, path: &Path) -> LintResult {
        if !Self::can_lint(path) {
            log::debug!("skipping {}: unsupported extension", path.display());
            return LintResult::default();
        }

        match std::fs::read_to_string(path) {
            Ok(body) => self.lint_source(VirtualFile::new(path, body)),
            Err(e) => LintResult::for_file(vec![Diagnostic::new(
                FILE_READ_ERROR_ID,
                Severity::Error,
                &format!("Failed to read file: {}", e),
                Location::new(path.to_path_buf(), 0, 0),
            )]),
        }
    }

    /// Parse a file into a [`SourceCode`] configured for this engine
    pub fn build_source(&self, file: VirtualFile) -> Result<SourceCode, Vec<ParseError>> {
        let options = SourceCodeOptions {
            directive_keyword: self.config.inline_config.keyword.clone(),
            ..SourceCodeOptions::default()
        };
        match parser::parse_with_options(&file.body, &options) {
            ParseOutcome::Ok { ast, comments } => {
                Ok(SourceCode::with_options(
                    file,
                    ast,
                    comments,
                    VisitorKeys::css(),
                    options,
                ))
            }
            ParseOutcome::Err { errors } => Err(errors),
        }
    }

    /// Lint in-memory text
    pub fn lint_source(&self, file: VirtualFile) -> LintResult {
        let path = file.path.clone();
        let source = match self.build_source(file) {
            Ok(source) => source,
            Err(errors) => return LintResult::for_file(parse_error_diagnostics(&path, &errors)),
        };

        let inline = &self.config.inline_config;
        let mut settings = self.configured_settings(&path);
        let mut problems: Vec<Problem> = Vec::new();
        if inline.enabled {
            self.apply_inline_settings(&source, &mut settings, &mut problems);
        }

        let (rule_diagnostics, timings) = match self.run_rules(&source, &settings) {
            Ok(ran) => ran,
            Err(e) => {
                log::error!("{}: {}", path.display(), e);
                return LintResult::for_file(vec![Diagnostic::new(
                    INTERNAL_ERROR_ID,
                    Severity::Error,
                    &format!("Internal error: {}", e),
                    Location::new(path, 0, 0),
                )]);
            }
        };

        let mut diagnostics = if inline.enabled {
            let report = source.get_disable_directives();
            problems.extend(report.problems);
            let outcome = Suppressions::new(&report.directives).filter(rule_diagnostics);
            log::debug!(
                "{}: {} diagnostics suppressed by directives",
                path.display(),
                outcome.suppressed.len()
            );
            let mut kept = outcome.kept;
            if inline.report_unused_directives {
                kept.extend(outcome.unused.iter().map(|&i| {
                    unused_directive_diagnostic(&report.directives[i], &inline.keyword, &path)
                }));
            }
            kept
        } else {
            rule_diagnostics
        };

        diagnostics.extend(problems.iter().map(|p| problem_diagnostic(&source, p)));
        diagnostics.sort_by_key(|d| (d.location.line, d.location.column));

        if self.context_lines > 0 {
            let lines = source.lines();
            diagnostics = diagnostics
                .into_iter()
                .map(|d| d.with_context(&lines, self.context_lines))
                .collect();
        }

        let mut result = LintResult::for_file(diagnostics);
        result.rule_timings = timings;
        result
    }

    /// Settings from configuration alone, keyed by rule id
    fn configured_settings(&self, path: &Path) -> HashMap<String, RuleSetting> {
        let mut settings = HashMap::new();
        for rule in &self.rules {
            let meta = rule.meta();
            let enabled = self.config.is_rule_enabled(meta.id)
                && self.config.is_category_enabled(meta.category)
                && !self.config.should_ignore_rule_for_file(meta.id, path);
            let setting = if enabled {
                let severity = self
                    .config
                    .get_severity_override(meta.id)
                    .unwrap_or(meta.severity);
                RuleSetting {
                    options: self.config.get_rule_options(meta.id).to_vec(),
                    ..RuleSetting::on(severity)
                }
            } else {
                RuleSetting::off()
            };
            settings.insert(meta.id.to_string(), setting);
        }
        settings
    }

    /// Layer `<keyword> rule: setting` comments over the configured settings
    fn apply_inline_settings(
        &self,
        source: &SourceCode,
        settings: &mut HashMap<String, RuleSetting>,
        problems: &mut Vec<Problem>,
    ) {
        let report = source.apply_inline_config();
        problems.extend(report.problems);

        for config in report.configs {
            for (rule_id, value) in &config.rules {
                if !settings.contains_key(rule_id) {
                    problems.push(Problem::new(
                        format!("Definition for rule '{}' was not found.", rule_id),
                        config.loc,
                    ));
                    continue;
                }
                match RuleSetting::from_value(rule_id, value) {
                    Ok(setting) => {
                        log::trace!("inline setting for {}: {:?}", rule_id, setting.level);
                        settings.insert(rule_id.clone(), setting);
                    }
                    Err(message) => problems.push(Problem::new(message, config.loc)),
                }
            }
        }
    }

    /// Replay the traversal once, dispatching each step to the rules listening for its node type
    fn run_rules<'s>(
        &self,
        source: &'s SourceCode,
        settings: &HashMap<String, RuleSetting>,
    ) -> Result<(Vec<Diagnostic>, HashMap<String, RuleTiming>), TraversalError> {
        let mut active: Vec<ActiveRule<'s>> = Vec::new();
        let mut dispatch: HashMap<&str, Vec<usize>> = HashMap::new();

        for rule in &self.rules {
            let meta = rule.meta();
            let Some(setting) = settings.get(meta.id) else {
                continue;
            };
            let RuleLevel::On(severity) = setting.level else {
                continue;
            };
            for kind in meta.node_types {
                dispatch.entry(*kind).or_default().push(active.len());
            }
            active.push(ActiveRule {
                visitor: rule.create(&setting.options),
                cx: RuleContext::new(source, meta, severity),
                timing: RuleTiming::new(meta.id),
            });
        }

        let steps = source.traverse()?;
        if active.is_empty() {
            return Ok((Vec::new(), HashMap::new()));
        }

        for step in steps {
            let Some(node) = source.node(step.target) else {
                continue;
            };
            let Some(indices) = dispatch.get(node.kind()) else {
                continue;
            };
            for &i in indices {
                let rule = &mut active[i];
                let start = Instant::now();
                match step.phase {
                    Phase::Enter => rule.visitor.enter(node, &mut rule.cx),
                    Phase::Exit => rule.visitor.exit(node, &mut rule.cx),
                }
                rule.timing.total_time += start.elapsed();
                rule.timing.evaluation_count += 1;
            }
        }

        let mut diagnostics = Vec::new();
        let mut timings = HashMap::new();
        for ActiveRule { cx, mut timing, .. } in active {
            let reported = cx.into_diagnostics();
            timing.match_count = reported.len();
            diagnostics.extend(reported);
            timings.insert(timing.rule_id.clone(), timing);
        }
        Ok((diagnostics, timings))
    }
}

fn parse_error_diagnostics(path: &Path, errors: &[ParseError]) -> Vec<Diagnostic> {
    errors
        .iter()
        .map(|e| {
            Diagnostic::new(
                PARSE_ERROR_ID,
                Severity::Error,
                &format!("Parse error: {}", e.message),
                Location::new(path.to_path_buf(), e.line, e.column),
            )
        })
        .collect()
}

fn problem_diagnostic(source: &SourceCode, problem: &Problem) -> Diagnostic {
    let location = Location::from_source(source.path().to_path_buf(), &problem.loc);
    let rule_id = problem.rule_id.as_deref().unwrap_or(INVALID_DIRECTIVE_ID);
    let mut diagnostic = Diagnostic::new(rule_id, Severity::Error, &problem.message, location);
    if let Some(line) = source.line(problem.loc.start.line) {
        diagnostic = diagnostic.with_source_line(line);
    }
    diagnostic
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Node;
    use crate::diagnostic::Fix;
    use crate::rule::{RuleCategory, RuleMeta};
    use serde_json::Value;

    fn lint(text: &str) -> LintResult {
        Engine::new(Config::default()).lint_source(VirtualFile::new("test.css", text))
    }

    fn rule_ids(result: &LintResult) -> Vec<&str> {
        result.diagnostics.iter().map(|d| d.rule_id.as_str()).collect()
    }

    #[test]
    fn test_lint_result_exit_code() {
        let mut result = LintResult::default();
        assert_eq!(result.exit_code(), 0);

        result.warning_count = 1;
        assert_eq!(result.exit_code(), 1);

        result.error_count = 1;
        assert_eq!(result.exit_code(), 2);
        assert!(result.has_errors());
    }

    #[test]
    fn test_lint_result_merge() {
        let mut result1 = LintResult {
            files_processed: 1,
            error_count: 2,
            ..LintResult::default()
        };
        let mut result2 = LintResult {
            files_processed: 1,
            warning_count: 3,
            ..LintResult::default()
        };
        result2
            .rule_timings
            .insert("a".into(), RuleTiming::new("a"));
        result1.rule_timings.insert("a".into(), RuleTiming::new("a"));

        result1.merge(result2);
        assert_eq!(result1.files_processed, 2);
        assert_eq!(result1.error_count, 2);
        assert_eq!(result1.warning_count, 3);
        assert_eq!(result1.rule_timings.len(), 1);
    }

    #[test]
    fn test_builtin_rules_report() {
        let result = lint("a {}\nb { color: red; color: blue !important }");
        assert_eq!(
            rule_ids(&result),
            vec!["no-empty-blocks", "no-important", "no-duplicate-properties"]
        );
        assert_eq!(result.error_count, 1);
        assert_eq!(result.warning_count, 2);
        assert_eq!(result.exit_code(), 2);
        assert_eq!(result.rule_timings.len(), 4);
    }

    #[test]
    fn test_disable_directive_suppresses() {
        let text = "/* eslint-disable no-empty-blocks -- generated */\na {}\n/* eslint-enable */\nb {}";
        let result = lint(text);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].location.line, 4);
    }

    #[test]
    fn test_multiline_disable_line_is_reported() {
        let result = lint("a { color: red } /* eslint-disable-line\n */");
        assert_eq!(rule_ids(&result), vec![INVALID_DIRECTIVE_ID]);
        assert!(result.diagnostics[0]
            .message
            .contains("should not span multiple lines"));
    }

    #[test]
    fn test_inline_config_changes_settings() {
        let result = lint("/* eslint no-empty-blocks: off, no-important: [error] */\na {}\nb { color: red !important }");
        assert_eq!(rule_ids(&result), vec!["no-important"]);
        assert_eq!(result.diagnostics[0].severity, Severity::Error);
    }

    #[test]
    fn test_inline_config_problems() {
        let result = lint("/* eslint rule-name: [error */\n/* eslint nope: off */\n/* eslint no-important: 7 */");
        assert_eq!(result.diagnostics.len(), 3);
        assert!(result.diagnostics[0].message.starts_with("Failed to parse"));
        assert_eq!(
            result.diagnostics[1].message,
            "Definition for rule 'nope' was not found."
        );
        assert!(result.diagnostics[2].message.contains("is invalid"));
        assert!(result
            .diagnostics
            .iter()
            .all(|d| d.rule_id == INVALID_DIRECTIVE_ID));
    }

    #[test]
    fn test_no_inline_config() {
        let mut config = Config::default();
        config.inline_config.enabled = false;
        let engine = Engine::new(config);
        let result = engine.lint_source(VirtualFile::new(
            "a.css",
            "/* eslint-disable */\n/* eslint rule: [ */\na {}",
        ));
        assert_eq!(rule_ids(&result), vec!["no-empty-blocks"]);
    }

    #[test]
    fn test_report_unused_directives() {
        let mut config = Config::default();
        config.inline_config.report_unused_directives = true;
        let engine = Engine::new(config);
        let result = engine.lint_source(VirtualFile::new(
            "a.css",
            "/* eslint-disable-next-line no-important */\na { color: red }",
        ));
        assert_eq!(rule_ids(&result), vec!["unused-directive"]);
        assert_eq!(result.warning_count, 1);
    }

    #[test]
    fn test_deeply_nested_stylesheet() {
        let depth = 5000;
        let text = "a{".repeat(depth) + &"}".repeat(depth);
        let result = lint(&text);
        assert_eq!(rule_ids(&result), vec![PARSE_ERROR_ID]);
        assert!(result.diagnostics[0].message.ends_with("Nesting too deep"));
        assert_eq!(result.exit_code(), 2);
    }

    #[test]
    fn test_parse_error() {
        let result = lint("a { color: red");
        assert_eq!(rule_ids(&result), vec![PARSE_ERROR_ID]);
        assert_eq!(result.diagnostics[0].location.line, 1);
        assert_eq!(result.files_with_errors, 1);
    }

    #[test]
    fn test_config_filters_rules() {
        let mut config = Config::default();
        config.rules.disabled.push("no-empty-blocks".into());
        config
            .rules
            .severity
            .insert("no-important".into(), Severity::Info);
        let engine = Engine::new(config);
        let result = engine.lint_source(VirtualFile::new("a.css", "a {}\nb { c: d !important }"));
        assert_eq!(rule_ids(&result), vec!["no-important"]);
        assert_eq!(result.info_count, 1);
        assert_eq!(result.exit_code(), 0);
    }

    #[test]
    fn test_unsupported_and_missing_files() {
        let engine = Engine::new(Config::default());
        let skipped = engine.lint_file(Path::new("readme.md"));
        assert_eq!(skipped.files_processed, 0);

        let missing = engine.lint_file(Path::new("/definitely/not/here.css"));
        assert_eq!(rule_ids(&missing), vec![FILE_READ_ERROR_ID]);
    }

    struct Counter;

    static COUNTER_META: RuleMeta = RuleMeta {
        id: "count-steps",
        description: "Records enter/exit order",
        severity: Severity::Info,
        category: RuleCategory::Style,
        node_types: &["Rule", "Block"],
        fixable: true,
        docs: None,
    };

    struct CounterVisitor {
        depth: usize,
    }

    impl Rule for Counter {
        fn meta(&self) -> &RuleMeta {
            &COUNTER_META
        }

        fn create(&self, options: &[Value]) -> Box<dyn RuleVisitor> {
            assert!(options.is_empty());
            Box::new(CounterVisitor { depth: 0 })
        }
    }

    impl RuleVisitor for CounterVisitor {
        fn enter(&mut self, node: &Node, cx: &mut RuleContext<'_>) {
            self.depth += 1;
            if node.kind() == "Block" {
                let parent = cx.source_code().get_parent(node).map(|p| p.kind().to_string());
                let range = cx.source_code().get_range(node);
                cx.report_with_fix(
                    node,
                    &format!("depth {} under {:?}", self.depth, parent),
                    Fix::safe("noop", range, cx.source_code().get_text(node)),
                );
            }
        }

        fn exit(&mut self, _node: &Node, _cx: &mut RuleContext<'_>) {
            self.depth -= 1;
        }
    }

    #[test]
    fn test_custom_rule_dispatch() {
        let engine = Engine::with_rules(Config::default(), vec![Arc::new(Counter)]);
        let result = engine.lint_source(VirtualFile::new("a.css", "a { b { } }"));
        let messages: Vec<_> = result.diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["depth 2 under Some(\"Rule\")", "depth 4 under Some(\"Rule\")"]
        );
        let timing = &result.rule_timings["count-steps"];
        assert_eq!(timing.evaluation_count, 8);
        assert_eq!(timing.match_count, 2);
    }

    #[test]
    fn test_register_rule_replaces_same_id() {
        let mut engine = Engine::new(Config::default());
        let before = engine.rules().len();
        engine.register_rule(Arc::new(crate::rules::NoImportant));
        assert_eq!(engine.rules().len(), before);
        engine.register_rule(Arc::new(Counter));
        assert_eq!(engine.rules().len(), before + 1);
    }
}

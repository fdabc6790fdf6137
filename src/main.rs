//! cascade - stylesheet linter CLI

use cascade_lint::config::{ColorMode, Config, OutputFormat};
use cascade_lint::engine::Engine;
use cascade_lint::fixer::{FixMode, Fixer};
use cascade_lint::output::formatter_for;
use cascade_lint::rule::Rule;
use cascade_lint::source_code::VirtualFile;
use cascade_lint::Severity;
use clap::{Parser, ValueEnum};
use colored::Colorize;
use glob::glob;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(
    name = "cascade",
    version,
    about = "Stylesheet linter",
    long_about = "A fast stylesheet linter with eslint-style directive comments."
)]
struct Cli {
    /// Files, directories or glob patterns to lint
    files: Vec<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<Format>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Disable specific rules (comma-separated)
    #[arg(long, value_delimiter = ',')]
    disable: Option<Vec<String>>,

    /// Only enable specific rules (comma-separated)
    #[arg(long, value_delimiter = ',')]
    select: Option<Vec<String>>,

    /// Ignore directive and inline config comments
    #[arg(long)]
    no_inline_config: bool,

    /// Warn about disable directives that suppress nothing
    #[arg(long)]
    report_unused_directives: bool,

    /// Auto-fix issues where possible (dry-run by default, use with --write to apply)
    #[arg(long)]
    fix: bool,

    /// Write fixes to files (requires --fix)
    #[arg(long, requires = "fix")]
    write: bool,

    /// Show diff of changes instead of applying fixes
    #[arg(long)]
    diff: bool,

    /// Show all fixes that would be applied
    #[arg(long)]
    show_fixes: bool,

    /// Include unsafe fixes
    #[arg(long)]
    unsafe_fixes: bool,

    /// List available rules and exit
    #[arg(long)]
    list_rules: bool,

    /// Print the traversal steps of one file and exit
    #[arg(long, value_name = "FILE")]
    print_steps: Option<PathBuf>,

    /// Exit with 0 even if errors are found
    #[arg(long)]
    exit_zero: bool,

    /// Show source context lines around diagnostics
    #[arg(long, default_value = "0")]
    context: usize,

    /// Show per-rule timing statistics
    #[arg(long)]
    timing: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
    Compact,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
            Format::Compact => OutputFormat::Compact,
        }
    }
}

fn fail(message: &str) -> ! {
    eprintln!("{}: {}", "error".red().bold(), message);
    process::exit(1);
}

fn print_rule(rule: &dyn Rule, config: &Config) {
    let meta = rule.meta();
    let severity = config.get_severity_override(meta.id).unwrap_or(meta.severity);
    let severity = match severity {
        Severity::Error => "error".red(),
        Severity::Warning => "warning".yellow(),
        Severity::Info => "info".blue(),
    };
    let state = if config.is_rule_enabled(meta.id) && config.is_category_enabled(meta.category) {
        "".normal()
    } else {
        " [off]".dimmed()
    };
    let fixable = if meta.fixable { " [fix]".green() } else { "".normal() };

    println!(
        "  {} [{}] ({}){}{}",
        meta.id.cyan(),
        severity,
        meta.category,
        fixable,
        state
    );
    println!("    {}", meta.description);
    if let Some(docs) = meta.docs {
        println!("    {}", docs.dimmed());
    }
}

/// Expand CLI arguments into lintable files
fn collect_files(patterns: &[String], config: &Config) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let path = Path::new(pattern);
        let expanded: Vec<String> = if path.is_dir() {
            config
                .files
                .include
                .iter()
                .map(|include| path.join(include).to_string_lossy().into_owned())
                .collect()
        } else {
            vec![pattern.clone()]
        };

        for pattern in expanded {
            match glob(&pattern) {
                Ok(paths) => files.extend(
                    paths
                        .flatten()
                        .filter(|entry| entry.is_file() && !config.is_file_excluded(entry)),
                ),
                Err(e) => fail(&format!("Invalid pattern '{}': {}", pattern, e)),
            }
        }
    }

    files.sort();
    files.dedup();
    files
}

fn print_steps(engine: &Engine, path: &Path) -> i32 {
    let body = match std::fs::read_to_string(path) {
        Ok(body) => body,
        Err(e) => fail(&format!("Failed to read {}: {}", path.display(), e)),
    };

    let source = match engine.build_source(VirtualFile::new(path, body)) {
        Ok(source) => source,
        Err(errors) => {
            for e in errors {
                eprintln!("{}:{}:{}: {}", path.display(), e.line, e.column, e.message);
            }
            return 2;
        }
    };

    let steps = match source.traverse() {
        Ok(steps) => steps,
        Err(e) => fail(&e.to_string()),
    };

    for step in steps {
        let Some(node) = source.node(step.target) else {
            continue;
        };
        let depth = source.get_ancestors(node).len();
        let start = node.loc().start;
        println!(
            "{:<5} {}{} {}:{}",
            step.phase.to_string(),
            "  ".repeat(depth),
            node.kind(),
            start.line,
            start.column
        );
    }
    0
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(config_path) => Config::load(config_path)
            .unwrap_or_else(|e| fail(&format!("Failed to load config: {}", e))),
        None => Config::load_default().unwrap_or_else(|e| {
            log::warn!("ignoring default configuration: {}", e);
            Config::default()
        }),
    };

    config.merge_cli(
        cli.format.map(OutputFormat::from),
        cli.verbose.then_some(true),
        cli.jobs,
        cli.disable.clone(),
        cli.select.clone(),
    );
    if cli.no_inline_config {
        config.inline_config.enabled = false;
    }
    if cli.report_unused_directives {
        config.inline_config.report_unused_directives = true;
    }

    let use_color = !cli.no_color && config.output.color != ColorMode::Never;
    if !use_color {
        colored::control::set_override(false);
    } else if config.output.color == ColorMode::Always {
        colored::control::set_override(true);
    }

    let engine = Engine::new(config).with_context_lines(cli.context);

    if cli.list_rules {
        println!("{}", "Available rules:".bold());
        for rule in engine.rules() {
            print_rule(rule.as_ref(), engine.config());
        }
        return;
    }

    if let Some(path) = &cli.print_steps {
        process::exit(print_steps(&engine, path));
    }

    let files = collect_files(&cli.files, engine.config());
    if files.is_empty() {
        fail("No files found to lint");
    }

    let verbose = engine.config().output.verbose;
    if verbose {
        eprintln!("Linting {} files...", files.len());
    }

    let result = engine.lint(&files);

    if cli.fix || cli.diff || cli.show_fixes {
        let mode = if cli.show_fixes {
            FixMode::ShowOnly
        } else if cli.diff {
            FixMode::Diff
        } else if cli.unsafe_fixes {
            FixMode::All
        } else {
            FixMode::SafeOnly
        };
        let mut fixer = Fixer::new(!cli.write)
            .with_mode(mode)
            .with_unsafe_fixes(cli.unsafe_fixes);
        fixer.collect_from_diagnostics(&result.diagnostics);

        if cli.show_fixes {
            print!("{}", fixer.format_fixes());
        } else if fixer.pending_count() > 0 {
            let fix_result = fixer.apply_all();
            if mode == FixMode::Diff {
                print!("{}", fixer.format_diffs(&fix_result));
            } else if fixer.is_dry_run() {
                eprintln!(
                    "Would apply {} fixes ({} safe, {} unsafe)",
                    fix_result.fixes_applied,
                    fix_result.safe_fixes_applied,
                    fix_result.unsafe_fixes_applied
                );
                eprintln!("Use --write to apply fixes");
            } else {
                eprintln!(
                    "Applied {} fixes to {} files ({} safe, {} unsafe)",
                    fix_result.fixes_applied,
                    fix_result.files_modified,
                    fix_result.safe_fixes_applied,
                    fix_result.unsafe_fixes_applied
                );
            }
            if fix_result.fixes_failed > 0 {
                eprintln!(
                    "{}: {} fixes failed",
                    "warning".yellow(),
                    fix_result.fixes_failed
                );
                for error in &fix_result.errors {
                    eprintln!("  {}", error);
                }
            }
            if fix_result.fixes_skipped > 0 {
                eprintln!(
                    "{}: {} unsafe fixes skipped (use --unsafe-fixes to include)",
                    "note".blue(),
                    fix_result.fixes_skipped
                );
            }
        } else if verbose {
            eprintln!("No auto-fixes available");
        }
    }

    let formatter = formatter_for(engine.config().output.format, use_color, verbose);
    print!("{}", formatter.format(&result));

    if cli.timing {
        eprintln!();
        eprintln!("{}", result.format_timings());
    }

    let exit_code = if cli.exit_zero { 0 } else { result.exit_code() };
    process::exit(exit_code);
}

//! Configuration system for the linter
//!
//! Reads configuration from:
//! - `.cascaderc.yaml` / `.cascaderc.json` / `cascade.yaml` (project-level)
//! - the same names in the home directory (user-level)

use crate::diagnostic::Severity;
use crate::directive::DEFAULT_KEYWORD;
use crate::rule::RuleCategory;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lint files on a thread pool
    pub parallel: bool,

    /// Number of parallel jobs (0 = one per CPU)
    pub jobs: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            jobs: 0,
        }
    }
}

/// Output settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub color: ColorMode,
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Compact,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "compact" => Ok(OutputFormat::Compact),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Color mode options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

/// File handling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            include: vec!["**/*.css".to_string()],
            exclude: vec![
                "**/*.min.css".to_string(),
                "**/node_modules/**".to_string(),
                "**/target/**".to_string(),
            ],
        }
    }
}

/// Rule configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub disabled: Vec<String>,

    /// Enabled rules (empty = all)
    pub enabled: Vec<String>,

    /// Severity overrides (rule_id -> severity)
    pub severity: HashMap<String, Severity>,

    /// Rule options (rule_id -> option list)
    pub options: HashMap<String, Vec<serde_json::Value>>,

    /// Per-file rule ignores (glob pattern -> rule IDs, or `all`)
    pub per_file: HashMap<String, Vec<String>>,
}

/// Directive comment handling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InlineConfigSettings {
    /// Honour directive comments at all
    pub enabled: bool,

    /// Word that starts a directive (`<keyword>-disable`, `<keyword> rule: off`);
    /// lowercase letters and dashes only
    pub keyword: String,

    /// Warn about disable directives that suppress nothing
    pub report_unused_directives: bool,
}

impl Default for InlineConfigSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            keyword: DEFAULT_KEYWORD.to_string(),
            report_unused_directives: false,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration files or presets to build on
    pub extends: Vec<String>,

    pub engine: EngineConfig,
    pub output: OutputConfig,
    pub files: FilesConfig,
    pub rules: RulesConfig,
    pub inline_config: InlineConfigSettings,

    /// Rule categories to run (empty = all)
    pub categories: Vec<RuleCategory>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a preset configuration by name
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "recommended" => Some(Self::preset_recommended()),
            "strict" => Some(Self::preset_strict()),
            "minimal" => Some(Self::preset_minimal()),
            _ => None,
        }
    }

    /// Everything except policy restrictions
    fn preset_recommended() -> Self {
        Self {
            categories: vec![
                RuleCategory::Correctness,
                RuleCategory::Suspicious,
                RuleCategory::Style,
            ],
            ..Self::default()
        }
    }

    /// Every rule, and unused directives are reported
    fn preset_strict() -> Self {
        let mut config = Self::default();
        config.inline_config.report_unused_directives = true;
        config
    }

    /// Only rules that catch definite mistakes
    fn preset_minimal() -> Self {
        Self {
            categories: vec![RuleCategory::Correctness],
            ..Self::default()
        }
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with_depth(path, 0)
    }

    /// Load with recursion depth limit (to prevent infinite loops)
    fn load_with_depth(path: &Path, depth: usize) -> Result<Self, ConfigError> {
        const MAX_DEPTH: usize = 10;
        if depth >= MAX_DEPTH {
            return Err(ConfigError::Invalid(
                "Maximum config inheritance depth exceeded".to_string(),
            ));
        }

        let content = std::fs::read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let mut config: Self = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "Unknown config file format: {}",
                    ext
                )))
            }
        };
        log::debug!("loaded config from {}", path.display());

        if !config.extends.is_empty() {
            let base_dir = path.parent().unwrap_or(Path::new("."));
            let mut base_config = Self::default();

            for extend in &config.extends.clone() {
                let extended = if let Some(preset) = Self::preset(extend) {
                    preset
                } else {
                    let extend_path = if Path::new(extend).is_absolute() {
                        PathBuf::from(extend)
                    } else {
                        base_dir.join(extend)
                    };
                    Self::load_with_depth(&extend_path, depth + 1)?
                };
                base_config.merge(extended);
            }

            base_config.merge(config);
            config = base_config;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let keyword = &self.inline_config.keyword;
        let well_formed = !keyword.is_empty()
            && keyword.split('-').all(|part| {
                !part.is_empty() && part.bytes().all(|b| b.is_ascii_lowercase())
            });
        if !well_formed {
            return Err(ConfigError::Invalid(format!(
                "inline_config.keyword must be lowercase words joined by dashes, got '{}'",
                keyword
            )));
        }
        Ok(())
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Self) {
        if other.engine.jobs != 0 {
            self.engine.jobs = other.engine.jobs;
        }
        self.engine.parallel = other.engine.parallel;

        if other.output.format != OutputFormat::Text {
            self.output.format = other.output.format;
        }
        if other.output.verbose {
            self.output.verbose = true;
        }
        if other.output.color != ColorMode::Auto {
            self.output.color = other.output.color;
        }

        self.files.include.extend(other.files.include);
        self.files.exclude.extend(other.files.exclude);
        dedup_patterns(&mut self.files.include);
        dedup_patterns(&mut self.files.exclude);

        self.rules.disabled.extend(other.rules.disabled);
        dedup_patterns(&mut self.rules.disabled);
        if !other.rules.enabled.is_empty() {
            self.rules.enabled = other.rules.enabled;
        }
        self.rules.severity.extend(other.rules.severity);
        self.rules.options.extend(other.rules.options);
        for (pattern, rules) in other.rules.per_file {
            self.rules.per_file.entry(pattern).or_default().extend(rules);
        }

        if !other.inline_config.enabled {
            self.inline_config.enabled = false;
        }
        if other.inline_config.keyword != DEFAULT_KEYWORD {
            self.inline_config.keyword = other.inline_config.keyword;
        }
        if other.inline_config.report_unused_directives {
            self.inline_config.report_unused_directives = true;
        }

        if !other.categories.is_empty() {
            self.categories = other.categories;
        }
    }

    /// Load configuration from default locations
    pub fn load_default() -> Result<Self, ConfigError> {
        let config_names = [
            ".cascaderc.yaml",
            ".cascaderc.yml",
            ".cascaderc.json",
            "cascade.yaml",
            "cascade.yml",
            "cascade.json",
        ];

        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Self::load(&path);
            }
        }

        if let Some(home) = dirs::home_dir() {
            for name in &config_names {
                let path = home.join(name);
                if path.exists() {
                    return Self::load(&path);
                }
            }
        }

        Ok(Self::default())
    }

    /// Merge CLI arguments into configuration
    pub fn merge_cli(
        &mut self,
        format: Option<OutputFormat>,
        verbose: Option<bool>,
        jobs: Option<usize>,
        disabled_rules: Option<Vec<String>>,
        enabled_rules: Option<Vec<String>>,
    ) {
        if let Some(f) = format {
            self.output.format = f;
        }
        if let Some(v) = verbose {
            self.output.verbose = v;
        }
        if let Some(j) = jobs {
            self.engine.jobs = j;
        }
        if let Some(disabled) = disabled_rules {
            self.rules.disabled.extend(disabled);
        }
        if let Some(enabled) = enabled_rules {
            self.rules.enabled = enabled;
        }
    }

    /// Check if a rule is enabled by id
    pub fn is_rule_enabled(&self, rule_id: &str) -> bool {
        if self.rules.disabled.iter().any(|id| id == rule_id) {
            return false;
        }
        if !self.rules.enabled.is_empty() {
            return self.rules.enabled.iter().any(|id| id == rule_id);
        }
        true
    }

    /// Check if rules of a category run
    pub fn is_category_enabled(&self, category: RuleCategory) -> bool {
        self.categories.is_empty() || self.categories.contains(&category)
    }

    pub fn get_severity_override(&self, rule_id: &str) -> Option<Severity> {
        self.rules.severity.get(rule_id).copied()
    }

    pub fn get_rule_options(&self, rule_id: &str) -> &[serde_json::Value] {
        self.rules
            .options
            .get(rule_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Check if a rule should be ignored for a file
    pub fn should_ignore_rule_for_file(&self, rule_id: &str, file_path: &Path) -> bool {
        let file_str = file_path.to_string_lossy();

        for (pattern, rules) in &self.rules.per_file {
            match globset::Glob::new(pattern) {
                Ok(glob) => {
                    let matcher = glob.compile_matcher();
                    if matcher.is_match(file_str.as_ref())
                        && rules.iter().any(|r| r == "all" || r == rule_id)
                    {
                        return true;
                    }
                }
                Err(e) => log::warn!("ignoring invalid per_file pattern '{}': {}", pattern, e),
            }
        }

        false
    }

    /// Check if a file matches one of the `files.exclude` patterns
    pub fn is_file_excluded(&self, file_path: &Path) -> bool {
        let mut builder = globset::GlobSetBuilder::new();
        for pattern in &self.files.exclude {
            match globset::Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => log::warn!("ignoring invalid exclude pattern '{}': {}", pattern, e),
            }
        }
        match builder.build() {
            Ok(set) => set.is_match(file_path),
            Err(e) => {
                log::warn!("could not build exclude patterns: {}", e);
                false
            }
        }
    }
}

/// Drop repeated entries, keeping the first occurrence of each
fn dedup_patterns(patterns: &mut Vec<String>) {
    let mut seen = HashSet::new();
    patterns.retain(|p| seen.insert(p.clone()));
}

//! Cascade - stylesheet linter core
//!
//! A lint engine for CSS built around a data-driven syntax tree and
//! eslint-style directive comments.
//!
//! # Architecture
//!
//! ```text
//! CLI/API -> Engine -> parser -> SourceCode -> traversal steps -> rules -> suppression
//! ```
//!
//! The engine parses each file, wraps it in a [`SourceCode`] facade (position
//! index, cached traversal, parent index, directive extraction), works out the
//! effective rule settings from configuration and inline config comments,
//! replays the traversal once to every enabled rule, and finally filters the
//! diagnostics through the file's disable/enable directives.
//!
//! # Directive comments
//!
//! ```css
//! /* eslint-disable no-important -- vendor overrides */
//! .legacy { color: red !important; }
//! /* eslint-enable no-important */
//!
//! /* eslint no-empty-blocks: off, no-duplicate-properties: [warn] */
//! .placeholder {}
//!
//! a { margin: 0 } /* eslint-disable-line */
//! ```
//!
//! The `eslint` keyword is configurable through `inline_config.keyword`.

pub mod ast;
pub mod config;
pub mod diagnostic;
pub mod directive;
pub mod engine;
pub mod fixer;
pub mod output;
pub mod parser;
pub mod position;
pub mod rule;
pub mod rules;
pub mod source_code;
pub mod suppression;
pub mod traverse;

// Re-export main types
pub use ast::{Ast, AstBuilder, Comment, Field, Node, NodeId, VisitorKeys};
pub use config::Config;
pub use diagnostic::{Diagnostic, Fix, FixSafety, Location, Severity};
pub use directive::{Directive, DirectiveKind, InlineConfig, Problem};
pub use engine::{Engine, LintResult, RuleTiming};
pub use fixer::{FixMode, FixResult, Fixer};
pub use output::{CompactFormatter, JsonFormatter, OutputFormatter, TextFormatter};
pub use parser::{parse, parse_with_options, ParseError, ParseOutcome};
pub use position::{LineColumn, LineEndings, LineIndex, Position, PositionError, SourceLocation};
pub use rule::{Rule, RuleCategory, RuleContext, RuleMeta, RuleVisitor};
pub use source_code::{SourceCode, SourceCodeOptions, VirtualFile};
pub use traverse::{Phase, Step, TraversalError};

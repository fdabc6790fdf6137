//! The object rules see: text, tree, comments and the queries over them

use crate::ast::{Ast, Comment, Node, NodeId, VisitorKeys};
use crate::directive::{self, DirectiveReport, InlineConfigReport, DEFAULT_KEYWORD};
use crate::position::{LineColumn, LineEndings, LineIndex, PositionError, SourceLocation};
use crate::traverse::{self, Steps, Traversal, TraversalError};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// A file handed to the linter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualFile {
    pub path: PathBuf,
    pub body: String,
}

impl VirtualFile {
    pub fn new(path: impl Into<PathBuf>, body: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            body: body.into(),
        }
    }
}

/// Knobs for building a [`SourceCode`]
#[derive(Debug, Clone)]
pub struct SourceCodeOptions {
    pub line_start: usize,
    pub column_start: usize,
    pub line_endings: LineEndings,
    /// Word that starts directive comments
    pub directive_keyword: String,
}

impl Default for SourceCodeOptions {
    fn default() -> Self {
        Self {
            line_start: 1,
            column_start: 1,
            line_endings: LineEndings::default(),
            directive_keyword: DEFAULT_KEYWORD.to_string(),
        }
    }
}

/// Parsed file plus lazily computed traversal and directive data
///
/// Caches are write-once; nothing here mutates the tree.
#[derive(Debug)]
pub struct SourceCode {
    path: PathBuf,
    text: String,
    lines: Vec<Range<usize>>,
    ast: Ast,
    comments: Vec<Comment>,
    visitor_keys: VisitorKeys,
    index: LineIndex,
    keyword: String,
    traversal: OnceLock<Traversal>,
    inline_config_nodes: OnceLock<Vec<usize>>,
}

impl SourceCode {
    pub fn new(file: VirtualFile, ast: Ast, comments: Vec<Comment>, visitor_keys: VisitorKeys) -> Self {
        Self::with_options(file, ast, comments, visitor_keys, SourceCodeOptions::default())
    }

    pub fn with_options(
        file: VirtualFile,
        ast: Ast,
        comments: Vec<Comment>,
        visitor_keys: VisitorKeys,
        options: SourceCodeOptions,
    ) -> Self {
        let VirtualFile { path, body } = file;
        let index = LineIndex::with_bases(
            &body,
            &options.line_endings,
            options.line_start,
            options.column_start,
        );
        let lines = options.line_endings.line_ranges(&body);

        Self {
            path,
            text: body,
            lines,
            ast,
            comments,
            visitor_keys,
            index,
            keyword: options.directive_keyword,
            traversal: OnceLock::new(),
            inline_config_nodes: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Source lines without their terminators
    pub fn lines(&self) -> Vec<&str> {
        self.lines
            .iter()
            .map(|r| self.text.get(r.clone()).unwrap_or(""))
            .collect()
    }

    /// A single line by its number (honouring the configured first line)
    pub fn line(&self, number: usize) -> Option<&str> {
        let range = self.lines.get(number.checked_sub(self.index.line_start())?)?;
        self.text.get(range.clone())
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn visitor_keys(&self) -> &VisitorKeys {
        &self.visitor_keys
    }

    pub fn directive_keyword(&self) -> &str {
        &self.keyword
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.ast.get(id)
    }

    /// Byte range covered by a node
    pub fn get_range(&self, node: &Node) -> Range<usize> {
        node.loc().start.offset..node.loc().end.offset
    }

    pub fn get_loc<'a>(&self, node: &'a Node) -> &'a SourceLocation {
        node.loc()
    }

    /// Source text of a node
    pub fn get_text(&self, node: &Node) -> &str {
        self.text.get(self.get_range(node)).unwrap_or("")
    }

    /// Steps of a depth-first walk, computed on first call and reused after
    ///
    /// A malformed tree is reported every time; only successful walks are cached.
    pub fn traverse(&self) -> Result<Steps<'_>, TraversalError> {
        if let Some(done) = self.traversal.get() {
            return Ok(done.steps.iter().copied());
        }
        let walked = traverse::walk(&self.ast, &self.visitor_keys)?;
        log::debug!(
            "{}: traversal produced {} steps",
            self.path.display(),
            walked.steps.len()
        );
        let done = self.traversal.get_or_init(|| walked);
        Ok(done.steps.iter().copied())
    }

    /// Immediate parent; `None` for the root and before [`traverse`](Self::traverse) has run
    pub fn get_parent(&self, node: &Node) -> Option<&Node> {
        let parent = self.traversal.get()?.parents.get(&node.id())?;
        self.ast.get(*parent)
    }

    /// Ancestors from the root down to the immediate parent
    pub fn get_ancestors(&self, node: &Node) -> Vec<&Node> {
        let mut chain = Vec::new();
        let mut current = self.get_parent(node);
        while let Some(parent) = current {
            chain.push(parent);
            current = self.get_parent(parent);
        }
        chain.reverse();
        chain
    }

    pub fn get_loc_from_index(&self, index: usize) -> Result<LineColumn, PositionError> {
        self.index.loc_from_index(index)
    }

    pub fn get_index_from_loc(&self, loc: LineColumn) -> Result<usize, PositionError> {
        self.index.index_from_loc(loc)
    }

    /// Comments that look like directives, in document order
    pub fn get_inline_config_nodes(&self) -> Vec<&Comment> {
        self.inline_config_indices()
            .iter()
            .map(|&i| &self.comments[i])
            .collect()
    }

    fn inline_config_indices(&self) -> &[usize] {
        self.inline_config_nodes.get_or_init(|| {
            self.comments
                .iter()
                .enumerate()
                .filter(|(_, c)| directive::is_directive_candidate(&c.value, &self.keyword))
                .map(|(i, _)| i)
                .collect()
        })
    }

    /// Disable/enable directives plus problems with malformed ones
    pub fn get_disable_directives(&self) -> DirectiveReport<'_> {
        let report = directive::extract_directives(self.get_inline_config_nodes(), &self.keyword);
        log::trace!(
            "{}: {} directives, {} directive problems",
            self.path.display(),
            report.directives.len(),
            report.problems.len()
        );
        report
    }

    /// Rule settings from `<keyword> rule: setting` comments
    pub fn apply_inline_config(&self) -> InlineConfigReport {
        directive::extract_inline_configs(self.get_inline_config_nodes(), &self.keyword)
    }
}

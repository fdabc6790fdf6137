//! Stylesheet parser
//!
//! Produces the data-driven tree described by [`VisitorKeys::css`] plus the
//! list of comments. The grammar is deliberately shallow: selectors, at-rule
//! preludes and declaration values are kept as raw text.
//!
//! [`VisitorKeys::css`]: crate::ast::VisitorKeys::css

use crate::ast::{Ast, AstBuilder, Comment, Field, NodeId};
use crate::position::{LineIndex, Position, SourceLocation};
use crate::source_code::SourceCodeOptions;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use thiserror::Error;

static IMPORTANT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)!\s*important\s*$").expect("valid regex"));

/// Deepest block nesting accepted before the parser gives up
pub const MAX_NESTING_DEPTH: usize = 256;

/// A syntax error in the stylesheet
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message} at line {line}, column {column}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

/// Result of parsing one file
#[derive(Debug, Clone)]
pub enum ParseOutcome {
    Ok { ast: Ast, comments: Vec<Comment> },
    Err { errors: Vec<ParseError> },
}

impl ParseOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, ParseOutcome::Ok { .. })
    }
}

/// Parse stylesheet text with the default line endings and 1-based positions
pub fn parse(text: &str) -> ParseOutcome {
    CssParser::new(text).parse()
}

/// Parse with the line endings and bases a [`SourceCode`] will use
///
/// [`SourceCode`]: crate::source_code::SourceCode
pub fn parse_with_options(text: &str, options: &SourceCodeOptions) -> ParseOutcome {
    CssParser::with_options(text, options).parse()
}

/// Recursive-descent stylesheet parser
pub struct CssParser<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    index: LineIndex,
    comments: Vec<Comment>,
    /// Blocks currently open
    depth: usize,
}

impl<'a> CssParser<'a> {
    pub fn new(text: &'a str) -> Self {
        Self::with_options(text, &SourceCodeOptions::default())
    }

    pub fn with_options(text: &'a str, options: &SourceCodeOptions) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            index: LineIndex::with_bases(
                text,
                &options.line_endings,
                options.line_start,
                options.column_start,
            ),
            comments: Vec::new(),
            depth: 0,
        }
    }

    pub fn parse(mut self) -> ParseOutcome {
        let (mut builder, root) = AstBuilder::new("StyleSheet", self.position(0));
        builder.set_field(root, "children", Vec::new());

        match self.parse_stylesheet(&mut builder, root) {
            Ok(()) => {
                builder.set_end(root, self.position(self.text.len()));
                log::trace!(
                    "parsed stylesheet: {} bytes, {} comments",
                    self.text.len(),
                    self.comments.len()
                );
                ParseOutcome::Ok {
                    ast: builder.finish(),
                    comments: self.comments,
                }
            }
            Err(error) => ParseOutcome::Err {
                errors: vec![error],
            },
        }
    }

    fn parse_stylesheet(&mut self, b: &mut AstBuilder, root: NodeId) -> Result<(), ParseError> {
        loop {
            self.skip_trivia()?;
            match self.peek() {
                None => return Ok(()),
                Some(b'}') => return Err(self.error("Unexpected '}'", self.pos)),
                Some(b';') => self.pos += 1,
                Some(b'@') => {
                    let id = self.parse_atrule(b)?;
                    b.push_child(root, "children", id);
                }
                Some(_) => {
                    let id = self.parse_rule(b)?;
                    b.push_child(root, "children", id);
                }
            }
        }
    }

    fn parse_rule(&mut self, b: &mut AstBuilder) -> Result<NodeId, ParseError> {
        let start = self.pos;
        let rule = b.push("Rule", self.position(start));

        self.scan_component(&[])?;
        if self.peek() != Some(b'{') {
            return Err(self.error("Expected '{' after selector", self.pos));
        }
        let prelude = self.parse_selector_list(b, start, self.pos);
        let block = self.parse_block(b)?;

        b.set_field(rule, "prelude", prelude);
        b.set_field(rule, "block", block);
        b.set_end(rule, self.position(self.pos));
        Ok(rule)
    }

    fn parse_selector_list(&mut self, b: &mut AstBuilder, start: usize, end: usize) -> NodeId {
        let (start, end) = self.trim_span(start, end);
        let list = b.push("SelectorList", self.position(start));
        b.set_field(list, "children", Vec::new());

        for (seg_start, seg_end) in self.split_top_level(start, end, b',') {
            let (s, e) = self.trim_span(seg_start, seg_end);
            let selector = b.push("Selector", self.position(s));
            b.set_field(selector, "value", &self.text[s..e]);
            b.set_end(selector, self.position(e));
            b.push_child(list, "children", selector);
        }

        b.set_end(list, self.position(end));
        list
    }

    fn parse_atrule(&mut self, b: &mut AstBuilder) -> Result<NodeId, ParseError> {
        let start = self.pos;
        let atrule = b.push("Atrule", self.position(start));
        self.pos += 1;

        let name_start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'-' || c == b'_')
        {
            self.pos += 1;
        }
        b.set_field(atrule, "name", &self.text[name_start..self.pos]);

        let prelude_start = self.pos;
        self.scan_component(&[b';'])?;
        let (ps, pe) = self.trim_span(prelude_start, self.pos);
        let prelude = if ps < pe {
            let node = b.push("AtrulePrelude", self.position(ps));
            b.set_field(node, "value", &self.text[ps..pe]);
            b.set_end(node, self.position(pe));
            Some(node)
        } else {
            None
        };
        b.set_field(atrule, "prelude", prelude);

        let end = match self.peek() {
            Some(b'{') => {
                let block = self.parse_block(b)?;
                b.set_field(atrule, "block", block);
                self.pos
            }
            Some(b';') => {
                b.set_field(atrule, "block", Field::Null);
                self.pos += 1;
                self.pos
            }
            _ => {
                b.set_field(atrule, "block", Field::Null);
                pe.max(self.trim_span(start, self.pos).1)
            }
        };
        b.set_end(atrule, self.position(end));
        Ok(atrule)
    }

    /// Parse `{ ... }` starting at the opening brace
    fn parse_block(&mut self, b: &mut AstBuilder) -> Result<NodeId, ParseError> {
        let open = self.pos;
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error("Nesting too deep", open));
        }
        self.depth += 1;

        let block = b.push("Block", self.position(open));
        b.set_field(block, "children", Vec::new());
        self.pos += 1;

        loop {
            self.skip_trivia()?;
            match self.peek() {
                None => return Err(self.error("Unclosed block", open)),
                Some(b'}') => {
                    self.pos += 1;
                    break;
                }
                Some(b';') => self.pos += 1,
                Some(b'@') => {
                    let id = self.parse_atrule(b)?;
                    b.push_child(block, "children", id);
                }
                Some(_) if self.starts_nested_rule() => {
                    let id = self.parse_rule(b)?;
                    b.push_child(block, "children", id);
                }
                Some(_) => {
                    let id = self.parse_declaration(b)?;
                    b.push_child(block, "children", id);
                }
            }
        }

        self.depth -= 1;
        b.set_end(block, self.position(self.pos));
        Ok(block)
    }

    fn parse_declaration(&mut self, b: &mut AstBuilder) -> Result<NodeId, ParseError> {
        let start = self.pos;
        let decl = b.push("Declaration", self.position(start));

        self.scan_component(&[b':', b';'])?;
        if self.peek() != Some(b':') {
            return Err(self.error("Expected ':' in declaration", self.pos));
        }
        let (ns, ne) = self.trim_span(start, self.pos);
        b.set_field(decl, "property", &self.text[ns..ne]);
        self.pos += 1;

        let value_start = self.pos;
        self.scan_component(&[b';'])?;
        let (vs, raw_end) = self.trim_span(value_start, self.pos);

        let raw = &self.text[vs..raw_end];
        let (important, value_end) = match IMPORTANT_RE.find(raw) {
            Some(m) => (true, self.trim_span(vs, vs + m.start()).1),
            None => (false, raw_end),
        };

        let value = b.push("Value", self.position(vs));
        b.set_field(value, "value", &self.text[vs..value_end.max(vs)]);
        b.set_end(value, self.position(value_end.max(vs)));

        b.set_field(decl, "important", important);
        b.set_field(decl, "value", value);
        b.set_end(decl, self.position(raw_end.max(vs)));
        Ok(decl)
    }

    /// Whether the block item at the cursor is a nested rule rather than a declaration
    fn starts_nested_rule(&self) -> bool {
        let mut at = self.pos;
        while at < self.bytes.len() {
            match self.bytes[at] {
                b'{' => return true,
                b';' | b'}' => return false,
                b'"' | b'\'' => at = self.string_end(at).unwrap_or(self.bytes.len()),
                b'/' if self.bytes.get(at + 1) == Some(&b'*') => {
                    at = self.comment_end(at).unwrap_or(self.bytes.len())
                }
                _ => at += 1,
            }
        }
        false
    }

    /// Advance to the next `{`, `}` or extra stop byte outside strings,
    /// comments and parentheses, collecting comments on the way
    fn scan_component(&mut self, stops: &[u8]) -> Result<(), ParseError> {
        let mut depth = 0usize;
        while let Some(c) = self.peek() {
            match c {
                b'{' | b'}' => return Ok(()),
                b'"' | b'\'' => {
                    self.pos = self
                        .string_end(self.pos)
                        .ok_or_else(|| self.error("Unterminated string", self.pos))?;
                }
                b'/' if self.bytes.get(self.pos + 1) == Some(&b'*') => self.consume_comment()?,
                b'(' | b'[' => {
                    depth += 1;
                    self.pos += 1;
                }
                b')' | b']' => {
                    depth = depth.saturating_sub(1);
                    self.pos += 1;
                }
                _ if depth == 0 && stops.contains(&c) => return Ok(()),
                _ => self.pos += 1,
            }
        }
        Ok(())
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
                self.pos += 1;
            }
            if self.bytes[self.pos..].starts_with(b"/*") {
                self.consume_comment()?;
            } else {
                return Ok(());
            }
        }
    }

    fn consume_comment(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let end = self
            .comment_end(start)
            .ok_or_else(|| self.error("Unterminated comment", start))?;
        let loc = SourceLocation::new(self.position(start), self.position(end));
        self.comments
            .push(Comment::new(&self.text[start + 2..end - 2], loc));
        self.pos = end;
        Ok(())
    }

    /// Offset just past the `*/` closing the comment opened at `start`
    fn comment_end(&self, start: usize) -> Option<usize> {
        self.text
            .get(start + 2..)?
            .find("*/")
            .map(|i| start + 2 + i + 2)
    }

    /// Offset just past the closing quote of the string opened at `start`
    fn string_end(&self, start: usize) -> Option<usize> {
        let quote = self.bytes[start];
        let mut at = start + 1;
        while at < self.bytes.len() {
            match self.bytes[at] {
                b'\\' => at += 2,
                b'\n' | b'\r' => return None,
                c if c == quote => return Some(at + 1),
                _ => at += 1,
            }
        }
        None
    }

    /// Split `[start, end)` on `sep` outside strings, comments and parentheses
    fn split_top_level(&self, start: usize, end: usize, sep: u8) -> Vec<(usize, usize)> {
        let mut parts = Vec::new();
        let mut depth = 0usize;
        let mut seg_start = start;
        let mut at = start;
        while at < end {
            match self.bytes[at] {
                b'"' | b'\'' => at = self.string_end(at).unwrap_or(end).min(end),
                b'/' if self.bytes.get(at + 1) == Some(&b'*') => {
                    at = self.comment_end(at).unwrap_or(end).min(end)
                }
                b'(' | b'[' => {
                    depth += 1;
                    at += 1;
                }
                b')' | b']' => {
                    depth = depth.saturating_sub(1);
                    at += 1;
                }
                c if c == sep && depth == 0 => {
                    parts.push((seg_start, at));
                    at += 1;
                    seg_start = at;
                }
                _ => at += 1,
            }
        }
        if seg_start < end || !parts.is_empty() {
            parts.push((seg_start, end));
        }
        parts
    }

    fn trim_span(&self, mut start: usize, mut end: usize) -> (usize, usize) {
        while start < end && self.bytes[start].is_ascii_whitespace() {
            start += 1;
        }
        while end > start && self.bytes[end - 1].is_ascii_whitespace() {
            end -= 1;
        }
        (start, end)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn position(&self, offset: usize) -> Position {
        self.index.position(offset)
    }

    fn error(&self, message: &str, offset: usize) -> ParseError {
        let pos = self.position(offset);
        ParseError {
            message: message.to_string(),
            line: pos.line,
            column: pos.column,
            offset: pos.offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(text: &str) -> (Ast, Vec<Comment>) {
        match parse(text) {
            ParseOutcome::Ok { ast, comments } => (ast, comments),
            ParseOutcome::Err { errors } => panic!("unexpected errors: {errors:?}"),
        }
    }

    fn parse_err(text: &str) -> ParseError {
        match parse(text) {
            ParseOutcome::Ok { .. } => panic!("expected a parse error"),
            ParseOutcome::Err { mut errors } => errors.remove(0),
        }
    }

    #[test]
    fn test_empty_rule() {
        let (ast, comments) = parse_ok("a {\n\n}");
        assert!(comments.is_empty());

        let root = ast.root();
        assert_eq!(root.kind(), "StyleSheet");
        assert_eq!(root.children("children").len(), 1);

        let rule = ast.get(root.children("children")[0]).unwrap();
        assert_eq!(rule.kind(), "Rule");
        assert_eq!(rule.loc().end.line, 3);

        let block = ast.get(rule.child("block").unwrap()).unwrap();
        assert!(block.children("children").is_empty());
    }

    #[test]
    fn test_selectors_split_on_commas() {
        let (ast, _) = parse_ok("a, b > c, :is(d, e) {}");
        let rule = ast.get(ast.root().children("children")[0]).unwrap();
        let list = ast.get(rule.child("prelude").unwrap()).unwrap();
        let values: Vec<_> = list
            .children("children")
            .iter()
            .map(|&id| ast.get(id).unwrap().str_field("value").unwrap())
            .collect();
        assert_eq!(values, vec!["a", "b > c", ":is(d, e)"]);
    }

    #[test]
    fn test_declarations() {
        let (ast, _) = parse_ok("a { color: red; margin: 0 !important }");
        let rule = ast.get(ast.root().children("children")[0]).unwrap();
        let block = ast.get(rule.child("block").unwrap()).unwrap();
        let decls: Vec<_> = block
            .children("children")
            .iter()
            .map(|&id| ast.get(id).unwrap())
            .collect();
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].str_field("property"), Some("color"));
        assert!(!decls[0].bool_field("important"));
        assert_eq!(decls[1].str_field("property"), Some("margin"));
        assert!(decls[1].bool_field("important"));

        let value = ast.get(decls[1].child("value").unwrap()).unwrap();
        assert_eq!(value.str_field("value"), Some("0"));
    }

    #[test]
    fn test_atrules() {
        let (ast, _) = parse_ok("@import url(\"a;b.css\");\n@media screen { a { color: red } }\n@font-face { font-family: x }");
        let children = ast.root().children("children");
        assert_eq!(children.len(), 3);

        let import = ast.get(children[0]).unwrap();
        assert_eq!(import.str_field("name"), Some("import"));
        assert_eq!(import.field("block"), Some(&Field::Null));
        let prelude = ast.get(import.child("prelude").unwrap()).unwrap();
        assert_eq!(prelude.str_field("value"), Some("url(\"a;b.css\")"));

        let media = ast.get(children[1]).unwrap();
        let block = ast.get(media.child("block").unwrap()).unwrap();
        let nested = ast.get(block.children("children")[0]).unwrap();
        assert_eq!(nested.kind(), "Rule");

        let font = ast.get(children[2]).unwrap();
        assert_eq!(font.field("prelude"), Some(&Field::Null));
        let block = ast.get(font.child("block").unwrap()).unwrap();
        assert_eq!(ast.get(block.children("children")[0]).unwrap().kind(), "Declaration");
    }

    #[test]
    fn test_comments_collected_everywhere() {
        let (_, comments) = parse_ok("/* a */ x /* b */ { color: /* c */ red; }\n/* d */");
        let values: Vec<_> = comments.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(values, vec![" a ", " b ", " c ", " d "]);
        assert_eq!(comments[0].loc.start.offset, 0);
        assert_eq!(comments[0].loc.end.offset, 7);
        assert_eq!(comments[3].loc.start.line, 2);
    }

    #[test]
    fn test_multiline_comment_location() {
        let (_, comments) = parse_ok("/* one\ntwo */");
        assert_eq!(comments[0].loc.start.line, 1);
        assert_eq!(comments[0].loc.end.line, 2);
    }

    #[test]
    fn test_errors() {
        let err = parse_err("a { color: red");
        assert_eq!(err.message, "Unclosed block");
        assert_eq!((err.line, err.column, err.offset), (1, 3, 2));

        assert_eq!(parse_err("/* open").message, "Unterminated comment");
        assert_eq!(parse_err("a { content: \"x }").message, "Unterminated string");
        assert_eq!(parse_err("}").message, "Unexpected '}'");
        assert_eq!(parse_err("a { color }").message, "Expected ':' in declaration");
        assert_eq!(parse_err("a b c").message, "Expected '{' after selector");
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |depth: usize| "a{".repeat(depth) + &"}".repeat(depth);
        assert!(parse(&nested(MAX_NESTING_DEPTH)).is_ok());

        let err = parse_err(&nested(5000));
        assert_eq!(err.message, "Nesting too deep");
        assert_eq!(err.offset, MAX_NESTING_DEPTH * 2 + 1);

        // Siblings at the limit do not accumulate depth
        let siblings = nested(MAX_NESTING_DEPTH).repeat(3);
        assert!(parse(&siblings).is_ok());
    }

    #[test]
    fn test_positions_follow_options() {
        let options = SourceCodeOptions {
            line_start: 0,
            column_start: 0,
            ..Default::default()
        };
        let ParseOutcome::Ok { comments, .. } =
            parse_with_options("a {}\nb {}\n/* x */", &options)
        else {
            panic!("expected the stylesheet to parse");
        };
        assert_eq!(comments[0].loc.start.line, 2);
        assert_eq!(comments[0].loc.start.column, 0);
        assert_eq!(comments[0].loc.start.offset, 10);
    }

    #[test]
    fn test_locations_use_byte_offsets() {
        let (ast, _) = parse_ok("é {}");
        let rule = ast.get(ast.root().children("children")[0]).unwrap();
        let block = ast.get(rule.child("block").unwrap()).unwrap();
        assert_eq!(block.loc().start.offset, 3);
        assert_eq!(block.loc().start.column, 4);
    }
}

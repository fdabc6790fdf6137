//! Data-driven syntax tree
//!
//! Nodes live in an arena owned by [`Ast`] and refer to each other by
//! [`NodeId`]. A node is a type tag, a location, and a bag of named fields;
//! which fields hold children is decided by the [`VisitorKeys`] table, not by
//! the node itself.

use crate::position::{Position, SourceLocation};
use serde::Serialize;
use std::collections::HashMap;

/// Index of a node inside its [`Ast`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Value of a named node field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Field {
    Null,
    Scalar(serde_json::Value),
    Node(NodeId),
    List(Vec<NodeId>),
}

impl From<&str> for Field {
    fn from(value: &str) -> Self {
        Field::Scalar(serde_json::Value::String(value.to_string()))
    }
}

impl From<bool> for Field {
    fn from(value: bool) -> Self {
        Field::Scalar(serde_json::Value::Bool(value))
    }
}

impl From<NodeId> for Field {
    fn from(id: NodeId) -> Self {
        Field::Node(id)
    }
}

impl From<Option<NodeId>> for Field {
    fn from(id: Option<NodeId>) -> Self {
        id.map_or(Field::Null, Field::Node)
    }
}

impl From<Vec<NodeId>> for Field {
    fn from(ids: Vec<NodeId>) -> Self {
        Field::List(ids)
    }
}

/// A syntax node
#[derive(Debug, Clone, Serialize)]
pub struct Node {
    id: NodeId,
    #[serde(rename = "type")]
    kind: String,
    loc: SourceLocation,
    fields: HashMap<String, Field>,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The `type` tag, e.g. `Rule` or `Declaration`
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn loc(&self) -> &SourceLocation {
        &self.loc
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// String scalar stored under `name`
    pub fn str_field(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(Field::Scalar(serde_json::Value::String(s))) => Some(s),
            _ => None,
        }
    }

    /// Boolean scalar stored under `name` (missing means false)
    pub fn bool_field(&self, name: &str) -> bool {
        matches!(
            self.fields.get(name),
            Some(Field::Scalar(serde_json::Value::Bool(true)))
        )
    }

    /// Single child stored under `name`
    pub fn child(&self, name: &str) -> Option<NodeId> {
        match self.fields.get(name) {
            Some(Field::Node(id)) => Some(*id),
            _ => None,
        }
    }

    /// Child list stored under `name` (empty when absent)
    pub fn children(&self, name: &str) -> &[NodeId] {
        match self.fields.get(name) {
            Some(Field::List(ids)) => ids,
            _ => &[],
        }
    }
}

/// Arena of nodes with a single root
#[derive(Debug, Clone, Serialize)]
pub struct Ast {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Ast {
    pub fn root(&self) -> &Node {
        &self.nodes[self.root.0]
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in allocation order (not document order)
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }
}

/// Incremental constructor for an [`Ast`]
///
/// The root is allocated up front, so a finished tree always has one.
#[derive(Debug)]
pub struct AstBuilder {
    nodes: Vec<Node>,
}

impl AstBuilder {
    /// Start a tree whose root has the given type, returning the builder and root id
    pub fn new(root_kind: &str, start: Position) -> (Self, NodeId) {
        let mut builder = Self { nodes: Vec::new() };
        let root = builder.push(root_kind, start);
        (builder, root)
    }

    /// Allocate a node; its end defaults to its start until [`set_end`](Self::set_end)
    pub fn push(&mut self, kind: &str, start: Position) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            id,
            kind: kind.to_string(),
            loc: SourceLocation::new(start, start),
            fields: HashMap::new(),
        });
        id
    }

    pub fn set_end(&mut self, id: NodeId, end: Position) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.loc.end = end;
        }
    }

    pub fn set_field(&mut self, id: NodeId, name: &str, value: impl Into<Field>) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.fields.insert(name.to_string(), value.into());
        }
    }

    /// Append a child to the list field `name`, creating it if needed
    pub fn push_child(&mut self, id: NodeId, name: &str, child: NodeId) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            match node.fields.get_mut(name) {
                Some(Field::List(ids)) => ids.push(child),
                _ => {
                    node.fields.insert(name.to_string(), Field::List(vec![child]));
                }
            }
        }
    }

    pub fn finish(self) -> Ast {
        Ast {
            nodes: self.nodes,
            root: NodeId(0),
        }
    }
}

/// A comment collected by the parser, outside the tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    /// Text between the delimiters
    pub value: String,
    pub loc: SourceLocation,
}

impl Comment {
    pub fn new(value: impl Into<String>, loc: SourceLocation) -> Self {
        Self {
            value: value.into(),
            loc,
        }
    }
}

/// Table of node type → ordered child-bearing field names
///
/// Types missing from the table are leaves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitorKeys {
    keys: HashMap<String, Vec<String>>,
}

impl VisitorKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys for the stylesheet tree produced by [`crate::parser`]
    pub fn css() -> Self {
        Self::new()
            .with("StyleSheet", &["children"])
            .with("Rule", &["prelude", "block"])
            .with("SelectorList", &["children"])
            .with("Atrule", &["prelude", "block"])
            .with("Block", &["children"])
            .with("Declaration", &["value"])
    }

    pub fn with(mut self, kind: &str, fields: &[&str]) -> Self {
        self.insert(kind, fields);
        self
    }

    pub fn insert(&mut self, kind: &str, fields: &[&str]) {
        self.keys.insert(
            kind.to_string(),
            fields.iter().map(|f| f.to_string()).collect(),
        );
    }

    pub fn get(&self, kind: &str) -> &[String] {
        self.keys.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

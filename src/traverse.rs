//! Depth-first walk producing enter/exit steps

use crate::ast::{Ast, Field, Node, NodeId, VisitorKeys};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// Whether a step enters or leaves its node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Enter,
    Exit,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Enter => write!(f, "enter"),
            Phase::Exit => write!(f, "exit"),
        }
    }
}

/// One visit of one node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Step {
    pub target: NodeId,
    pub phase: Phase,
    /// Immediate parent, `None` for the root
    pub parent: Option<NodeId>,
}

/// Iterator over a cached step sequence
pub type Steps<'a> = std::iter::Copied<std::slice::Iter<'a, Step>>;

/// A tree that does not match its visitor keys
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraversalError {
    #[error("field '{field}' of {kind} node #{id} holds a scalar where a node was expected")]
    UnexpectedScalar {
        kind: String,
        field: String,
        id: usize,
    },

    #[error("field '{field}' of {kind} node #{id} references missing node #{target}")]
    MissingNode {
        kind: String,
        field: String,
        id: usize,
        target: usize,
    },

    #[error("node #{id} is reachable more than once")]
    SharedNode { id: usize },
}

/// Steps plus the parent map filled in while producing them
#[derive(Debug, Clone, Default)]
pub(crate) struct Traversal {
    pub steps: Vec<Step>,
    pub parents: HashMap<NodeId, NodeId>,
}

/// Walk the whole tree from its root
pub(crate) fn walk(ast: &Ast, keys: &VisitorKeys) -> Result<Traversal, TraversalError> {
    let mut walker = Walker {
        ast,
        keys,
        seen: vec![false; ast.len()],
        stack: vec![Visit::Enter(ast.root(), None)],
        out: Traversal {
            steps: Vec::with_capacity(ast.len() * 2),
            parents: HashMap::with_capacity(ast.len()),
        },
    };
    walker.run()?;
    Ok(walker.out)
}

/// Pending work on the explicit stack
enum Visit<'a> {
    Enter(&'a Node, Option<NodeId>),
    Exit(NodeId, Option<NodeId>),
}

/// Depth-first walker over an explicit stack
struct Walker<'a> {
    ast: &'a Ast,
    keys: &'a VisitorKeys,
    seen: Vec<bool>,
    stack: Vec<Visit<'a>>,
    out: Traversal,
}

impl<'a> Walker<'a> {
    fn run(&mut self) -> Result<(), TraversalError> {
        let mut children = Vec::new();
        while let Some(visit) = self.stack.pop() {
            match visit {
                Visit::Enter(node, parent) => {
                    self.enter(node, parent)?;
                    self.children(node, &mut children)?;
                    let id = node.id();
                    self.stack.push(Visit::Exit(id, parent));
                    self.stack
                        .extend(children.drain(..).rev().map(|child| Visit::Enter(child, Some(id))));
                }
                Visit::Exit(id, parent) => self.out.steps.push(Step {
                    target: id,
                    phase: Phase::Exit,
                    parent,
                }),
            }
        }
        Ok(())
    }

    fn enter(&mut self, node: &Node, parent: Option<NodeId>) -> Result<(), TraversalError> {
        let id = node.id();
        match self.seen.get_mut(id.index()) {
            Some(seen) if !*seen => *seen = true,
            _ => return Err(TraversalError::SharedNode { id: id.index() }),
        }

        if let Some(parent) = parent {
            self.out.parents.insert(id, parent);
        }
        self.out.steps.push(Step {
            target: id,
            phase: Phase::Enter,
            parent,
        });
        Ok(())
    }

    /// Child nodes of `node` in visitor-key order
    fn children(&self, node: &'a Node, out: &mut Vec<&'a Node>) -> Result<(), TraversalError> {
        let id = node.id();
        for field in self.keys.get(node.kind()) {
            match node.field(field) {
                None | Some(Field::Null) | Some(Field::Scalar(serde_json::Value::Null)) => {}
                Some(Field::Node(child)) => out.push(self.check(id, field, *child)?),
                Some(Field::List(children)) => {
                    for &child in children {
                        out.push(self.check(id, field, child)?);
                    }
                }
                Some(Field::Scalar(_)) => {
                    return Err(TraversalError::UnexpectedScalar {
                        kind: node.kind().to_string(),
                        field: field.clone(),
                        id: id.index(),
                    });
                }
            }
        }
        Ok(())
    }

    fn check(&self, owner: NodeId, field: &str, child: NodeId) -> Result<&'a Node, TraversalError> {
        if let Some(node) = self.ast.get(child) {
            return Ok(node);
        }
        let kind = self
            .ast
            .get(owner)
            .map(|n| n.kind().to_string())
            .unwrap_or_default();
        Err(TraversalError::MissingNode {
            kind,
            field: field.to_string(),
            id: owner.index(),
            target: child.index(),
        })
    }
}

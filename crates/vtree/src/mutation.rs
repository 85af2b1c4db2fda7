//! Mutation protocol between the differ and a committer.
//!
//! Invariants:
//! - Mutations are applied in order; a batch is the transition from one
//!   committed tree to the next.
//! - Every path is evaluated against the surface state left by the
//!   mutations before it in the same batch.
//! - The empty path is the container; `[0]` is the root node of the tree.
//! - `RemoveNode` takes the whole subtree with it; no per-descendant
//!   removals are emitted.
//! - `MoveNode` stays within the current parent. `new_index` is the final
//!   position, counted after the node was detached.
//! - `AttrDiff` lists are sorted by attribute name.

use crate::types::{Child, TextValue, Value};
use std::fmt;
use std::sync::Arc;

/// Logical tree position: child indices starting at the container.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    pub fn container() -> Self {
        NodePath(Vec::new())
    }

    pub fn root() -> Self {
        NodePath(vec![0])
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = Vec::with_capacity(self.0.len() + 1);
        indices.extend_from_slice(&self.0);
        indices.push(index);
        NodePath(indices)
    }

    /// Parent path and index within the parent; `None` for the container.
    pub fn split_last(&self) -> Option<(NodePath, usize)> {
        let (last, rest) = self.0.split_last()?;
        Some((NodePath(rest.to_vec()), *last))
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for NodePath {
    fn from(indices: Vec<usize>) -> Self {
        NodePath(indices)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for index in &self.0 {
            write!(f, "/{index}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AttrDiff {
    /// Attribute was added or its value changed.
    Set { name: Arc<str>, value: Value },
    Remove { name: Arc<str> },
}

impl AttrDiff {
    pub fn name(&self) -> &str {
        match self {
            AttrDiff::Set { name, .. } | AttrDiff::Remove { name } => name,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Mutation {
    /// Build `node` with its whole subtree and attach it at `index`.
    InsertNode {
        parent: NodePath,
        index: usize,
        node: Child,
    },
    RemoveNode {
        target: NodePath,
    },
    UpdateAttributes {
        target: NodePath,
        diffs: Vec<AttrDiff>,
    },
    MoveNode {
        target: NodePath,
        new_index: usize,
    },
    /// Replace the content of a text leaf.
    ReplaceText {
        target: NodePath,
        value: TextValue,
    },
}

impl Mutation {
    pub fn kind(&self) -> MutationKind {
        match self {
            Mutation::InsertNode { .. } => MutationKind::InsertNode,
            Mutation::RemoveNode { .. } => MutationKind::RemoveNode,
            Mutation::UpdateAttributes { .. } => MutationKind::UpdateAttributes,
            Mutation::MoveNode { .. } => MutationKind::MoveNode,
            Mutation::ReplaceText { .. } => MutationKind::ReplaceText,
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::InsertNode {
                parent,
                index,
                node,
            } => {
                let what = match node {
                    Child::Element(node) => node.tag().to_string(),
                    Child::Text(text) => format!("{:?}", text.to_string()),
                };
                write!(f, "insert {what} into {parent} at {index}")
            }
            Mutation::RemoveNode { target } => write!(f, "remove {target}"),
            Mutation::UpdateAttributes { target, diffs } => {
                write!(f, "update {target}")?;
                for diff in diffs {
                    match diff {
                        AttrDiff::Set { name, value } => write!(f, " {name}={value}")?,
                        AttrDiff::Remove { name } => write!(f, " -{name}")?,
                    }
                }
                Ok(())
            }
            Mutation::MoveNode { target, new_index } => {
                write!(f, "move {target} to {new_index}")
            }
            Mutation::ReplaceText { target, value } => {
                write!(f, "text {target} = {:?}", value.to_string())
            }
        }
    }
}

pub type MutationSet = Vec<Mutation>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MutationKind {
    InsertNode,
    RemoveNode,
    UpdateAttributes,
    MoveNode,
    ReplaceText,
}

impl MutationKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::InsertNode => "insert-node",
            Self::RemoveNode => "remove-node",
            Self::UpdateAttributes => "update-attributes",
            Self::MoveNode => "move-node",
            Self::ReplaceText => "replace-text",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-kind tally of a mutation batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MutationCounts {
    pub inserts: usize,
    pub removes: usize,
    pub attribute_updates: usize,
    pub moves: usize,
    pub text_replacements: usize,
}

impl MutationCounts {
    pub fn of(mutations: &[Mutation]) -> Self {
        let mut counts = Self::default();
        for mutation in mutations {
            match mutation.kind() {
                MutationKind::InsertNode => counts.inserts += 1,
                MutationKind::RemoveNode => counts.removes += 1,
                MutationKind::UpdateAttributes => counts.attribute_updates += 1,
                MutationKind::MoveNode => counts.moves += 1,
                MutationKind::ReplaceText => counts.text_replacements += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.inserts + self.removes + self.attribute_updates + self.moves + self.text_replacements
    }
}

impl fmt::Display for MutationCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "insert={} remove={} attrs={} move={} text={}",
            self.inserts, self.removes, self.attribute_updates, self.moves, self.text_replacements
        )
    }
}

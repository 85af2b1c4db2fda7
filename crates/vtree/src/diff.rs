//! Deterministic tree diffing to mutation sets.
//!
//! Contract:
//! - Both trees are validated before anything is emitted; a malformed tree
//!   yields an error and no mutations.
//! - Elements are the same when tag and key match; anything else in the same
//!   slot is a removal followed by an insertion.
//! - Attribute changes emit one `UpdateAttributes` per element, only for
//!   added, changed or removed names.
//! - Sibling groups where every child on both sides is a keyed element are
//!   matched by key. Survivors outside the longest increasing subsequence
//!   (by old position, in new order) are moved; the rest stay put.
//! - All other groups are matched by index and never produce moves.
//! - Output depends only on the structure of the inputs.
//!
//! Complexity: O(n) for positional groups; keyed groups are O(k log k) for
//! the subsequence plus O(k) per move for index bookkeeping.

use crate::mutation::{AttrDiff, Mutation, MutationSet, NodePath};
use crate::types::{Child, Node};
use crate::validate::validate_tree;
use std::collections::{HashMap, HashSet};
use std::thread;

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum DiffError {
    #[error("duplicate key {key:?} among the children of {path}")]
    Shape { path: NodePath, key: String },
    #[error("unsupported value at {path}: {detail}")]
    Value { path: NodePath, detail: String },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiffOptions {
    /// Keyed groups with at least this many surviving children diff their
    /// subtrees on scoped threads. `None` keeps everything on the caller's
    /// thread.
    pub parallel_threshold: Option<usize>,
}

pub fn diff(old: Option<&Node>, new: Option<&Node>) -> Result<MutationSet, DiffError> {
    diff_with_options(old, new, &DiffOptions::default())
}

pub fn diff_with_options(
    old: Option<&Node>,
    new: Option<&Node>,
    options: &DiffOptions,
) -> Result<MutationSet, DiffError> {
    if let Some(old) = old {
        validate_tree(old, &NodePath::root())?;
    }
    if let Some(new) = new {
        validate_tree(new, &NodePath::root())?;
    }

    let differ = Differ {
        options,
        allow_parallel: true,
    };
    let mut out = Vec::new();
    match (old, new) {
        (None, None) => {}
        (None, Some(new)) => out.push(Mutation::InsertNode {
            parent: NodePath::container(),
            index: 0,
            node: Child::Element(new.clone()),
        }),
        (Some(_), None) => out.push(Mutation::RemoveNode {
            target: NodePath::root(),
        }),
        (Some(old), Some(new)) => differ.diff_element(old, new, NodePath::root(), &mut out),
    }
    log::trace!(target: "vtree.diff", "diff produced {} mutations", out.len());
    Ok(out)
}

#[derive(Clone, Copy)]
struct Differ<'o> {
    options: &'o DiffOptions,
    // Cleared inside worker threads so nested groups stay sequential.
    allow_parallel: bool,
}

impl Differ<'_> {
    fn diff_element(&self, old: &Node, new: &Node, path: NodePath, out: &mut Vec<Mutation>) {
        if !old.is_same_element(new) {
            replace(path, Child::Element(new.clone()), out);
            return;
        }
        diff_attributes(old, new, &path, out);
        self.diff_children(old.children(), new.children(), &path, out);
    }

    fn diff_child(&self, old: &Child, new: &Child, path: NodePath, out: &mut Vec<Mutation>) {
        match (old, new) {
            (Child::Text(prev), Child::Text(next)) => {
                if prev != next {
                    out.push(Mutation::ReplaceText {
                        target: path,
                        value: next.clone(),
                    });
                }
            }
            (Child::Element(prev), Child::Element(next)) => {
                self.diff_element(prev, next, path, out);
            }
            _ => replace(path, new.clone(), out),
        }
    }

    fn diff_children(
        &self,
        old: &[Child],
        new: &[Child],
        parent: &NodePath,
        out: &mut Vec<Mutation>,
    ) {
        // Pure fills and pure clears come out the same under both policies;
        // the positional form keeps inserts in ascending order.
        if old.is_empty() || new.is_empty() || !is_keyed_group(old) || !is_keyed_group(new) {
            self.diff_positional(old, new, parent, out);
        } else {
            self.diff_keyed(old, new, parent, out);
        }
    }

    fn diff_positional(
        &self,
        old: &[Child],
        new: &[Child],
        parent: &NodePath,
        out: &mut Vec<Mutation>,
    ) {
        let shared = old.len().min(new.len());
        for (index, (prev, next)) in old.iter().zip(new).enumerate() {
            self.diff_child(prev, next, parent.child(index), out);
        }
        for (index, child) in new.iter().enumerate().skip(shared) {
            out.push(Mutation::InsertNode {
                parent: parent.clone(),
                index,
                node: child.clone(),
            });
        }
        for index in (shared..old.len()).rev() {
            out.push(Mutation::RemoveNode {
                target: parent.child(index),
            });
        }
    }

    fn diff_keyed(&self, old: &[Child], new: &[Child], parent: &NodePath, out: &mut Vec<Mutation>) {
        let old_nodes = keyed_nodes(old);
        let new_nodes = keyed_nodes(new);
        let new_by_key: HashMap<&str, &Node> =
            new_nodes.iter().map(|&(key, node)| (key, node)).collect();

        // Survivors keep their key and their tag.
        let mut survivors: HashMap<&str, &Node> = HashMap::with_capacity(old_nodes.len());
        let mut live: Vec<&str> = Vec::with_capacity(new_nodes.len());
        for &(key, node) in &old_nodes {
            let kept = new_by_key
                .get(key)
                .is_some_and(|next| next.tag() == node.tag());
            if kept {
                survivors.insert(key, node);
                live.push(key);
            }
        }
        for (index, &(key, _)) in old_nodes.iter().enumerate().rev() {
            if !survivors.contains_key(key) {
                out.push(Mutation::RemoveNode {
                    target: parent.child(index),
                });
            }
        }

        let live_pos: HashMap<&str, usize> =
            live.iter().enumerate().map(|(pos, &key)| (key, pos)).collect();
        let sequence: Vec<usize> = new_nodes
            .iter()
            .filter_map(|(key, _)| live_pos.get(key).copied())
            .collect();
        let stable: HashSet<&str> = longest_increasing_subsequence(&sequence)
            .into_iter()
            .map(|at| live[sequence[at]])
            .collect();

        // Place from the end: each node lands right before its successor,
        // which is already in its final relative position.
        for index in (0..new_nodes.len()).rev() {
            let (key, node) = new_nodes[index];
            if stable.contains(key) {
                continue;
            }
            let anchor = new_nodes.get(index + 1).map(|&(next_key, _)| next_key);
            match live.iter().position(|&k| k == key) {
                Some(from) => {
                    live.remove(from);
                    let to = anchor_position(&live, anchor);
                    if from != to {
                        out.push(Mutation::MoveNode {
                            target: parent.child(from),
                            new_index: to,
                        });
                    }
                    live.insert(to, key);
                }
                None => {
                    let to = anchor_position(&live, anchor);
                    out.push(Mutation::InsertNode {
                        parent: parent.clone(),
                        index: to,
                        node: Child::Element(node.clone()),
                    });
                    live.insert(to, key);
                }
            }
        }
        debug_assert!(
            live.iter().copied().eq(new_nodes.iter().map(|&(key, _)| key)),
            "keyed placement must reproduce the new order"
        );

        let pairs: Vec<(usize, &Node, &Node)> = new_nodes
            .iter()
            .enumerate()
            .filter_map(|(index, &(key, next))| {
                survivors.get(key).map(|&prev| (index, prev, next))
            })
            .collect();
        self.diff_survivors(&pairs, parent, out);
    }

    fn diff_survivors(
        &self,
        pairs: &[(usize, &Node, &Node)],
        parent: &NodePath,
        out: &mut Vec<Mutation>,
    ) {
        let threshold = match self.options.parallel_threshold {
            Some(threshold) if self.allow_parallel => threshold.max(2),
            _ => usize::MAX,
        };
        if pairs.len() < threshold {
            for &(index, prev, next) in pairs {
                self.diff_element(prev, next, parent.child(index), out);
            }
            return;
        }

        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(pairs.len());
        let chunk_len = pairs.len().div_ceil(workers);
        let nested = Differ {
            options: self.options,
            allow_parallel: false,
        };
        log::trace!(
            target: "vtree.diff",
            "diffing {} keyed subtrees of {parent} on {workers} threads",
            pairs.len()
        );
        let batches: Vec<Vec<Mutation>> = thread::scope(|scope| {
            let handles: Vec<_> = pairs
                .chunks(chunk_len)
                .map(|chunk| {
                    scope.spawn(move || {
                        let mut local = Vec::new();
                        for &(index, prev, next) in chunk {
                            nested.diff_element(prev, next, parent.child(index), &mut local);
                        }
                        local
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
                })
                .collect()
        });
        for batch in batches {
            out.extend(batch);
        }
    }
}

fn replace(path: NodePath, node: Child, out: &mut Vec<Mutation>) {
    let Some((parent, index)) = path.split_last() else {
        return;
    };
    out.push(Mutation::RemoveNode { target: path });
    out.push(Mutation::InsertNode {
        parent,
        index,
        node,
    });
}

fn diff_attributes(old: &Node, new: &Node, path: &NodePath, out: &mut Vec<Mutation>) {
    let mut diffs = Vec::new();
    for (name, value) in new.attributes() {
        if old.attribute(name) != Some(value) {
            diffs.push(AttrDiff::Set {
                name: name.clone(),
                value: value.clone(),
            });
        }
    }
    for name in old.attributes().keys() {
        if new.attribute(name).is_none() {
            diffs.push(AttrDiff::Remove { name: name.clone() });
        }
    }
    if diffs.is_empty() {
        return;
    }
    diffs.sort_by(|a, b| a.name().cmp(b.name()));
    out.push(Mutation::UpdateAttributes {
        target: path.clone(),
        diffs,
    });
}

fn is_keyed_group(children: &[Child]) -> bool {
    children.iter().all(|child| child.key().is_some())
}

fn keyed_nodes(children: &[Child]) -> Vec<(&str, &Node)> {
    children
        .iter()
        .filter_map(|child| {
            let node = child.as_element()?;
            Some((node.key()?, node))
        })
        .collect()
}

fn anchor_position(live: &[&str], anchor: Option<&str>) -> usize {
    anchor
        .and_then(|anchor| live.iter().position(|&key| key == anchor))
        .unwrap_or(live.len())
}

/// Indices into `seq` of one longest strictly increasing subsequence. Ties
/// resolve towards the latest candidate, so the result is deterministic.
pub(crate) fn longest_increasing_subsequence(seq: &[usize]) -> Vec<usize> {
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; seq.len()];
    for (i, &value) in seq.iter().enumerate() {
        let pos = tails.partition_point(|&t| seq[t] < value);
        if pos > 0 {
            prev[i] = Some(tails[pos - 1]);
        }
        if pos == tails.len() {
            tails.push(i);
        } else {
            tails[pos] = i;
        }
    }
    let mut out = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        out.push(i);
        cursor = prev[i];
    }
    out.reverse();
    out
}

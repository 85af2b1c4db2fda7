//! Applies a `MutationSet` to a surface, in order.
//!
//! Contract:
//! - Mutations are applied one by one; the first failure stops the batch
//!   and everything before it stays applied.
//! - Paths resolve through the identity map as it stands after the
//!   previous mutation, matching the differ's addressing.
//! - An inserted subtree is fully built while detached, then attached with
//!   one `append_child` and recorded.
//! - When an insert fails partway through its build, the handles it already
//!   created stay detached on the surface. They are never recorded, counted
//!   or released; the surface owns their cleanup.
//! - `MoveNode` reuses the existing handle: `remove_child` then
//!   `append_child` on the same parent.

use crate::identity::{IdentityMap, Slot};
use crate::surface::{Surface, SurfaceError};
use core_types::SurfaceHandle;
use std::fmt;
use thiserror::Error;
use vtree::{AttrDiff, Child, Mutation, MutationKind, NodePath};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CommitError {
    #[error("mutation {index} ({kind}) failed on the surface: {source}")]
    Surface {
        index: usize,
        kind: MutationKind,
        source: SurfaceError,
    },
    #[error("mutation {index} ({kind}) addresses {path}, which has no surface handle")]
    UnknownHandle {
        index: usize,
        kind: MutationKind,
        path: NodePath,
    },
}

impl CommitError {
    /// Index of the failed mutation within its batch.
    pub fn index(&self) -> usize {
        match self {
            CommitError::Surface { index, .. } | CommitError::UnknownHandle { index, .. } => *index,
        }
    }

    pub fn kind(&self) -> MutationKind {
        match self {
            CommitError::Surface { kind, .. } | CommitError::UnknownHandle { kind, .. } => *kind,
        }
    }

    /// The identity map and the mutation stream disagree; later batches
    /// cannot be trusted until the tree is remounted.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CommitError::UnknownHandle { .. })
    }
}

/// Outcome of one successful batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub applied: usize,
    pub created: usize,
    pub released: usize,
}

impl fmt::Display for CommitSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} mutations, {} handles created, {} released",
            self.applied, self.created, self.released
        )
    }
}

enum Fault {
    Surface(SurfaceError),
    Unknown(NodePath),
}

impl From<SurfaceError> for Fault {
    fn from(err: SurfaceError) -> Self {
        Fault::Surface(err)
    }
}

pub struct Committer<S: Surface> {
    surface: S,
    identity: IdentityMap,
    trace: bool,
}

impl<S: Surface> Committer<S> {
    /// Binds a committer to `container`, the handle the empty path
    /// resolves to.
    pub fn new(surface: S, container: SurfaceHandle) -> Self {
        Self {
            surface,
            identity: IdentityMap::new(container),
            trace: false,
        }
    }

    /// Logs every applied mutation at `trace` level.
    pub fn set_trace(&mut self, enabled: bool) {
        self.trace = enabled;
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn identity(&self) -> &IdentityMap {
        &self.identity
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn commit(&mut self, mutations: &[Mutation]) -> Result<CommitSummary, CommitError> {
        let mut summary = CommitSummary::default();
        for (index, mutation) in mutations.iter().enumerate() {
            if self.trace {
                log::trace!(target: "reconcile.commit", "[{index}] {mutation}");
            }
            self.apply(mutation, &mut summary).map_err(|fault| {
                let kind = mutation.kind();
                let err = match fault {
                    Fault::Surface(source) => CommitError::Surface {
                        index,
                        kind,
                        source,
                    },
                    Fault::Unknown(path) => CommitError::UnknownHandle { index, kind, path },
                };
                log::debug!(
                    target: "reconcile.commit",
                    "batch aborted after {} of {} mutations: {err}",
                    summary.applied,
                    mutations.len()
                );
                err
            })?;
            summary.applied += 1;
        }
        log::debug!(target: "reconcile.commit", "committed {summary}");
        Ok(summary)
    }

    /// Detaches every top-level node from the container and returns the
    /// number of handles released. A node is forgotten only once its own
    /// detach succeeds; nodes whose detach fails stay recorded so a later
    /// call retries them, and the first failure is returned.
    pub fn detach_all(&mut self) -> Result<usize, SurfaceError> {
        let container = self.identity.container();
        let surface = &mut self.surface;
        let mut released = 0;
        let mut first_err = None;
        self.identity
            .retain_top_level(|slot| match surface.remove_child(container, slot.handle()) {
                Ok(()) => {
                    released += slot.subtree_len();
                    false
                }
                Err(err) => {
                    log::debug!(target: "reconcile.commit", "detach of {} failed: {err}", slot.handle());
                    first_err.get_or_insert(err);
                    true
                }
            });
        match first_err {
            Some(err) => Err(err),
            None => Ok(released),
        }
    }

    fn apply(&mut self, mutation: &Mutation, summary: &mut CommitSummary) -> Result<(), Fault> {
        match mutation {
            Mutation::InsertNode {
                parent,
                index,
                node,
            } => {
                let parent_handle = self.resolve(parent)?;
                match self.identity.child_count(parent) {
                    Some(count) if *index <= count => {}
                    _ => return Err(Fault::Unknown(parent.child(*index))),
                }
                let slot = self.build(node)?;
                summary.created += slot.subtree_len();
                self.surface
                    .append_child(parent_handle, slot.handle(), *index)?;
                let recorded = self.identity.insert(parent, *index, slot);
                debug_assert!(recorded, "insert position checked above");
            }
            Mutation::RemoveNode { target } => {
                let (parent, handle) = self.resolve_with_parent(target)?;
                self.surface.remove_child(parent, handle)?;
                if let Some(slot) = self.identity.remove(target) {
                    summary.released += slot.subtree_len();
                }
            }
            Mutation::UpdateAttributes { target, diffs } => {
                let handle = self.resolve(target)?;
                for diff in diffs {
                    match diff {
                        AttrDiff::Set { name, value } => {
                            self.surface.set_attribute(handle, name, value)?
                        }
                        AttrDiff::Remove { name } => self.surface.remove_attribute(handle, name)?,
                    }
                }
            }
            Mutation::MoveNode { target, new_index } => {
                let (parent, handle) = self.resolve_with_parent(target)?;
                let Some((parent_path, _)) = target.split_last() else {
                    return Err(Fault::Unknown(target.clone()));
                };
                match self.identity.child_count(&parent_path) {
                    Some(count) if *new_index < count => {}
                    _ => return Err(Fault::Unknown(parent_path.child(*new_index))),
                }
                self.surface.remove_child(parent, handle)?;
                self.surface.append_child(parent, handle, *new_index)?;
                let moved = self.identity.move_to(target, *new_index);
                debug_assert!(moved, "move position checked above");
            }
            Mutation::ReplaceText { target, value } => {
                let handle = self.resolve(target)?;
                self.surface.set_text(handle, value)?;
            }
        }
        Ok(())
    }

    fn resolve(&self, path: &NodePath) -> Result<SurfaceHandle, Fault> {
        self.identity
            .resolve(path)
            .ok_or_else(|| Fault::Unknown(path.clone()))
    }

    // The container itself is never a valid target.
    fn resolve_with_parent(
        &self,
        target: &NodePath,
    ) -> Result<(SurfaceHandle, SurfaceHandle), Fault> {
        let Some((parent, _)) = target.split_last() else {
            return Err(Fault::Unknown(target.clone()));
        };
        Ok((self.resolve(&parent)?, self.resolve(target)?))
    }

    fn build(&mut self, child: &Child) -> Result<Slot, SurfaceError> {
        match child {
            Child::Text(value) => Ok(Slot::leaf(self.surface.create_text(value)?)),
            Child::Element(node) => {
                let handle = self.surface.create_element(node.tag())?;
                for (name, value) in node.attributes() {
                    self.surface.set_attribute(handle, name, value)?;
                }
                let mut children = Vec::with_capacity(node.children().len());
                for (index, child) in node.children().iter().enumerate() {
                    let slot = self.build(child)?;
                    self.surface.append_child(handle, slot.handle(), index)?;
                    children.push(slot);
                }
                Ok(Slot::new(handle, children))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaSurface;
    use vtree::{Node, TextValue, Value, diff};

    fn committer() -> Committer<ArenaSurface> {
        let surface = ArenaSurface::new();
        let container = surface.container();
        Committer::new(surface, container)
    }

    fn list(items: &[(&str, &str)]) -> Node {
        Node::element("ul")
            .children(
                items
                    .iter()
                    .map(|(key, text)| Node::element("li").key(*key).text(*text)),
            )
            .build()
    }

    #[test]
    fn mount_records_every_handle() {
        let mut committer = committer();
        let tree = list(&[("1", "A"), ("2", "B")]);
        let summary = committer
            .commit(&diff(None, Some(&tree)).unwrap())
            .unwrap();
        assert_eq!(summary.applied, 1);
        assert_eq!(summary.created, tree.subtree_len());
        assert_eq!(committer.identity().len(), tree.subtree_len());
        assert_eq!(committer.surface().attached_count(), tree.subtree_len());
    }

    #[test]
    fn keyed_swap_moves_without_new_handles() {
        let mut committer = committer();
        let old = list(&[("1", "A"), ("2", "B")]);
        let new = list(&[("2", "B"), ("1", "A")]);
        committer.commit(&diff(None, Some(&old)).unwrap()).unwrap();
        let before: Vec<_> = (0..2)
            .map(|i| committer.identity().resolve(&NodePath::from(vec![0, i])))
            .collect();
        let created_before = committer.surface().stats().created();

        let summary = committer
            .commit(&diff(Some(&old), Some(&new)).unwrap())
            .unwrap();
        assert_eq!(summary.created, 0);
        assert_eq!(summary.released, 0);
        assert_eq!(committer.surface().stats().created(), created_before);
        let after: Vec<_> = (0..2)
            .map(|i| committer.identity().resolve(&NodePath::from(vec![0, i])))
            .collect();
        assert_eq!(after, vec![before[1], before[0]]);
    }

    #[test]
    fn remove_releases_the_subtree() {
        let mut committer = committer();
        let old = list(&[("1", "A"), ("2", "B")]);
        committer.commit(&diff(None, Some(&old)).unwrap()).unwrap();
        let summary = committer.commit(&diff(Some(&old), None).unwrap()).unwrap();
        assert_eq!(summary.released, old.subtree_len());
        assert!(committer.identity().is_empty());
        assert_eq!(committer.surface().attached_count(), 0);
    }

    #[test]
    fn unknown_path_is_fatal_and_stops_the_batch() {
        let mut committer = committer();
        let tree = Node::element("p").text("Bake").build();
        committer.commit(&diff(None, Some(&tree)).unwrap()).unwrap();
        let batch = vec![
            Mutation::ReplaceText {
                target: NodePath::from(vec![0, 0]),
                value: TextValue::from("Roast"),
            },
            Mutation::UpdateAttributes {
                target: NodePath::from(vec![0, 4]),
                diffs: vec![AttrDiff::Set {
                    name: "class".into(),
                    value: Value::from("x"),
                }],
            },
            Mutation::ReplaceText {
                target: NodePath::from(vec![0, 0]),
                value: TextValue::from("Grill"),
            },
        ];
        let err = committer.commit(&batch).unwrap_err();
        assert_eq!(err.index(), 1);
        assert_eq!(err.kind(), MutationKind::UpdateAttributes);
        assert!(err.is_fatal());
        assert!(
            matches!(&err, CommitError::UnknownHandle { path, .. } if *path == NodePath::from(vec![0, 4]))
        );
        let rendered = committer.surface().materialize_root().unwrap().unwrap();
        assert_eq!(rendered, Node::element("p").text("Roast").build());
    }

    #[test]
    fn container_is_not_removable() {
        let mut committer = committer();
        let err = committer
            .commit(&[Mutation::RemoveNode {
                target: NodePath::container(),
            }])
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.index(), 0);
    }

    #[test]
    fn surface_failure_is_not_fatal() {
        let mut committer = committer();
        let tree = Node::element("p").text("Bake").build();
        committer.commit(&diff(None, Some(&tree)).unwrap()).unwrap();
        // Attribute writes on a text leaf are rejected by the arena.
        let err = committer
            .commit(&[Mutation::UpdateAttributes {
                target: NodePath::from(vec![0, 0]),
                diffs: vec![AttrDiff::Remove {
                    name: "class".into(),
                }],
            }])
            .unwrap_err();
        assert!(!err.is_fatal());
        assert!(matches!(err, CommitError::Surface { index: 0, .. }));
        assert!(err.to_string().contains("remove_attribute"), "{err}");
    }

    #[test]
    fn detach_all_clears_identity_and_surface() {
        let mut committer = committer();
        let tree = list(&[("1", "A")]);
        committer.commit(&diff(None, Some(&tree)).unwrap()).unwrap();
        assert_eq!(committer.detach_all().unwrap(), tree.subtree_len());
        assert!(committer.identity().is_empty());
        assert_eq!(committer.surface().attached_count(), 0);
        assert_eq!(committer.detach_all().unwrap(), 0);
    }
}

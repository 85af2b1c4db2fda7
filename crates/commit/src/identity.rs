//! Path-addressed record of the surface handles a committer owns.
//!
//! The map mirrors the committed tree: one [`Slot`] per element or text
//! leaf, children in sibling order. The empty path resolves to the
//! container, which the map never owns.

use core_types::SurfaceHandle;
use vtree::NodePath;

/// Handle of one committed node plus the slots of its children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Slot {
    handle: SurfaceHandle,
    children: Vec<Slot>,
}

impl Slot {
    pub fn new(handle: SurfaceHandle, children: Vec<Slot>) -> Self {
        Self { handle, children }
    }

    pub fn leaf(handle: SurfaceHandle) -> Self {
        Self::new(handle, Vec::new())
    }

    pub fn handle(&self) -> SurfaceHandle {
        self.handle
    }

    pub fn children(&self) -> &[Slot] {
        &self.children
    }

    /// Number of handles in this subtree, itself included.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Slot::subtree_len).sum::<usize>()
    }

    /// Handles of this subtree in document order.
    pub fn handles(&self) -> Vec<SurfaceHandle> {
        let mut out = Vec::with_capacity(self.subtree_len());
        let mut stack = vec![self];
        while let Some(slot) = stack.pop() {
            out.push(slot.handle);
            stack.extend(slot.children.iter().rev());
        }
        out
    }
}

#[derive(Debug)]
pub struct IdentityMap {
    container: SurfaceHandle,
    roots: Vec<Slot>,
}

impl IdentityMap {
    pub fn new(container: SurfaceHandle) -> Self {
        debug_assert!(container.is_valid(), "container handle must be non-zero");
        Self {
            container,
            roots: Vec::new(),
        }
    }

    pub fn container(&self) -> SurfaceHandle {
        self.container
    }

    pub fn resolve(&self, path: &NodePath) -> Option<SurfaceHandle> {
        match path.split_last() {
            None => Some(self.container),
            Some((parent, index)) => self.children(&parent)?.get(index).map(Slot::handle),
        }
    }

    /// Number of children recorded under `parent`.
    pub fn child_count(&self, parent: &NodePath) -> Option<usize> {
        self.children(parent).map(Vec::len)
    }

    /// Records `slot` at `index` under `parent`. Returns `false` when the
    /// parent is unknown or `index` is past the end.
    pub fn insert(&mut self, parent: &NodePath, index: usize, slot: Slot) -> bool {
        match self.children_mut(parent) {
            Some(children) if index <= children.len() => {
                children.insert(index, slot);
                true
            }
            _ => false,
        }
    }

    /// Forgets the node at `path` and its whole subtree.
    pub fn remove(&mut self, path: &NodePath) -> Option<Slot> {
        let (parent, index) = path.split_last()?;
        let children = self.children_mut(&parent)?;
        (index < children.len()).then(|| children.remove(index))
    }

    /// Re-indexes the node at `path` to `new_index` within the same parent;
    /// `new_index` counts positions after the node was taken out.
    pub fn move_to(&mut self, path: &NodePath, new_index: usize) -> bool {
        let Some((parent, index)) = path.split_last() else {
            return false;
        };
        let Some(children) = self.children_mut(&parent) else {
            return false;
        };
        if index >= children.len() || new_index >= children.len() {
            return false;
        }
        let slot = children.remove(index);
        children.insert(new_index, slot);
        true
    }

    /// Number of recorded handles, the container excluded.
    pub fn len(&self) -> usize {
        self.roots.iter().map(Slot::subtree_len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Slots attached directly to the container.
    pub fn top_level(&self) -> &[Slot] {
        &self.roots
    }

    /// Keeps the top-level slots for which `keep` returns `true`, in order.
    pub fn retain_top_level(&mut self, keep: impl FnMut(&Slot) -> bool) {
        self.roots.retain(keep);
    }

    fn children(&self, path: &NodePath) -> Option<&Vec<Slot>> {
        let mut children = &self.roots;
        for &index in path.indices() {
            children = &children.get(index)?.children;
        }
        Some(children)
    }

    fn children_mut(&mut self, path: &NodePath) -> Option<&mut Vec<Slot>> {
        let mut children = &mut self.roots;
        for &index in path.indices() {
            children = &mut children.get_mut(index)?.children;
        }
        Some(children)
    }
}

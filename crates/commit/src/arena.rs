//! In-memory surface.
//!
//! Every record lives in one vector indexed by handle; detached records are
//! kept so their handles stay addressable. The arena checks the same
//! structural rules a real surface would (no double attach, no cycles, no
//! out-of-range index) and reports violations as `SurfaceError`s.

use crate::surface::{Surface, SurfaceError};
use core_types::SurfaceHandle;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use vtree::{Child, Node, Tag, TextValue, Value};

/// Operation counters, reset only by creating a new arena.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SurfaceStats {
    pub elements_created: usize,
    pub texts_created: usize,
    pub attribute_writes: usize,
    pub text_writes: usize,
    pub attaches: usize,
    pub detaches: usize,
}

impl SurfaceStats {
    pub fn created(&self) -> usize {
        self.elements_created + self.texts_created
    }
}

impl fmt::Display for SurfaceStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created={} attrs={} texts={} attaches={} detaches={}",
            self.created(),
            self.attribute_writes,
            self.text_writes,
            self.attaches,
            self.detaches
        )
    }
}

#[derive(Debug)]
pub struct ArenaSurface {
    nodes: Vec<NodeRecord>,
    container: SurfaceHandle,
    stats: SurfaceStats,
}

impl ArenaSurface {
    /// Creates an arena holding only its container record.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeRecord::new(NodeKind::Container)],
            container: SurfaceHandle(1),
            stats: SurfaceStats::default(),
        }
    }

    pub fn container(&self) -> SurfaceHandle {
        self.container
    }

    pub fn stats(&self) -> SurfaceStats {
        self.stats
    }

    /// Records reachable from the container, the container excluded.
    pub fn attached_count(&self) -> usize {
        let mut count = 0;
        let mut stack = self.nodes[0].children.clone();
        while let Some(handle) = stack.pop() {
            count += 1;
            if let Some(record) = self.record(handle) {
                stack.extend(record.children.iter().copied());
            }
        }
        count
    }

    pub fn parent_of(&self, handle: SurfaceHandle) -> Option<SurfaceHandle> {
        self.record(handle)?.parent
    }

    pub fn children_of(&self, handle: SurfaceHandle) -> &[SurfaceHandle] {
        self.record(handle)
            .map(|record| record.children.as_slice())
            .unwrap_or(&[])
    }

    /// Rebuilds the children of `parent` as tree values. Keys are not kept
    /// by the surface, so rebuilt nodes carry none.
    pub fn materialize_children(&self, parent: SurfaceHandle) -> Result<Vec<Child>, SurfaceError> {
        let record = self.lookup("materialize", parent)?;
        record
            .children
            .iter()
            .map(|&child| self.materialize_child(child))
            .collect()
    }

    /// Rebuilds the single tree attached to the container, if any.
    pub fn materialize_root(&self) -> Result<Option<Node>, SurfaceError> {
        let mut children = self.materialize_children(self.container)?;
        match children.len() {
            0 => Ok(None),
            1 => match children.pop() {
                Some(Child::Element(node)) => Ok(Some(node)),
                _ => Err(SurfaceError::new("materialize", "container holds a bare text leaf")),
            },
            n => Err(SurfaceError::new(
                "materialize",
                format!("container holds {n} top-level nodes"),
            )),
        }
    }

    fn materialize_child(&self, handle: SurfaceHandle) -> Result<Child, SurfaceError> {
        let record = self.lookup("materialize", handle)?;
        match &record.kind {
            NodeKind::Text { text } => Ok(Child::Text(text.clone())),
            NodeKind::Element { tag, attributes } => {
                let mut builder = Node::element(tag.clone());
                for (name, value) in attributes {
                    builder = builder.attr(Arc::clone(name), value.clone());
                }
                for &child in &record.children {
                    builder = builder.child(self.materialize_child(child)?);
                }
                Ok(Child::Element(builder.build()))
            }
            NodeKind::Container => Err(SurfaceError::new(
                "materialize",
                "container nested inside the tree",
            )),
        }
    }

    fn record(&self, handle: SurfaceHandle) -> Option<&NodeRecord> {
        let index = (handle.0 as usize).checked_sub(1)?;
        self.nodes.get(index)
    }

    fn lookup(&self, op: &'static str, handle: SurfaceHandle) -> Result<&NodeRecord, SurfaceError> {
        self.record(handle)
            .ok_or_else(|| SurfaceError::new(op, format!("unknown handle {handle}")))
    }

    fn lookup_mut(
        &mut self,
        op: &'static str,
        handle: SurfaceHandle,
    ) -> Result<&mut NodeRecord, SurfaceError> {
        let index = (handle.0 as usize).checked_sub(1);
        index
            .and_then(|index| self.nodes.get_mut(index))
            .ok_or_else(|| SurfaceError::new(op, format!("unknown handle {handle}")))
    }

    fn allocate(&mut self, op: &'static str, kind: NodeKind) -> Result<SurfaceHandle, SurfaceError> {
        let raw = u32::try_from(self.nodes.len() + 1)
            .map_err(|_| SurfaceError::new(op, "handle space exhausted"))?;
        self.nodes.push(NodeRecord::new(kind));
        Ok(SurfaceHandle(raw))
    }

    fn is_descendant(&self, ancestor: SurfaceHandle, maybe_descendant: SurfaceHandle) -> bool {
        let mut stack = self.children_of(ancestor).to_vec();
        while let Some(current) = stack.pop() {
            if current == maybe_descendant {
                return true;
            }
            stack.extend(self.children_of(current).iter().copied());
        }
        false
    }
}

impl Default for ArenaSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface for ArenaSurface {
    fn create_element(&mut self, tag: &Tag) -> Result<SurfaceHandle, SurfaceError> {
        let handle = self.allocate(
            "create_element",
            NodeKind::Element {
                tag: tag.clone(),
                attributes: BTreeMap::new(),
            },
        )?;
        self.stats.elements_created += 1;
        Ok(handle)
    }

    fn create_text(&mut self, value: &TextValue) -> Result<SurfaceHandle, SurfaceError> {
        let handle = self.allocate(
            "create_text",
            NodeKind::Text {
                text: value.clone(),
            },
        )?;
        self.stats.texts_created += 1;
        Ok(handle)
    }

    fn set_text(&mut self, handle: SurfaceHandle, value: &TextValue) -> Result<(), SurfaceError> {
        let record = self.lookup_mut("set_text", handle)?;
        match &mut record.kind {
            NodeKind::Text { text } => *text = value.clone(),
            _ => {
                return Err(SurfaceError::new(
                    "set_text",
                    format!("{handle} is not a text leaf"),
                ));
            }
        }
        self.stats.text_writes += 1;
        Ok(())
    }

    fn set_attribute(
        &mut self,
        handle: SurfaceHandle,
        name: &str,
        value: &Value,
    ) -> Result<(), SurfaceError> {
        let record = self.lookup_mut("set_attribute", handle)?;
        match &mut record.kind {
            NodeKind::Element { attributes, .. } => {
                attributes.insert(Arc::from(name), value.clone());
            }
            _ => {
                return Err(SurfaceError::new(
                    "set_attribute",
                    format!("{handle} is not an element"),
                ));
            }
        }
        self.stats.attribute_writes += 1;
        Ok(())
    }

    fn remove_attribute(&mut self, handle: SurfaceHandle, name: &str) -> Result<(), SurfaceError> {
        let record = self.lookup_mut("remove_attribute", handle)?;
        match &mut record.kind {
            NodeKind::Element { attributes, .. } => {
                attributes.remove(name);
            }
            _ => {
                return Err(SurfaceError::new(
                    "remove_attribute",
                    format!("{handle} is not an element"),
                ));
            }
        }
        self.stats.attribute_writes += 1;
        Ok(())
    }

    fn append_child(
        &mut self,
        parent: SurfaceHandle,
        child: SurfaceHandle,
        index: usize,
    ) -> Result<(), SurfaceError> {
        const OP: &str = "append_child";
        if parent == child || self.is_descendant(child, parent) {
            return Err(SurfaceError::new(
                OP,
                format!("attaching {child} under {parent} would create a cycle"),
            ));
        }
        let child_record = self.lookup(OP, child)?;
        if let Some(existing) = child_record.parent {
            return Err(SurfaceError::new(
                OP,
                format!("{child} is already attached to {existing}"),
            ));
        }
        if matches!(child_record.kind, NodeKind::Container) {
            return Err(SurfaceError::new(OP, "the container cannot be attached"));
        }
        let parent_record = self.lookup_mut(OP, parent)?;
        if !parent_record.allows_children() {
            return Err(SurfaceError::new(OP, format!("{parent} cannot have children")));
        }
        if index > parent_record.children.len() {
            return Err(SurfaceError::new(
                OP,
                format!(
                    "index {index} out of range for {parent} with {} children",
                    parent_record.children.len()
                ),
            ));
        }
        parent_record.children.insert(index, child);
        self.lookup_mut(OP, child)?.parent = Some(parent);
        self.stats.attaches += 1;
        Ok(())
    }

    fn remove_child(
        &mut self,
        parent: SurfaceHandle,
        child: SurfaceHandle,
    ) -> Result<(), SurfaceError> {
        const OP: &str = "remove_child";
        if self.lookup(OP, child)?.parent != Some(parent) {
            return Err(SurfaceError::new(
                OP,
                format!("{child} is not a child of {parent}"),
            ));
        }
        let parent_record = self.lookup_mut(OP, parent)?;
        parent_record.children.retain(|&handle| handle != child);
        self.lookup_mut(OP, child)?.parent = None;
        self.stats.detaches += 1;
        Ok(())
    }
}

#[derive(Debug)]
struct NodeRecord {
    kind: NodeKind,
    parent: Option<SurfaceHandle>,
    children: Vec<SurfaceHandle>,
}

impl NodeRecord {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
        }
    }

    fn allows_children(&self) -> bool {
        matches!(self.kind, NodeKind::Container | NodeKind::Element { .. })
    }
}

#[derive(Debug)]
enum NodeKind {
    Container,
    Element {
        tag: Tag,
        attributes: BTreeMap<Arc<str>, Value>,
    },
    Text {
        text: TextValue,
    },
}

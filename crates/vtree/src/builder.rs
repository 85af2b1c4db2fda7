//! Tree construction helpers for producers.
//!
//! Later attributes with the same name overwrite earlier ones.

use crate::types::{Child, Node, Tag, TextValue, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct ElementBuilder {
    tag: Tag,
    key: Option<Arc<str>>,
    attributes: BTreeMap<Arc<str>, Value>,
    children: Vec<Child>,
}

impl ElementBuilder {
    pub fn new(tag: impl Into<Tag>) -> Self {
        Self {
            tag: tag.into(),
            key: None,
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn attr(mut self, name: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn child(mut self, child: impl Into<Child>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I, C>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Child>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn text(self, value: impl Into<TextValue>) -> Self {
        self.child(Child::Text(value.into()))
    }

    pub fn build(self) -> Node {
        Node::from_parts(self.tag, self.key, self.attributes, self.children)
    }
}

impl From<ElementBuilder> for Node {
    fn from(builder: ElementBuilder) -> Self {
        builder.build()
    }
}

impl From<ElementBuilder> for Child {
    fn from(builder: ElementBuilder) -> Self {
        Child::Element(builder.build())
    }
}

impl Node {
    pub fn element(tag: impl Into<Tag>) -> ElementBuilder {
        ElementBuilder::new(tag)
    }
}

/// `create_element(type, props, children)` in one call.
pub fn create_element<A, N, V, C>(tag: impl Into<Tag>, attributes: A, children: C) -> Node
where
    A: IntoIterator<Item = (N, V)>,
    N: Into<Arc<str>>,
    V: Into<Value>,
    C: IntoIterator<Item = Child>,
{
    let mut builder = ElementBuilder::new(tag);
    for (name, value) in attributes {
        builder = builder.attr(name, value);
    }
    builder.children(children).build()
}

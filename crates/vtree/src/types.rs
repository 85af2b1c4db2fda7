use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Tag surfaces use when they materialize a text leaf as a node.
pub const TEXT_TAG: &str = "#text";

/// Named reference to a component. Producers expand components before
/// handing trees to the differ; the reconciler only compares names.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentRef {
    name: Arc<str>,
}

impl ComponentRef {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Surface-native element, e.g. `ul`.
    Host(Arc<str>),
    Component(ComponentRef),
}

impl Tag {
    pub fn host(name: impl Into<Arc<str>>) -> Self {
        Tag::Host(name.into())
    }

    pub fn component(name: impl Into<Arc<str>>) -> Self {
        Tag::Component(ComponentRef::new(name))
    }

    pub fn name(&self) -> &str {
        match self {
            Tag::Host(name) => name,
            Tag::Component(component) => component.name(),
        }
    }
}

impl From<&str> for Tag {
    fn from(name: &str) -> Self {
        Tag::host(name)
    }
}

impl From<ComponentRef> for Tag {
    fn from(component: ComponentRef) -> Self {
        Tag::Component(component)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Host(name) => f.write_str(name),
            Tag::Component(component) => write!(f, "@{}", component.name()),
        }
    }
}

/// Opaque callback identity. Two references are equal when their names are.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionRef {
    name: Arc<str>,
}

impl FunctionRef {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Attribute value. Numbers compare bit for bit, so `-0.0` and `0.0`
/// differ just as their renderings do.
#[derive(Clone, Debug)]
pub enum Value {
    Str(Arc<str>),
    Number(f64),
    Bool(bool),
    Function(FunctionRef),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a.to_bits() == b.to_bits(),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(Arc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Arc::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(f64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<FunctionRef> for Value {
    fn from(value: FunctionRef) -> Self {
        Value::Function(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Function(func) => write!(f, "fn {}", func.name()),
        }
    }
}

/// Scalar rendered as text content. Numbers compare like [`Value`] numbers.
#[derive(Clone, Debug)]
pub enum TextValue {
    Str(Arc<str>),
    Number(f64),
}

impl PartialEq for TextValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TextValue::Str(a), TextValue::Str(b)) => a == b,
            (TextValue::Number(a), TextValue::Number(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl From<&str> for TextValue {
    fn from(value: &str) -> Self {
        TextValue::Str(Arc::from(value))
    }
}

impl From<String> for TextValue {
    fn from(value: String) -> Self {
        TextValue::Str(Arc::from(value))
    }
}

impl From<f64> for TextValue {
    fn from(value: f64) -> Self {
        TextValue::Number(value)
    }
}

impl From<i32> for TextValue {
    fn from(value: i32) -> Self {
        TextValue::Number(f64::from(value))
    }
}

impl fmt::Display for TextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextValue::Str(s) => f.write_str(s),
            TextValue::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Immutable description of one element.
///
/// Attributes are kept sorted by name; the order they were supplied in does
/// not matter. Build nodes with [`Node::element`] or
/// [`create_element`](crate::create_element).
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    tag: Tag,
    key: Option<Arc<str>>,
    attributes: BTreeMap<Arc<str>, Value>,
    children: Vec<Child>,
}

impl Node {
    pub(crate) fn from_parts(
        tag: Tag,
        key: Option<Arc<str>>,
        attributes: BTreeMap<Arc<str>, Value>,
        children: Vec<Child>,
    ) -> Self {
        Self {
            tag,
            key,
            attributes,
            children,
        }
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn attributes(&self) -> &BTreeMap<Arc<str>, Value> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn children(&self) -> &[Child] {
        &self.children
    }

    /// Same tag and same key: the differ may update one into the other.
    pub fn is_same_element(&self, other: &Node) -> bool {
        self.tag == other.tag && self.key == other.key
    }

    #[cfg(test)]
    pub(crate) fn children_mut(&mut self) -> &mut Vec<Child> {
        &mut self.children
    }

    /// Number of elements and text leaves in this subtree, itself included.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Child::subtree_len).sum::<usize>()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Child {
    Element(Node),
    Text(TextValue),
}

impl Child {
    pub fn text(value: impl Into<TextValue>) -> Self {
        Child::Text(value.into())
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            Child::Element(node) => node.key(),
            Child::Text(_) => None,
        }
    }

    pub fn as_element(&self) -> Option<&Node> {
        match self {
            Child::Element(node) => Some(node),
            Child::Text(_) => None,
        }
    }

    pub fn subtree_len(&self) -> usize {
        match self {
            Child::Element(node) => node.subtree_len(),
            Child::Text(_) => 1,
        }
    }
}

impl From<Node> for Child {
    fn from(node: Node) -> Self {
        Child::Element(node)
    }
}

impl From<TextValue> for Child {
    fn from(value: TextValue) -> Self {
        Child::Text(value)
    }
}

impl From<&str> for Child {
    fn from(value: &str) -> Self {
        Child::Text(value.into())
    }
}

impl From<String> for Child {
    fn from(value: String) -> Self {
        Child::Text(value.into())
    }
}

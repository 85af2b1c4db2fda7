use crate::types::{Child, Node};
use std::fmt::{self, Write};
use std::sync::OnceLock;

/// Deterministic tree serialization and equality rules for tests.
/// Not a public stable format.
///
/// Equivalence rules:
/// - Node kinds (element vs text) must match.
/// - Tags must match, including host vs component.
/// - Attributes must match as a set; order never matters.
/// - Text must match after rendering (`3` and `3.0` are the same text).
/// - Keys can be ignored by options; surfaces do not keep them.
#[derive(Clone, Copy, Debug, Default)]
pub struct TreeSnapshotOptions {
    pub ignore_keys: bool,
}

#[derive(Debug)]
pub struct TreeSnapshot {
    lines: Vec<String>,
}

impl TreeSnapshot {
    pub fn new(root: &Node, options: TreeSnapshotOptions) -> Self {
        let mut lines = Vec::new();
        walk_snapshot(&Child::Element(root.clone()), &options, 0, &mut lines);
        Self { lines }
    }

    pub fn as_lines(&self) -> &[String] {
        &self.lines
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

impl fmt::Display for TreeSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[derive(Debug)]
pub struct TreeMismatch<'a> {
    path: String,
    detail: String,
    expected: &'a Node,
    actual: &'a Node,
    options: TreeSnapshotOptions,
    rendered: OnceLock<(String, String)>,
}

impl fmt::Display for TreeMismatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (expected, actual) = self.rendered.get_or_init(|| {
            (
                TreeSnapshot::new(self.expected, self.options).render(),
                TreeSnapshot::new(self.actual, self.options).render(),
            )
        });
        writeln!(f, "tree mismatch at {}: {}", self.path, self.detail)?;
        writeln!(f, "expected tree:\n{expected}")?;
        writeln!(f, "actual tree:\n{actual}")?;
        Ok(())
    }
}

impl std::error::Error for TreeMismatch<'_> {}

pub fn assert_tree_eq(expected: &Node, actual: &Node, options: TreeSnapshotOptions) {
    if let Err(mismatch) = compare_tree(expected, actual, options) {
        panic!("{mismatch}");
    }
}

pub fn compare_tree<'a>(
    expected: &'a Node,
    actual: &'a Node,
    options: TreeSnapshotOptions,
) -> Result<(), Box<TreeMismatch<'a>>> {
    let mut path = vec![expected.tag().to_string()];
    let found = compare_nodes(expected, actual, &options, &mut path);
    match found {
        None => Ok(()),
        Some(detail) => Err(Box::new(TreeMismatch {
            path: path.join(" > "),
            detail,
            expected,
            actual,
            options,
            rendered: OnceLock::new(),
        })),
    }
}

// Returns the first difference; `path` is left pointing at it.
fn compare_nodes(
    expected: &Node,
    actual: &Node,
    options: &TreeSnapshotOptions,
    path: &mut Vec<String>,
) -> Option<String> {
    if expected.tag() != actual.tag() {
        return Some(format!("tag {} != {}", expected.tag(), actual.tag()));
    }
    if !options.ignore_keys && expected.key() != actual.key() {
        return Some(format!("key {:?} != {:?}", expected.key(), actual.key()));
    }
    if expected.attributes() != actual.attributes() {
        return Some(format!(
            "attributes [{}] != [{}]",
            format_attributes(expected),
            format_attributes(actual)
        ));
    }
    let (expected_children, actual_children) = (expected.children(), actual.children());
    if expected_children.len() != actual_children.len() {
        return Some(format!(
            "child count {} != {}",
            expected_children.len(),
            actual_children.len()
        ));
    }
    for (index, (want, got)) in expected_children.iter().zip(actual_children).enumerate() {
        match (want, got) {
            (Child::Text(want), Child::Text(got)) => {
                if want.to_string() != got.to_string() {
                    path.push(format!("#text[{index}]"));
                    return Some(format!("text {:?} != {:?}", want.to_string(), got.to_string()));
                }
            }
            (Child::Element(want), Child::Element(got)) => {
                path.push(format!("{}[{index}]", want.tag()));
                if let Some(detail) = compare_nodes(want, got, options, path) {
                    return Some(detail);
                }
                path.pop();
            }
            _ => {
                path.push(format!("[{index}]"));
                return Some("element vs text".to_string());
            }
        }
    }
    None
}

fn format_attributes(node: &Node) -> String {
    let mut out = String::new();
    for (i, (name, value)) in node.attributes().iter().enumerate() {
        if i != 0 {
            out.push(' ');
        }
        let _ = write!(out, "{name}={value}");
    }
    out
}

fn walk_snapshot(
    child: &Child,
    options: &TreeSnapshotOptions,
    depth: usize,
    lines: &mut Vec<String>,
) {
    let indent = "  ".repeat(depth);
    match child {
        Child::Text(text) => lines.push(format!("{indent}{:?}", text.to_string())),
        Child::Element(node) => {
            let mut line = format!("{indent}<{}", node.tag());
            if let (false, Some(key)) = (options.ignore_keys, node.key()) {
                let _ = write!(line, " key={key:?}");
            }
            for (name, value) in node.attributes() {
                let _ = write!(line, " {name}={value}");
            }
            line.push('>');
            lines.push(line);
            for child in node.children() {
                walk_snapshot(child, options, depth + 1, lines);
            }
        }
    }
}

use crate::diff::DiffError;
use crate::mutation::NodePath;
use crate::types::{Child, Node, TextValue, Value};
use std::collections::HashSet;

/// Checks the whole tree rooted at `node` (located at `path`).
pub(crate) fn validate_tree(node: &Node, path: &NodePath) -> Result<(), DiffError> {
    for (name, value) in node.attributes() {
        if name.is_empty() {
            return Err(DiffError::Value {
                path: path.clone(),
                detail: "empty attribute name".to_string(),
            });
        }
        if let Value::Number(n) = value {
            if !n.is_finite() {
                return Err(DiffError::Value {
                    path: path.clone(),
                    detail: format!("attribute {name} is not a finite number ({n})"),
                });
            }
        }
    }

    let mut seen = HashSet::new();
    for (index, child) in node.children().iter().enumerate() {
        match child {
            Child::Element(element) => {
                if let Some(key) = element.key() {
                    if !seen.insert(key) {
                        return Err(DiffError::Shape {
                            path: path.clone(),
                            key: key.to_string(),
                        });
                    }
                }
                validate_tree(element, &path.child(index))?;
            }
            Child::Text(TextValue::Number(n)) if !n.is_finite() => {
                return Err(DiffError::Value {
                    path: path.child(index),
                    detail: format!("text is not a finite number ({n})"),
                });
            }
            Child::Text(_) => {}
        }
    }
    Ok(())
}

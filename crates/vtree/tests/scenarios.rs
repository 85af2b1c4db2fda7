use serde::Deserialize;
use std::collections::BTreeMap;
use vtree::snapshot::{TreeSnapshot, TreeSnapshotOptions};
use vtree::{Child, DiffError, ElementBuilder, Node, Tag, Value, diff};

const CASES: &str = include_str!("fixtures/diff_cases.toml");

#[derive(Debug, Deserialize)]
struct Manifest {
    case: Vec<Case>,
}

#[derive(Debug, Deserialize)]
struct Case {
    name: String,
    old: Option<TreeSpec>,
    new: Option<TreeSpec>,
    #[serde(default)]
    expect: Vec<String>,
    expect_error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TreeSpec {
    tag: String,
    #[serde(default)]
    component: bool,
    key: Option<String>,
    #[serde(default)]
    attrs: BTreeMap<String, AttrSpec>,
    #[serde(default)]
    children: Vec<ChildSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AttrSpec {
    Bool(bool),
    Number(f64),
    Str(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChildSpec {
    Text(String),
    Element(TreeSpec),
}

impl TreeSpec {
    fn build(&self) -> Node {
        let tag = if self.component {
            Tag::component(self.tag.as_str())
        } else {
            Tag::host(self.tag.as_str())
        };
        let mut builder = ElementBuilder::new(tag);
        if let Some(key) = &self.key {
            builder = builder.key(key.as_str());
        }
        for (name, value) in &self.attrs {
            let value = match value {
                AttrSpec::Bool(b) => Value::Bool(*b),
                AttrSpec::Number(n) => Value::Number(*n),
                AttrSpec::Str(s) => Value::from(s.as_str()),
            };
            builder = builder.attr(name.as_str(), value);
        }
        for child in &self.children {
            builder = builder.child(match child {
                ChildSpec::Text(text) => Child::text(text.as_str()),
                ChildSpec::Element(spec) => Child::Element(spec.build()),
            });
        }
        builder.build()
    }
}

fn load_cases() -> Vec<Case> {
    let manifest: Manifest = toml::from_str(CASES).expect("diff_cases.toml must parse");
    assert!(!manifest.case.is_empty(), "no diff cases found");
    manifest.case
}

#[test]
fn diff_cases_match_expectations() {
    let mut failures = Vec::new();
    for case in load_cases() {
        let old = case.old.as_ref().map(TreeSpec::build);
        let new = case.new.as_ref().map(TreeSpec::build);
        let result = diff(old.as_ref(), new.as_ref());
        match (&case.expect_error, result) {
            (Some(kind), Err(err)) => {
                let actual = match err {
                    DiffError::Shape { .. } => "shape",
                    DiffError::Value { .. } => "value",
                };
                if actual != kind.as_str() {
                    failures.push(format!("{}: expected {kind} error, got {err}", case.name));
                }
            }
            (Some(kind), Ok(mutations)) => failures.push(format!(
                "{}: expected {kind} error, got {} mutations",
                case.name,
                mutations.len()
            )),
            (None, Err(err)) => failures.push(format!("{}: unexpected error {err}", case.name)),
            (None, Ok(mutations)) => {
                let actual: Vec<String> = mutations.iter().map(ToString::to_string).collect();
                if actual != case.expect {
                    failures.push(format!(
                        "{}:\n  expected {:?}\n  actual   {:?}",
                        case.name, case.expect, actual
                    ));
                }
            }
        }
    }
    assert!(failures.is_empty(), "diff case failures:\n{}", failures.join("\n"));
}

#[test]
fn fixture_trees_diff_to_nothing_against_themselves() {
    for case in load_cases() {
        if case.expect_error.is_some() {
            continue;
        }
        for spec in [&case.old, &case.new].into_iter().flatten() {
            let tree = spec.build();
            let mutations = diff(Some(&tree), Some(&tree)).expect("valid fixture tree");
            assert!(
                mutations.is_empty(),
                "{}: self-diff not empty for\n{}",
                case.name,
                TreeSnapshot::new(&tree, TreeSnapshotOptions::default())
            );
        }
    }
}

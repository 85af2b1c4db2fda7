use commit::{ArenaSurface, CommitError, Committer, Surface, SurfaceError};
use core_types::SurfaceHandle;
use proptest::prelude::*;
use vtree::corpus::scenarios;
use vtree::snapshot::{TreeSnapshotOptions, compare_tree};
use std::collections::BTreeSet;
use vtree::{Child, MutationCounts, MutationKind, Node, Tag, TextValue, Value, diff};

const NO_KEYS: TreeSnapshotOptions = TreeSnapshotOptions { ignore_keys: true };

fn arena_committer() -> Committer<ArenaSurface> {
    let surface = ArenaSurface::new();
    let container = surface.container();
    Committer::new(surface, container)
}

fn commit_pair(old: Option<&Node>, new: Option<&Node>) -> Committer<ArenaSurface> {
    let mut committer = arena_committer();
    committer
        .commit(&diff(None, old).expect("old tree is valid"))
        .expect("mount commits");
    committer
        .commit(&diff(old, new).expect("trees are valid"))
        .expect("update commits");
    committer
}

fn assert_renders(committer: &Committer<ArenaSurface>, expected: Option<&Node>, name: &str) {
    let actual = committer
        .surface()
        .materialize_root()
        .expect("surface materializes");
    match (expected, actual.as_ref()) {
        (None, None) => {}
        (Some(expected), Some(actual)) => {
            if let Err(mismatch) = compare_tree(expected, actual, NO_KEYS) {
                panic!("scenario {name}: {mismatch}");
            }
        }
        (expected, actual) => panic!("scenario {name}: expected {expected:?}, got {actual:?}"),
    }
    let expected_len = expected.map_or(0, Node::subtree_len);
    assert_eq!(
        committer.identity().len(),
        expected_len,
        "scenario {name}: identity map size"
    );
    assert_eq!(
        committer.surface().attached_count(),
        expected_len,
        "scenario {name}: attached nodes"
    );
}

#[test]
fn corpus_scenarios_round_trip_through_the_arena() {
    for scenario in scenarios() {
        let committer = commit_pair(scenario.old.as_ref(), scenario.new.as_ref());
        assert_renders(&committer, scenario.new.as_ref(), scenario.name);
    }
}

#[test]
fn chained_scenarios_reuse_one_surface() {
    let mut committer = arena_committer();
    let mut current: Option<Node> = None;
    for scenario in scenarios() {
        for next in [scenario.old.as_ref(), scenario.new.as_ref()] {
            let mutations = diff(current.as_ref(), next).expect("trees are valid");
            committer.commit(&mutations).expect("commits");
            current = next.cloned();
            assert_renders(&committer, current.as_ref(), scenario.name);
        }
    }
}

#[test]
fn keyed_reorder_reuses_handles() {
    let scenario = scenarios()
        .into_iter()
        .find(|s| s.name == "keyed-reverse")
        .expect("corpus has keyed-reverse");
    let (old, new) = (scenario.old.expect("old"), scenario.new.expect("new"));
    let mut committer = arena_committer();
    committer.commit(&diff(None, Some(&old)).expect("valid")).expect("mount");
    let created = committer.surface().stats().created();

    let mutations = diff(Some(&old), Some(&new)).expect("valid");
    let counts = MutationCounts::of(&mutations);
    assert_eq!(counts.total(), counts.moves);
    let summary = committer.commit(&mutations).expect("reorder commits");
    assert_eq!(summary.created, 0);
    assert_eq!(committer.surface().stats().created(), created);
    assert_renders(&committer, Some(&new), scenario.name);
}

/// Delegates to an arena and fails every operation once `budget` runs out.
/// Text goes through the default `create_text`.
struct FlakySurface {
    inner: ArenaSurface,
    budget: usize,
}

impl FlakySurface {
    fn spend(&mut self, op: &'static str) -> Result<(), SurfaceError> {
        if self.budget == 0 {
            return Err(SurfaceError::new(op, "injected failure"));
        }
        self.budget -= 1;
        Ok(())
    }
}

impl Surface for FlakySurface {
    fn create_element(&mut self, tag: &Tag) -> Result<SurfaceHandle, SurfaceError> {
        self.spend("create_element")?;
        if tag.name() == vtree::TEXT_TAG {
            return self.inner.create_text(&TextValue::from(""));
        }
        self.inner.create_element(tag)
    }

    fn set_text(&mut self, handle: SurfaceHandle, value: &TextValue) -> Result<(), SurfaceError> {
        self.spend("set_text")?;
        self.inner.set_text(handle, value)
    }

    fn set_attribute(
        &mut self,
        handle: SurfaceHandle,
        name: &str,
        value: &Value,
    ) -> Result<(), SurfaceError> {
        self.spend("set_attribute")?;
        self.inner.set_attribute(handle, name, value)
    }

    fn remove_attribute(&mut self, handle: SurfaceHandle, name: &str) -> Result<(), SurfaceError> {
        self.spend("remove_attribute")?;
        self.inner.remove_attribute(handle, name)
    }

    fn append_child(
        &mut self,
        parent: SurfaceHandle,
        child: SurfaceHandle,
        index: usize,
    ) -> Result<(), SurfaceError> {
        self.spend("append_child")?;
        self.inner.append_child(parent, child, index)
    }

    fn remove_child(
        &mut self,
        parent: SurfaceHandle,
        child: SurfaceHandle,
    ) -> Result<(), SurfaceError> {
        self.spend("remove_child")?;
        self.inner.remove_child(parent, child)
    }
}

fn flaky_committer(budget: usize) -> Committer<FlakySurface> {
    let inner = ArenaSurface::new();
    let container = inner.container();
    Committer::new(FlakySurface { inner, budget }, container)
}

#[test]
fn default_create_text_builds_text_leaves() {
    let tree = Node::element("p").text("Serves ").text(4).build();
    let mut committer = flaky_committer(usize::MAX);
    committer.commit(&diff(None, Some(&tree)).expect("valid")).expect("mount");
    let rendered = committer
        .surface()
        .inner
        .materialize_root()
        .expect("materializes")
        .expect("mounted");
    assert_eq!(rendered, tree);
}

#[test]
fn surface_failure_keeps_earlier_mutations() {
    let old = Node::element("ul")
        .child(Node::element("li").text("A"))
        .child(Node::element("li").text("B"))
        .build();
    let new = Node::element("ul")
        .child(Node::element("li").text("X"))
        .child(Node::element("li").text("A"))
        .child(Node::element("li").text("B"))
        .build();
    let mutations = diff(Some(&old), Some(&new)).expect("valid");
    assert_eq!(mutations.len(), 3);

    let mut committer = flaky_committer(usize::MAX);
    committer.commit(&diff(None, Some(&old)).expect("valid")).expect("mount");
    // Two text writes succeed, the insert's first create fails.
    committer.surface_mut().budget = 2;
    let err = committer.commit(&mutations).expect_err("budget runs out");
    assert!(matches!(
        err,
        CommitError::Surface {
            index: 2,
            kind: MutationKind::InsertNode,
            ..
        }
    ));
    assert!(!err.is_fatal());

    let partial = Node::element("ul")
        .child(Node::element("li").text("X"))
        .child(Node::element("li").text("A"))
        .build();
    let rendered = committer
        .surface()
        .inner
        .materialize_root()
        .expect("materializes")
        .expect("mounted");
    assert_eq!(rendered, partial);
    assert_eq!(committer.identity().len(), partial.subtree_len());
}

#[test]
fn failed_insert_leaves_its_partial_build_detached() {
    let old = Node::element("ul")
        .child(Node::element("li").text("A"))
        .build();
    let new = Node::element("ul")
        .child(Node::element("li").text("A"))
        .child(Node::element("li").text("B"))
        .build();
    let mut committer = flaky_committer(usize::MAX);
    committer.commit(&diff(None, Some(&old)).expect("valid")).expect("mount");
    let created = committer.surface().inner.stats().created();

    // The `li` and its text node are created; writing the text fails.
    committer.surface_mut().budget = 2;
    let err = committer
        .commit(&diff(Some(&old), Some(&new)).expect("valid"))
        .expect_err("budget runs out");
    assert!(matches!(
        err,
        CommitError::Surface {
            index: 0,
            kind: MutationKind::InsertNode,
            ..
        }
    ));
    assert_eq!(committer.surface().inner.stats().created(), created + 2);
    assert_eq!(committer.surface().inner.attached_count(), old.subtree_len());
    assert_eq!(committer.identity().len(), old.subtree_len());
}

fn arb_list() -> impl Strategy<Value = Node> {
    let item = (0usize..6, prop::sample::select(vec!["li", "p"]), "[a-c]{0,2}");
    prop::collection::vec(item, 0..6).prop_map(|items| {
        let mut seen = BTreeSet::new();
        Node::element("ul")
            .children(
                items
                    .into_iter()
                    .filter(|(key, _, _)| seen.insert(*key))
                    .map(|(key, tag, text)| Node::element(tag).key(key.to_string()).text(text)),
            )
            .build()
    })
}

fn arb_text() -> impl Strategy<Value = Child> {
    prop_oneof![
        3 => "[a-c]{0,2}".prop_map(Child::text),
        1 => (0i32..3).prop_map(Child::text),
    ]
}

// Copies `node` with a key, keeping tag, attributes and children.
fn rekey(node: Node, key: usize) -> Node {
    let mut builder = Node::element(node.tag().clone()).key(key.to_string());
    for (name, value) in node.attributes() {
        builder = builder.attr(name.clone(), value.clone());
    }
    builder.children(node.children().iter().cloned()).build()
}

/// Nested trees over a small tag and key space, so old and new trees
/// share elements. Each group is keyed or not; a trailing text child turns
/// a keyed group into a mixed one.
fn arb_tree() -> impl Strategy<Value = Node> {
    let tag = || prop::sample::select(vec!["div", "li", "p"]);
    let leaf = (tag(), arb_text()).prop_map(|(tag, text)| Node::element(tag).child(text).build());
    leaf.prop_recursive(4, 64, 5, move |inner| {
        let child = prop_oneof![
            3 => (0usize..6, inner).prop_map(|(key, node)| (Some(key), Child::Element(node))),
            1 => arb_text().prop_map(|text| (None::<usize>, text)),
        ];
        (
            tag(),
            any::<bool>(),
            prop::option::of(prop::sample::select(vec!["a", "b"])),
            prop::option::of(0i32..3),
            prop::collection::vec(child, 0..5),
            prop::option::of(arb_text()),
        )
            .prop_map(|(tag, keyed, class, serves, children, trailing)| {
                let mut builder = Node::element(tag);
                if let Some(class) = class {
                    builder = builder.attr("class", class);
                }
                if let Some(serves) = serves {
                    builder = builder.attr("data-serves", serves);
                }
                let mut seen = BTreeSet::new();
                for (key, child) in children {
                    match (key, child) {
                        (Some(key), Child::Element(node)) if keyed => {
                            if seen.insert(key) {
                                builder = builder.child(rekey(node, key));
                            }
                        }
                        (_, child) => builder = builder.child(child),
                    }
                }
                if let Some(text) = trailing {
                    builder = builder.child(text);
                }
                builder.build()
            })
    })
}

proptest! {
    #[test]
    fn nested_diff_renders_the_new_tree(old in arb_tree(), new in arb_tree()) {
        let committer = commit_pair(Some(&old), Some(&new));
        let rendered = committer
            .surface()
            .materialize_root()
            .expect("materializes")
            .expect("mounted");
        if let Err(mismatch) = compare_tree(&new, &rendered, NO_KEYS) {
            prop_assert!(false, "{}", mismatch);
        }
        prop_assert_eq!(committer.identity().len(), new.subtree_len());
        prop_assert_eq!(committer.surface().attached_count(), new.subtree_len());
    }

    #[test]
    fn committed_diff_renders_the_new_tree(old in arb_list(), new in arb_list()) {
        let committer = commit_pair(Some(&old), Some(&new));
        let rendered = committer
            .surface()
            .materialize_root()
            .expect("materializes")
            .expect("mounted");
        prop_assert!(compare_tree(&new, &rendered, NO_KEYS).is_ok());
        prop_assert_eq!(committer.identity().len(), new.subtree_len());
    }
}

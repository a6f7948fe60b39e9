//! Configuration Tree Tests
//!
//! Readiness events, pointer detachment, counting, snapshots and persistence.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use sweep_core::{
    ClassRegistry, ConstructError, Constructor, ConstructorSignature, Instance, ParamSpec, ParamType, TypeDecl,
    Value,
};
use sweep_test_utils::{
    foo_tree, recipe_strings, wrapper_catalog, wrapper_tree, x_signature, ReadyEvent, RecordingListener,
    Wrapper,
};
use sweep_tree::{AliasError, ConfigurationTree, NodeId, NodeKind, TreeError};

#[test]
fn test_readiness_fires_on_transitions_only() {
    let listener = RecordingListener::new();
    let (mut tree, foo) = foo_tree("1", "2");
    tree.add_listener(listener.clone());
    assert!(tree.is_ready());
    assert!(listener.events().is_empty());

    let b = tree.children(foo)[1];
    let leaf = tree.children(b)[0];
    tree.add_literal(b, "3").unwrap();
    assert!(listener.events().is_empty());

    tree.clear(b).unwrap();
    assert!(!tree.is_ready());
    tree.add_literal(tree.children(foo)[0], "5").unwrap();
    assert_eq!(listener.events(), vec![ReadyEvent::NotReady]);

    tree.add_literal(b, "4").unwrap();
    assert_eq!(listener.events(), vec![ReadyEvent::NotReady, ReadyEvent::Ready]);
    assert!(tree.node(leaf).is_none());
}

#[test]
fn test_removing_target_detaches_pointers() {
    let (mut tree, nodes) = wrapper_tree(false);
    assert!(tree.is_ready());

    tree.remove(nodes.x).unwrap();
    assert!(tree.node(nodes.pointer).is_none());
    assert!(!tree.is_ready());
    assert!(!tree.is_configured(nodes.wrapper));
}

#[test]
fn test_unconfigured_target_releases_index_and_pointers() {
    let (mut tree, nodes) = wrapper_tree(false);
    let before = tree.configured_constructors();
    assert!(before.iter().any(|r| r.node == nodes.x));

    let v = tree.children(nodes.x)[0];
    tree.clear(v).unwrap();
    assert!(!tree.is_configured(nodes.x));
    assert!(tree.node(nodes.pointer).is_none());
    assert!(tree.configured_constructors().iter().all(|r| r.node != nodes.x));

    // reconfiguring assigns a fresh index
    tree.add_literal(v, "1").unwrap();
    let index = tree
        .configured_constructors()
        .into_iter()
        .find(|r| r.node == nodes.x)
        .map(|r| r.index)
        .unwrap();
    assert!(before.iter().all(|r| r.index < index));
}

#[test]
fn test_counts() {
    let (tree, foo) = foo_tree("1:4", "1,2,3");
    assert_eq!(tree.combination_count(foo), 12);
    assert_eq!(tree.total_combinations(), 12);

    let (tree, nodes) = wrapper_tree(false);
    let arr_slot = tree.children(nodes.wrapper)[1];
    let arr = tree.children(arr_slot)[0];
    assert_eq!(tree.combination_count(arr), 1);
    assert_eq!(tree.instance_count(arr), 3);
    assert_eq!(tree.combination_count(nodes.pointer), 1);

    let (tree, nodes) = wrapper_tree(true);
    assert_eq!(tree.combination_count(nodes.pointer), 3);
}

#[test]
fn test_describe_and_registry() {
    let (tree, nodes) = wrapper_tree(false);
    let registered = tree.configured_constructors();
    assert_eq!(registered.len(), 2);
    assert!(registered.windows(2).all(|w| w[0].index < w[1].index));
    assert!(tree.describe(nodes.wrapper).ends_with(" : Wrapper(int, Elem[], Elem)"));
    assert!(tree.describe(nodes.pointer).starts_with("-> "));
    assert!(tree.render().contains("X(int)"));
}

#[test]
fn test_snapshot_is_independent() {
    let (mut tree, nodes) = wrapper_tree(false);
    let snapshot = tree.snapshot().unwrap();

    tree.remove(nodes.x).unwrap();
    assert!(!tree.is_ready());
    assert!(snapshot.is_ready());
    assert_eq!(snapshot.enumerate().unwrap().count(), 2);
}

#[test]
fn test_copy_constructor_adds_alternative() {
    let (mut tree, foo) = foo_tree("1,2", "10,20,30");
    let copy = tree.copy_constructor(foo).unwrap();
    assert_ne!(copy, foo);
    assert_eq!(tree.children(tree.root()), &[foo, copy]);
    assert_eq!(tree.total_combinations(), 12);

    let mut en = tree.enumerate().unwrap();
    let recipes = recipe_strings(&mut en);
    assert_eq!(&recipes[..6], &recipes[6..]);
}

#[test]
fn test_pointer_rejects_unoffered_type() {
    let (mut tree, nodes) = wrapper_tree(false);
    let k = tree.children(nodes.wrapper)[0];
    let err = tree.add_pointer(k, nodes.x).unwrap_err();
    assert!(matches!(err, TreeError::Incompatible { .. }));
}

fn unit(_: &[Value]) -> Result<Value, ConstructError> {
    Ok(Value::Object(Instance::new("Shape", ())))
}

/// Shapes nest: `Box(Shape inner)`, `Pair(Shape left, Shape right)`, `Dot()`
fn shape_catalog() -> Arc<ClassRegistry> {
    let mut registry = ClassRegistry::new();
    registry.register(TypeDecl::interface("Shape"));
    for class in ["Box", "Pair", "Dot"] {
        registry.register(TypeDecl::class(class).implements("Shape"));
    }
    registry.add_constructor(Constructor::new(
        "Box",
        vec![ParamSpec::new("inner", ParamType::object("Shape"))],
        unit,
    ));
    registry.add_constructor(Constructor::new(
        "Pair",
        vec![
            ParamSpec::new("left", ParamType::object("Shape")),
            ParamSpec::new("right", ParamType::object("Shape")),
        ],
        unit,
    ));
    registry.add_constructor(Constructor::new("Dot", vec![], unit));
    Arc::new(registry)
}

/// Add `Box(inner = Dot)` under `slot`; returns the Box and its inner slot
fn add_boxed_dot(tree: &mut ConfigurationTree, slot: NodeId) -> (NodeId, NodeId) {
    let boxed = ConstructorSignature::new("Box", vec![ParamType::object("Shape")]);
    let outer = tree.add_constructor(slot, &boxed, false).unwrap();
    let inner = tree.children(outer)[0];
    tree.add_constructor(inner, &ConstructorSignature::new("Dot", vec![]), false)
        .unwrap();
    (outer, inner)
}

#[test]
fn test_pointer_to_ancestor_rejected() {
    let mut tree = ConfigurationTree::new("Shape", shape_catalog());
    let root = tree.root();
    let (outer, inner) = add_boxed_dot(&mut tree, root);
    let len = tree.len();
    let alternatives = tree.children(inner).to_vec();

    let err = tree.add_pointer(inner, outer).unwrap_err();
    assert_eq!(
        err,
        TreeError::Alias(AliasError::WouldCreateCycle {
            slot: inner,
            target: outer
        })
    );
    assert_eq!(tree.len(), len);
    assert_eq!(tree.children(inner), alternatives.as_slice());
    assert!(tree.node(outer).and_then(|n| n.as_constructor()).unwrap().aliases.is_empty());
    assert_eq!(tree.total_combinations(), 1);
}

#[test]
fn test_pointer_cycle_across_siblings_rejected() {
    let mut tree = ConfigurationTree::new("Shape", shape_catalog());
    let root = tree.root();
    let pair_sig = ConstructorSignature::new(
        "Pair",
        vec![ParamType::object("Shape"), ParamType::object("Shape")],
    );
    let pair = tree.add_constructor(root, &pair_sig, false).unwrap();
    let slots = tree.children(pair).to_vec();
    let (left_box, left_inner) = add_boxed_dot(&mut tree, slots[0]);
    let (right_box, right_inner) = add_boxed_dot(&mut tree, slots[1]);

    // left -> right is fine on its own
    let first = tree.add_pointer(left_inner, right_box).unwrap();
    let len = tree.len();

    let err = tree.add_pointer(right_inner, left_box).unwrap_err();
    assert!(matches!(err, TreeError::Alias(AliasError::WouldCreateCycle { .. })));
    assert_eq!(tree.len(), len);
    assert_eq!(tree.children(right_inner).len(), 1);
    assert!(tree.node(left_box).and_then(|n| n.as_constructor()).unwrap().aliases.is_empty());
    let aliases = &tree.node(right_box).and_then(|n| n.as_constructor()).unwrap().aliases;
    assert_eq!(aliases, &vec![first]);
    assert!(tree.is_ready());
    assert_eq!(tree.enumerate().unwrap().count(), 2);
}

#[test]
fn test_cannot_remove_root() {
    let (mut tree, _) = foo_tree("1", "1");
    let root = tree.root();
    assert_eq!(tree.remove(root), Err(TreeError::RemoveRoot));
}

#[test]
fn test_save_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wrapper.json");
    let (tree, _) = wrapper_tree(false);
    tree.save(&path).unwrap();

    let (loaded, report) = ConfigurationTree::load(&path, wrapper_catalog()).unwrap();
    assert!(report.is_clean());
    assert!(loaded.is_ready());
    assert_eq!(loaded.total_combinations(), 2);

    let pointer = loaded
        .node_ids()
        .find(|id| matches!(loaded.node(*id).map(|n| n.kind()), Some(NodeKind::Pointer(_))))
        .unwrap();
    let target = loaded.node(pointer).and_then(|n| n.as_pointer()).unwrap().target;
    let aliases = &loaded.node(target).and_then(|n| n.as_constructor()).unwrap().aliases;
    assert_eq!(aliases, &vec![pointer]);

    for produced in loaded.enumerate().unwrap() {
        let produced = produced.unwrap();
        let wrapper = produced.value().and_then(|v| v.downcast_ref::<Wrapper>()).unwrap();
        let last = wrapper.arr.last().and_then(Value::as_instance).unwrap();
        assert!(wrapper.e.as_instance().unwrap().same_instance(last));
    }
}

#[test]
fn test_load_prunes_missing_constructor() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wrapper.json");
    let (tree, _) = wrapper_tree(false);
    tree.save(&path).unwrap();

    // same catalog without X
    let mut registry = ClassRegistry::new();
    registry.register(TypeDecl::interface("Elem"));
    registry.add_constructor(Constructor::new(
        "Wrapper",
        vec![
            ParamSpec::new("k", ParamType::int()),
            ParamSpec::new("arr", ParamType::array_of(ParamType::object("Elem"))),
            ParamSpec::new("e", ParamType::object("Elem")),
        ],
        |_: &[Value]| Ok(Value::Object(Instance::new("Wrapper", ()))),
    ));

    let (loaded, report) = ConfigurationTree::load(&path, Arc::new(registry)).unwrap();
    assert_eq!(report.pruned, vec![x_signature()]);
    assert_eq!(report.dropped_pointers, 1);
    assert!(!loaded.is_ready());
    assert!(loaded.node_ids().all(|id| loaded.node(id).and_then(|n| n.as_pointer()).is_none()));

    // the surviving wrapper keeps its index-free, unconfigured state
    let wrapper = loaded.children(loaded.root())[0];
    assert!(!loaded.is_configured(wrapper));
    assert!(loaded.configured_constructors().is_empty());
}

#[test]
fn test_load_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result = ConfigurationTree::load(dir.path().join("absent.json"), wrapper_catalog());
    assert!(matches!(result, Err(sweep_tree::PersistError::Io(_))));
}

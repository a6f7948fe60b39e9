//! Testing utilities for the sweep workspace
//!
//! Shared catalogs, tree builders and listeners.

#![allow(missing_docs)]

use parking_lot::Mutex;
use std::sync::Arc;
use sweep_core::{
    ClassRegistry, ConstructError, Constructor, ConstructorSignature, Instance, ParamSpec, ParamType, TypeDecl,
    Value,
};
use sweep_tree::{ConfigurationTree, NodeId, ObjectEnumerator, Produced, TreeListener};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Foo {
    pub a: i64,
    pub b: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level(pub i64);

#[derive(Debug, Clone)]
pub struct Wrapper {
    pub k: i64,
    pub arr: Vec<Value>,
    pub e: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X(pub i64);

fn int_arg(args: &[Value], index: usize, ty: &str) -> Result<i64, ConstructError> {
    args.get(index)
        .and_then(Value::as_int)
        .ok_or_else(|| ConstructError::failed(ty, format!("argument {index} is not an int")))
}

pub fn foo_signature() -> ConstructorSignature {
    ConstructorSignature::new("Foo", vec![ParamType::int(), ParamType::int()])
}

/// `Foo(int a, int b)`
pub fn foo_catalog() -> Arc<ClassRegistry> {
    let mut registry = ClassRegistry::new();
    registry.add_constructor(Constructor::new(
        "Foo",
        vec![
            ParamSpec::new("a", ParamType::int()),
            ParamSpec::new("b", ParamType::int()),
        ],
        |args: &[Value]| {
            let foo = Foo {
                a: int_arg(args, 0, "Foo")?,
                b: int_arg(args, 1, "Foo")?,
            };
            Ok(Value::Object(Instance::new("Foo", foo)))
        },
    ));
    Arc::new(registry)
}

/// Root `Foo` with `a` and `b` filled from literal text
pub fn foo_tree(a: &str, b: &str) -> (ConfigurationTree, NodeId) {
    let mut tree = ConfigurationTree::new("Foo", foo_catalog());
    let foo = tree.add_constructor(tree.root(), &foo_signature(), false).unwrap();
    let params = tree.children(foo).to_vec();
    tree.add_literal(params[0], a).unwrap();
    tree.add_literal(params[1], b).unwrap();
    (tree, foo)
}

pub fn gated_signature() -> ConstructorSignature {
    ConstructorSignature::new("Gated", vec![ParamType::object("Level"), ParamType::int()])
}

pub fn level_signature() -> ConstructorSignature {
    ConstructorSignature::new("Level", vec![ParamType::int()])
}

/// `Gated(Level a, int b)` where `Level(2)` is not a meaningful experiment
pub fn gated_catalog() -> Arc<ClassRegistry> {
    let mut registry = ClassRegistry::new();
    registry.add_constructor(Constructor::new(
        "Level",
        vec![ParamSpec::new("v", ParamType::int())],
        |args: &[Value]| match int_arg(args, 0, "Level")? {
            2 => Err(ConstructError::skip("level 2 is not tested")),
            v => Ok(Value::Object(Instance::new("Level", Level(v)))),
        },
    ));
    registry.add_constructor(Constructor::new(
        "Gated",
        vec![
            ParamSpec::new("a", ParamType::object("Level")),
            ParamSpec::new("b", ParamType::int()),
        ],
        |args: &[Value]| {
            let level = args
                .first()
                .and_then(|v| v.downcast_ref::<Level>())
                .map(|l| l.0)
                .ok_or_else(|| ConstructError::failed("Gated", "missing level"))?;
            let foo = Foo {
                a: level,
                b: int_arg(args, 1, "Gated")?,
            };
            Ok(Value::Object(Instance::new("Gated", foo)))
        },
    ));
    Arc::new(registry)
}

/// `Gated(Level(a), b)` over `a ∈ {1,2}`, `b ∈ {10,20,30}`
pub fn gated_tree() -> ConfigurationTree {
    let mut tree = ConfigurationTree::new("Gated", gated_catalog());
    let gated = tree.add_constructor(tree.root(), &gated_signature(), false).unwrap();
    let params = tree.children(gated).to_vec();
    let level = tree.add_constructor(params[0], &level_signature(), false).unwrap();
    let v = tree.children(level)[0];
    tree.add_literal(v, "1,2").unwrap();
    tree.add_literal(params[1], "10,20,30").unwrap();
    tree
}

pub fn wrapper_signature() -> ConstructorSignature {
    ConstructorSignature::new(
        "Wrapper",
        vec![
            ParamType::int(),
            ParamType::array_of(ParamType::object("Elem")),
            ParamType::object("Elem"),
        ],
    )
}

pub fn x_signature() -> ConstructorSignature {
    ConstructorSignature::new("X", vec![ParamType::int()])
}

/// `Wrapper(int k, Elem[] arr, Elem e)` with `X(int v)` the only `Elem`
pub fn wrapper_catalog() -> Arc<ClassRegistry> {
    let mut registry = ClassRegistry::new();
    registry.register(TypeDecl::interface("Elem"));
    registry.register(TypeDecl::class("X").implements("Elem"));
    registry.add_constructor(Constructor::new(
        "X",
        vec![ParamSpec::new("v", ParamType::int())],
        |args: &[Value]| Ok(Value::Object(Instance::new("X", X(int_arg(args, 0, "X")?)))),
    ));
    registry.add_constructor(Constructor::new(
        "Wrapper",
        vec![
            ParamSpec::new("k", ParamType::int()),
            ParamSpec::new("arr", ParamType::array_of(ParamType::object("Elem"))),
            ParamSpec::new("e", ParamType::object("Elem")),
        ],
        |args: &[Value]| {
            let wrapper = Wrapper {
                k: int_arg(args, 0, "Wrapper")?,
                arr: args.get(1).and_then(Value::as_array).map(|items| items.to_vec()).unwrap_or_default(),
                e: args.get(2).cloned().unwrap_or(Value::Null),
            };
            Ok(Value::Object(Instance::new("Wrapper", wrapper)))
        },
    ));
    Arc::new(registry)
}

/// Handles into a wrapper tree
#[derive(Debug, Clone, Copy)]
pub struct WrapperNodes {
    pub wrapper: NodeId,
    pub x: NodeId,
    pub pointer: NodeId,
}

/// `Wrapper(k ∈ {1,2}, arr = [X(v ∈ {1,2,3})], e = pointer to that X)`
pub fn wrapper_tree(cartesian: bool) -> (ConfigurationTree, WrapperNodes) {
    let mut tree = ConfigurationTree::new("Wrapper", wrapper_catalog());
    let wrapper = tree.add_constructor(tree.root(), &wrapper_signature(), false).unwrap();
    let params = tree.children(wrapper).to_vec();
    tree.add_literal(params[0], "1,2").unwrap();
    let arr = tree.add_array(params[1]).unwrap();
    let element = tree.add_array_element(arr).unwrap();
    let x = tree.add_constructor(element, &x_signature(), false).unwrap();
    let v = tree.children(x)[0];
    tree.add_literal(v, "1:3").unwrap();
    let pointer = tree.add_pointer(params[2], x).unwrap();
    tree.set_cartesian(pointer, cartesian).unwrap();
    (tree, WrapperNodes { wrapper, x, pointer })
}

/// `Brittle(int a)` failing for `a == 2`
pub fn brittle_catalog() -> Arc<ClassRegistry> {
    let mut registry = ClassRegistry::new();
    registry.add_constructor(Constructor::new(
        "Brittle",
        vec![ParamSpec::new("a", ParamType::int())],
        |args: &[Value]| match int_arg(args, 0, "Brittle")? {
            2 => Err(ConstructError::failed("Brittle", "cannot allocate")),
            a => Ok(Value::Object(Instance::new("Brittle", a))),
        },
    ));
    Arc::new(registry)
}

pub fn brittle_tree(a: &str) -> ConfigurationTree {
    let mut tree = ConfigurationTree::new("Brittle", brittle_catalog());
    let sig = ConstructorSignature::new("Brittle", vec![ParamType::int()]);
    let ctor = tree.add_constructor(tree.root(), &sig, false).unwrap();
    let param = tree.children(ctor)[0];
    tree.add_literal(param, a).unwrap();
    tree
}

/// Recipe strings of a full pass; skips render as `skip`
pub fn recipe_strings(enumerator: &mut ObjectEnumerator) -> Vec<String> {
    enumerator
        .by_ref()
        .map(|produced| match produced.unwrap() {
            Produced::Object { recipe: Some(recipe), .. } => recipe.to_string(),
            Produced::Object { value, .. } => value.to_string(),
            Produced::Skipped(_) => "skip".to_string(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyEvent {
    Ready,
    NotReady,
}

/// Listener recording every readiness event
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<ReadyEvent>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<ReadyEvent> {
        self.events.lock().clone()
    }
}

impl TreeListener for RecordingListener {
    fn tree_ready(&self) {
        self.events.lock().push(ReadyEvent::Ready);
    }

    fn tree_not_ready(&self) {
        self.events.lock().push(ReadyEvent::NotReady);
    }
}

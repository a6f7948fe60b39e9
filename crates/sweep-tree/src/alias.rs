//! Alias-preserving copies
//!
//! # Core Concepts
//!
//! - [`IdentityMap`]: source node to copied node, scoped to one copy operation
//! - Snapshots: whole-tree copies used for enumeration; a pointer whose target
//!   is missing from the source is an [`AliasError`]
//! - Subtree copies: pointers into the copied region follow the copies,
//!   pointers leaving it keep their original target
//! - Cartesian expansion: each cartesian pointer in a snapshot becomes a
//!   private constructor over a copy of its target's parameters
//!
//! Pointers are patched after every node of the region has been copied, so
//! traversal order never matters and several pointers converging on one
//! target converge on one copy.

use crate::error::AliasError;
use crate::node::{ChoiceNode, ConstructorChoice, NodeId, NodeKind};
use crate::readiness::{ReadinessTracker, ReadyState};
use crate::tree::ConfigurationTree;
use std::collections::HashMap;

/// Source node to copied node, for one copy operation
#[derive(Debug, Default, Clone)]
pub struct IdentityMap {
    map: HashMap<NodeId, NodeId>,
}

impl IdentityMap {
    /// Create new empty map
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Record a copy
    #[inline]
    pub fn insert(&mut self, source: NodeId, copy: NodeId) {
        self.map.insert(source, copy);
    }

    /// Look up the copy of `source`
    #[inline]
    #[must_use]
    pub fn get(&self, source: NodeId) -> Option<NodeId> {
        self.map.get(&source).copied()
    }

    /// Number of copied nodes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if nothing was copied
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// What to do with pointers whose target lies outside the copied region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutsideTargets {
    /// The region is a whole tree: such a target is dangling
    Reject,
    /// The copy lives in the same tree: keep the original target
    Keep,
}

/// Copy pre-ordered `(source id, node)` pairs into `dst`
///
/// Nodes whose parent was not copied are attached under `attach`.
fn copy_nodes(
    source: &[(NodeId, ChoiceNode)],
    dst: &mut ConfigurationTree,
    attach: Option<NodeId>,
    map: &mut IdentityMap,
    outside: OutsideTargets,
) -> Result<Vec<NodeId>, AliasError> {
    let mut tops = Vec::new();
    let mut pointers = Vec::new();

    for (old, node) in source {
        let copied_parent = node.parent.and_then(|p| map.get(p));
        let parent = copied_parent.or(attach);
        let mut kind = node.kind.clone();
        if let NodeKind::ConstructorChoice(c) = &mut kind {
            c.aliases.clear();
            if outside == OutsideTargets::Keep {
                c.created_value = None;
            }
        }
        let is_pointer = matches!(kind, NodeKind::Pointer(_));
        let new = dst.insert(parent, kind);
        if let Some(copied) = dst.nodes.get_mut(new.index()).and_then(Option::as_mut) {
            copied.configured = node.configured;
        }
        if copied_parent.is_none() {
            tops.push(new);
        }
        map.insert(*old, new);
        if is_pointer {
            pointers.push((*old, new));
        }
    }

    for (old_pointer, new_pointer) in pointers {
        let Some(NodeKind::Pointer(pointer)) = dst.node(new_pointer).map(|n| n.kind.clone()) else {
            continue;
        };
        let target = match (map.get(pointer.target), outside) {
            (Some(copied), _) => copied,
            (None, OutsideTargets::Keep) if dst.node(pointer.target).is_some() => pointer.target,
            _ => {
                return Err(AliasError::DanglingTarget {
                    pointer: old_pointer,
                    target: pointer.target,
                })
            }
        };
        match dst.nodes.get_mut(target.index()).and_then(Option::as_mut).map(|n| &mut n.kind) {
            Some(NodeKind::ConstructorChoice(c)) => c.aliases.push(new_pointer),
            _ => return Err(AliasError::NotAConstructor(target)),
        }
        if let Some(NodeKind::Pointer(p)) = dst.nodes.get_mut(new_pointer.index()).and_then(Option::as_mut).map(|n| &mut n.kind) {
            p.target = target;
        }
    }
    Ok(tops)
}

fn collect(tree: &ConfigurationTree, roots: &[NodeId]) -> Vec<(NodeId, ChoiceNode)> {
    roots
        .iter()
        .flat_map(|root| tree.subtree(*root))
        .filter_map(|id| tree.node(id).map(|n| (id, n.clone())))
        .collect()
}

/// Copy the subtrees at `roots` under `parent` in the same tree
pub(crate) fn copy_within(
    tree: &mut ConfigurationTree,
    roots: &[NodeId],
    parent: NodeId,
) -> Result<Vec<NodeId>, AliasError> {
    let source = collect(tree, roots);
    let mut map = IdentityMap::new();
    let copies = copy_nodes(&source, tree, Some(parent), &mut map, OutsideTargets::Keep)?;
    tracing::debug!("copied {} nodes under {}", map.len(), parent);
    Ok(copies)
}

impl ConfigurationTree {
    /// Independent deep copy preserving pointer topology
    ///
    /// The copy shares the catalog but no listeners and no node storage;
    /// editing either tree afterwards never affects the other.
    ///
    /// # Errors
    /// Returns [`AliasError::DanglingTarget`] if a pointer refers to a node
    /// that is no longer part of the tree.
    pub fn snapshot(&self) -> Result<ConfigurationTree, AliasError> {
        let source = collect(self, &[self.root]);
        let mut copy = ConfigurationTree::detached(
            self.root_type.clone(),
            self.catalog.clone(),
            self.options.clone(),
        );
        let mut map = IdentityMap::new();
        let tops = copy_nodes(&source, &mut copy, None, &mut map, OutsideTargets::Reject)?;
        copy.root = tops.first().copied().unwrap_or(NodeId(0));
        copy.next_created_value = self.next_created_value;
        copy.readiness = ReadinessTracker::default();
        copy.readiness
            .prime(ReadyState::from_configured(copy.is_configured(copy.root)));
        Ok(copy)
    }
}

/// Replace every cartesian pointer with a private constructor over a copy of
/// its target's parameter subtree; returns the number of expanded pointers
///
/// Copies may themselves contain cartesian pointers; those are expanded in
/// turn. Acyclicity guarantees termination.
pub(crate) fn expand_cartesian(tree: &mut ConfigurationTree) -> Result<usize, AliasError> {
    let mut expanded = 0;
    loop {
        let next = tree.node_ids().find(|id| {
            tree.node(*id)
                .and_then(ChoiceNode::as_pointer)
                .is_some_and(|p| p.cartesian)
        });
        let Some(pointer) = next else {
            break;
        };
        let target = tree
            .node(pointer)
            .and_then(ChoiceNode::as_pointer)
            .map(|p| p.target)
            .ok_or(AliasError::NotAConstructor(pointer))?;
        let (constructor, params) = match tree.node(target) {
            Some(node) => match node.as_constructor() {
                Some(c) => (c.constructor.clone(), node.children.clone()),
                None => return Err(AliasError::NotAConstructor(target)),
            },
            None => return Err(AliasError::DanglingTarget { pointer, target }),
        };

        tree.unlink_alias(target, pointer);
        if let Some(node) = tree.nodes.get_mut(pointer.index()).and_then(Option::as_mut) {
            node.kind = NodeKind::ConstructorChoice(ConstructorChoice::new(constructor));
            node.configured = true;
        }
        copy_within(tree, &params, pointer)?;
        expanded += 1;
    }
    if expanded > 0 {
        tracing::debug!("expanded {} cartesian pointers", expanded);
    }
    Ok(expanded)
}

impl ConfigurationTree {
    fn unlink_alias(&mut self, target: NodeId, pointer: NodeId) {
        if let Some(NodeKind::ConstructorChoice(c)) =
            self.nodes.get_mut(target.index()).and_then(Option::as_mut).map(|n| &mut n.kind)
        {
            c.aliases.retain(|p| *p != pointer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use sweep_core::{
        ClassRegistry, Constructor, ConstructorSignature, Instance, Literal, ParamSpec, ParamType,
        TypeDecl, Value,
    };

    fn catalog() -> Arc<ClassRegistry> {
        let mut registry = ClassRegistry::new();
        registry.register(TypeDecl::interface("Item"));
        registry.register(TypeDecl::class("Leaf").implements("Item"));
        registry.add_constructor(Constructor::new(
            "Leaf",
            vec![ParamSpec::new("v", ParamType::int())],
            |_| Ok(Value::Object(Instance::new("Leaf", ()))),
        ));
        registry.add_constructor(Constructor::new(
            "Pair",
            vec![
                ParamSpec::new("left", ParamType::object("Item")),
                ParamSpec::new("right", ParamType::object("Item")),
            ],
            |_| Ok(Value::Object(Instance::new("Pair", ()))),
        ));
        Arc::new(registry)
    }

    fn leaf_sig() -> ConstructorSignature {
        ConstructorSignature::new("Leaf", vec![ParamType::int()])
    }

    fn pair_sig() -> ConstructorSignature {
        ConstructorSignature::new("Pair", vec![ParamType::object("Item"), ParamType::object("Item")])
    }

    /// Pair(left = Leaf(v in 1..3), right = -> left's Leaf)
    fn aliased_pair() -> (ConfigurationTree, NodeId, NodeId) {
        let mut tree = ConfigurationTree::new("Pair", catalog());
        let pair = tree.add_constructor(tree.root(), &pair_sig(), false).unwrap();
        let left = tree.children(pair)[0];
        let right = tree.children(pair)[1];
        let leaf = tree.add_constructor(left, &leaf_sig(), false).unwrap();
        tree.add_literal(tree.children(leaf)[0], "1:3").unwrap();
        let pointer = tree.add_pointer(right, leaf).unwrap();
        (tree, leaf, pointer)
    }

    #[test]
    fn snapshot_preserves_aliasing() {
        let (tree, _, _) = aliased_pair();
        let copy = tree.snapshot().unwrap();
        assert_eq!(copy.len(), tree.len());
        assert!(copy.is_ready());

        let pointer = copy
            .node_ids()
            .find(|id| copy.node(*id).and_then(ChoiceNode::as_pointer).is_some())
            .unwrap();
        let target = copy.node(pointer).and_then(ChoiceNode::as_pointer).unwrap().target;
        let ctor = copy.node(target).and_then(ChoiceNode::as_constructor).unwrap();
        assert_eq!(ctor.aliases, vec![pointer]);
        assert_eq!(ctor.signature(), &leaf_sig());
    }

    #[test]
    fn snapshot_is_independent() {
        let (mut tree, leaf, _) = aliased_pair();
        let copy = tree.snapshot().unwrap();
        tree.remove(leaf).unwrap();
        assert!(!tree.is_ready());
        assert!(copy.is_ready());
        assert_eq!(copy.total_combinations(), 3);
    }

    #[test]
    fn copy_redirects_inner_pointers() {
        let (mut tree, leaf, _) = aliased_pair();
        let pair = tree.children(tree.root())[0];
        let copy = tree.copy_constructor(pair).unwrap();
        let copied_right = tree.children(copy)[1];
        let copied_pointer = tree.children(copied_right)[0];
        let target = tree.node(copied_pointer).and_then(ChoiceNode::as_pointer).unwrap().target;
        assert_ne!(target, leaf);
        assert_eq!(tree.node(target).unwrap().parent(), Some(tree.children(copy)[0]));
    }

    #[test]
    fn copy_keeps_outside_targets() {
        let (mut tree, leaf, pointer) = aliased_pair();
        // a second Pair alternative whose right side points back at the first Leaf
        let pair = tree.add_constructor(tree.root(), &pair_sig(), false).unwrap();
        let left = tree.children(pair)[0];
        tree.add_value(left, Literal::Null).unwrap();
        let outer = tree.add_pointer(tree.children(pair)[1], leaf).unwrap();

        let copy = tree.copy_constructor(pair).unwrap();
        let copied_pointer = tree.children(tree.children(copy)[1])[0];
        assert_ne!(copied_pointer, outer);
        let target = tree.node(copied_pointer).and_then(ChoiceNode::as_pointer).unwrap().target;
        assert_eq!(target, leaf);
        let aliases = &tree.node(leaf).and_then(ChoiceNode::as_constructor).unwrap().aliases;
        assert_eq!(aliases, &vec![pointer, outer, copied_pointer]);
    }

    #[test]
    fn cartesian_expansion_copies_parameters() {
        let (mut tree, _, pointer) = aliased_pair();
        tree.set_cartesian(pointer, true).unwrap();
        assert_eq!(tree.total_combinations(), 9);

        let mut copy = tree.snapshot().unwrap();
        assert_eq!(expand_cartesian(&mut copy).unwrap(), 1);
        assert!(copy
            .node_ids()
            .all(|id| copy.node(id).and_then(ChoiceNode::as_pointer).is_none()));
        assert_eq!(copy.total_combinations(), 9);
    }

    #[test]
    fn identity_map_basics() {
        let mut map = IdentityMap::new();
        assert!(map.is_empty());
        map.insert(NodeId(1), NodeId(7));
        assert_eq!(map.get(NodeId(1)), Some(NodeId(7)));
        assert_eq!(map.get(NodeId(2)), None);
        assert_eq!(map.len(), 1);
    }
}

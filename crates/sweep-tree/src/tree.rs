//! Configuration tree
//!
//! # Core Concepts
//!
//! - [`ConfigurationTree`]: arena of [`ChoiceNode`]s rooted at a slot for the root type
//! - Completeness: recomputed bottom-up after every structural edit
//! - Registry: configured constructors carry a monotonically increasing display index
//! - Readiness: root completeness, broadcast to [`TreeListener`]s on transitions
//!
//! # Example
//!
//! ```rust,ignore
//! use sweep_tree::ConfigurationTree;
//!
//! let mut tree = ConfigurationTree::new("demo.Network", catalog);
//! let ring = tree.add_constructor(tree.root(), &ring_signature, false)?;
//! let size = tree.children(ring)[0];
//! tree.add_literal(size, "4:64log5")?;
//! assert!(tree.is_ready());
//! ```

use crate::error::TreeError;
use crate::node::{ArrayLayout, ChoiceNode, ClassChoice, ConstructorChoice, NodeId, NodeKind};
use crate::readiness::{ReadinessTracker, ReadyState, TreeListener};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt::Write as _;
use std::sync::Arc;
use sweep_core::{ConstructorSignature, ParamType, TypeCatalog, TypeName};

/// Tree construction options
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TreeOptions {
    /// Fill the root slot from parameter defaults when it has a single candidate
    #[serde(default)]
    pub apply_defaults_at_root: bool,
}

impl TreeOptions {
    /// Create default options
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable defaults at the root
    #[inline]
    #[must_use]
    pub fn with_defaults_at_root(mut self, enabled: bool) -> Self {
        self.apply_defaults_at_root = enabled;
        self
    }
}

/// Configured constructor with its display index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredConstructor {
    /// Constructor node
    pub node: NodeId,
    /// Display index
    pub index: u32,
    /// Bound signature
    pub signature: ConstructorSignature,
}

/// Tree of choices describing a parameter sweep
pub struct ConfigurationTree {
    pub(crate) nodes: Vec<Option<ChoiceNode>>,
    pub(crate) root: NodeId,
    pub(crate) root_type: TypeName,
    pub(crate) catalog: Arc<dyn TypeCatalog>,
    pub(crate) readiness: ReadinessTracker,
    pub(crate) next_created_value: u32,
    pub(crate) options: TreeOptions,
}

impl ConfigurationTree {
    /// Create tree for `root_type`
    ///
    /// The root slot holds an error marker when the catalog knows no
    /// implementation of the type.
    #[must_use]
    pub fn new(root_type: impl Into<TypeName>, catalog: Arc<dyn TypeCatalog>) -> Self {
        Self::with_options(root_type, catalog, TreeOptions::default())
    }

    /// Create tree with explicit options
    #[must_use]
    pub fn with_options(
        root_type: impl Into<TypeName>,
        catalog: Arc<dyn TypeCatalog>,
        options: TreeOptions,
    ) -> Self {
        let root_type = root_type.into();
        let mut tree = Self::detached(root_type.clone(), catalog, options);
        tree.root = tree.insert(
            None,
            NodeKind::ClassChoice(ClassChoice {
                declared: ParamType::Object(root_type),
                param: None,
            }),
        );
        tree.init_slot(tree.root);
        if tree.options.apply_defaults_at_root {
            let mut path = Vec::new();
            tree.apply_defaults(tree.root, &mut path);
        }
        tree.recompute_configured();
        tree
    }

    /// Tree without nodes; callers must insert a root
    pub(crate) fn detached(
        root_type: TypeName,
        catalog: Arc<dyn TypeCatalog>,
        options: TreeOptions,
    ) -> Self {
        Self {
            nodes: Vec::new(),
            root: NodeId(0),
            root_type,
            catalog,
            readiness: ReadinessTracker::default(),
            next_created_value: 0,
            options,
        }
    }

    /// Get root slot
    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get root type
    #[inline]
    #[must_use]
    pub fn root_type(&self) -> &TypeName {
        &self.root_type
    }

    /// Get catalog
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &Arc<dyn TypeCatalog> {
        &self.catalog
    }

    /// Get options
    #[inline]
    #[must_use]
    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    /// Get node
    #[inline]
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&ChoiceNode> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    /// Get children of a node, empty for unknown nodes
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[][..], ChoiceNode::children)
    }

    /// Number of live nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Check if the tree has no nodes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live node handles in arena order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_some())
            .filter_map(|(i, _)| u32::try_from(i).ok().map(NodeId))
    }

    /// Check if a node is configured
    #[inline]
    #[must_use]
    pub fn is_configured(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(ChoiceNode::is_configured)
    }

    /// Check if the root is configured
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.readiness.state().is_ready()
    }

    /// Current readiness state
    #[inline]
    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        self.readiness.state()
    }

    /// Subscribe to readiness transitions
    ///
    /// Registration itself does not notify.
    pub fn add_listener(&mut self, listener: Arc<dyn TreeListener>) {
        self.readiness.subscribe(listener);
    }

    /// Number of subscribed listeners
    #[inline]
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.readiness.listener_count()
    }

    pub(crate) fn get(&self, id: NodeId) -> Result<&ChoiceNode, TreeError> {
        self.node(id).ok_or(TreeError::UnknownNode(id))
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Result<&mut ChoiceNode, TreeError> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(TreeError::UnknownNode(id))
    }

    /// Append a node under `parent`
    pub(crate) fn insert(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(Some(ChoiceNode::new(parent, kind)));
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(p.index())).and_then(Option::as_mut) {
            parent.children.push(id);
        }
        id
    }

    /// Slot payload of `slot`
    pub(crate) fn slot(&self, slot: NodeId) -> Result<&ClassChoice, TreeError> {
        let node = self.get(slot)?;
        node.as_class_choice().ok_or(TreeError::WrongKind {
            node: slot,
            expected: "ClassChoice",
            found: node.kind.variant_name(),
        })
    }

    /// Add an error marker to a fresh slot whose type cannot be satisfied
    pub(crate) fn init_slot(&mut self, slot: NodeId) {
        let Ok(choice) = self.slot(slot) else {
            return;
        };
        let message = match &choice.declared {
            ParamType::Object(ty) => self
                .implementations(slot)
                .is_ok_and(|found| found.is_empty())
                .then(|| format!("no implementation of {ty}")),
            ParamType::Enum(ty) => self
                .catalog
                .enum_constants(ty)
                .is_none()
                .then(|| format!("unknown enumeration {ty}")),
            _ => None,
        };
        if let Some(message) = message {
            tracing::debug!("slot {} cannot be satisfied: {}", slot, message);
            self.insert(Some(slot), NodeKind::ErrorNode(message));
        }
    }

    /// Concrete types offered for an object slot
    ///
    /// # Errors
    /// Returns [`TreeError`] if `slot` is not an object slot.
    pub fn implementations(&self, slot: NodeId) -> Result<BTreeSet<TypeName>, TreeError> {
        let choice = self.slot(slot)?;
        let ParamType::Object(base) = &choice.declared else {
            return Err(TreeError::Incompatible {
                slot,
                declared: choice.declared.clone(),
                what: "an object".to_string(),
            });
        };
        let mut found = self.catalog.discover_implementations(base);
        if let Some(required) = choice.param.as_ref().and_then(|p| p.require_interface.as_ref()) {
            found.retain(|ty| self.catalog.is_assignable(ty, required));
        }
        Ok(found)
    }

    /// Pre-order traversal of the subtree rooted at `id`
    pub(crate) fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.node(current) {
                out.push(current);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Check if `goal` is reachable from `from` through children and pointer edges
    pub(crate) fn reaches(&self, from: NodeId, goal: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![from];
        while let Some(current) = stack.pop() {
            if current == goal {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(node) = self.node(current) {
                stack.extend(node.children.iter().copied());
                if let Some(pointer) = node.as_pointer() {
                    stack.push(pointer.target);
                }
            }
        }
        false
    }

    /// Recompute completeness bottom-up and notify on readiness transitions
    ///
    /// Constructors that become configured receive the next display index;
    /// constructors that stop being configured release theirs and lose every
    /// pointer aliasing them. Detaching pointers can de-configure further
    /// ancestors, so this runs to a fixpoint.
    pub(crate) fn recompute_configured(&mut self) {
        loop {
            let mut gained = Vec::new();
            let mut lost = Vec::new();
            self.refresh(self.root, &mut gained, &mut lost);

            for id in gained {
                let index = self.next_created_value;
                self.next_created_value += 1;
                if let Some(NodeKind::ConstructorChoice(c)) = self.nodes[id.index()].as_mut().map(|n| &mut n.kind) {
                    c.created_value = Some(index);
                    tracing::debug!("registered constructor {} as {}", c.signature(), index);
                }
            }

            let mut detached = false;
            for id in lost {
                let aliases = match self.nodes[id.index()].as_mut().map(|n| &mut n.kind) {
                    Some(NodeKind::ConstructorChoice(c)) => {
                        tracing::debug!(
                            "released constructor {} ({:?})",
                            c.signature(),
                            c.created_value
                        );
                        c.created_value = None;
                        std::mem::take(&mut c.aliases)
                    }
                    _ => Vec::new(),
                };
                for pointer in aliases {
                    tracing::debug!("detaching pointer {} from unconfigured {}", pointer, id);
                    self.unlink(pointer);
                    self.nodes[pointer.index()] = None;
                    detached = true;
                }
            }

            if !detached {
                break;
            }
        }
        let state = ReadyState::from_configured(self.is_configured(self.root));
        self.readiness.transition(state);
    }

    fn refresh(&mut self, id: NodeId, gained: &mut Vec<NodeId>, lost: &mut Vec<NodeId>) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        let children = node.children.clone();
        let mut all_children = true;
        for child in &children {
            all_children &= self.refresh(*child, gained, lost);
        }
        let Some(node) = self.node(id) else {
            return false;
        };
        let configured = match &node.kind {
            NodeKind::ClassChoice(_) => !children.is_empty() && all_children,
            NodeKind::ConstructorChoice(_) => all_children,
            NodeKind::ArrayChoice(array) => match array.layout {
                ArrayLayout::Typable { .. } => true,
                ArrayLayout::Object => all_children,
            },
            NodeKind::LeafValue(_) => true,
            NodeKind::Pointer(pointer) => self
                .node(pointer.target)
                .is_some_and(|t| t.as_constructor().is_some()),
            NodeKind::ErrorNode(_) => false,
        };
        let was = node.configured;
        let is_constructor = node.as_constructor().is_some();
        // copies arrive configured but without a display index
        let unindexed = node.as_constructor().is_some_and(|c| c.created_value.is_none());
        if let Some(node) = self.nodes[id.index()].as_mut() {
            node.configured = configured;
        }
        if is_constructor && (configured != was || (configured && unindexed)) {
            if configured {
                gained.push(id);
            } else {
                lost.push(id);
            }
        }
        configured
    }

    /// Detach a node from its parent and, for pointers, from its target
    pub(crate) fn unlink(&mut self, id: NodeId) {
        let Some(node) = self.node(id) else {
            return;
        };
        let parent = node.parent;
        let target = node.as_pointer().map(|p| p.target);
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(p.index())).and_then(Option::as_mut) {
            parent.children.retain(|c| *c != id);
        }
        if let Some(target) = target {
            if let Some(NodeKind::ConstructorChoice(c)) =
                self.nodes.get_mut(target.index()).and_then(Option::as_mut).map(|n| &mut n.kind)
            {
                c.aliases.retain(|p| *p != id);
            }
        }
    }

    /// Remove a subtree and every pointer aliasing a constructor inside it
    pub(crate) fn remove_subtree(&mut self, id: NodeId) {
        let doomed = self.subtree(id);
        let doomed_set: HashSet<NodeId> = doomed.iter().copied().collect();
        let mut outside_aliases = Vec::new();
        for node in doomed.iter().filter_map(|d| self.node(*d)) {
            if let Some(c) = node.as_constructor() {
                outside_aliases.extend(c.aliases.iter().filter(|p| !doomed_set.contains(p)));
            }
        }
        for pointer in outside_aliases {
            tracing::debug!("detaching pointer {} from removed subtree {}", pointer, id);
            self.unlink(pointer);
            self.nodes[pointer.index()] = None;
        }
        for node in &doomed {
            if self.node(*node).is_some_and(|n| n.as_pointer().is_some()) {
                self.unlink(*node);
            }
        }
        self.unlink(id);
        for node in doomed {
            self.nodes[node.index()] = None;
        }
    }

    /// Number of combinations the node yields per outer combination
    ///
    /// Slots sum their alternatives, constructors multiply their parameters,
    /// arrays and shared pointers count once, cartesian pointers count as
    /// their target. Only meaningful for configured nodes.
    #[must_use]
    pub fn combination_count(&self, id: NodeId) -> u64 {
        let Some(node) = self.node(id) else {
            return 0;
        };
        match &node.kind {
            NodeKind::ClassChoice(_) => node
                .children
                .iter()
                .fold(0u64, |acc, c| acc.saturating_add(self.combination_count(*c))),
            NodeKind::ConstructorChoice(_) => node
                .children
                .iter()
                .fold(1u64, |acc, c| acc.saturating_mul(self.combination_count(*c))),
            NodeKind::ArrayChoice(_) | NodeKind::LeafValue(_) => 1,
            NodeKind::Pointer(pointer) => {
                if pointer.cartesian {
                    self.combination_count(pointer.target)
                } else {
                    1
                }
            }
            NodeKind::ErrorNode(_) => 0,
        }
    }

    /// Number of values the node contributes inside one combination
    ///
    /// For object arrays this is the array length: the sum of the element
    /// slots' combination counts.
    #[must_use]
    pub fn instance_count(&self, id: NodeId) -> u64 {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::ArrayChoice(array)) => match &array.layout {
                ArrayLayout::Typable { values, .. } => values.len() as u64,
                ArrayLayout::Object => self
                    .children(id)
                    .iter()
                    .fold(0u64, |acc, c| acc.saturating_add(self.combination_count(*c))),
            },
            _ => self.combination_count(id),
        }
    }

    /// Combinations of the whole tree
    #[inline]
    #[must_use]
    pub fn total_combinations(&self) -> u64 {
        self.combination_count(self.root)
    }

    /// Configured constructors ordered by display index
    #[must_use]
    pub fn configured_constructors(&self) -> Vec<RegisteredConstructor> {
        let mut out: Vec<RegisteredConstructor> = self
            .node_ids()
            .filter_map(|id| {
                let c = self.node(id)?.as_constructor()?;
                Some(RegisteredConstructor {
                    node: id,
                    index: c.created_value?,
                    signature: c.signature().clone(),
                })
            })
            .collect();
        out.sort_by_key(|r| r.index);
        out
    }

    /// One-line label of a node
    #[must_use]
    pub fn describe(&self, id: NodeId) -> String {
        let Some(node) = self.node(id) else {
            return format!("<missing {id}>");
        };
        match &node.kind {
            NodeKind::ClassChoice(choice) => choice.label(),
            NodeKind::ConstructorChoice(ConstructorChoice {
                constructor,
                created_value,
                ..
            }) => match created_value {
                Some(index) => format!("{index} : {}", constructor.signature()),
                None => constructor.signature().to_string(),
            },
            NodeKind::ArrayChoice(array) => match &array.layout {
                ArrayLayout::Typable { text, values } => {
                    format!("{}[] {{{text}}} ({} values)", array.element, values.len())
                }
                ArrayLayout::Object => {
                    format!("{}[] ({} slots)", array.element, node.children.len())
                }
            },
            NodeKind::LeafValue(literal) => literal.to_string(),
            NodeKind::Pointer(pointer) => {
                let target = self.describe(pointer.target);
                if pointer.cartesian {
                    format!("-> {target} (cartesian)")
                } else {
                    format!("-> {target}")
                }
            }
            NodeKind::ErrorNode(message) => format!("error: {message}"),
        }
    }

    /// Indented rendering of the whole tree
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![(self.root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let mark = if self.is_configured(id) { ' ' } else { '!' };
            let _ = writeln!(out, "{}{mark}{}", "  ".repeat(depth), self.describe(id));
            for child in self.children(id).iter().rev() {
                stack.push((*child, depth + 1));
            }
        }
        out
    }
}

impl std::fmt::Debug for ConfigurationTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationTree")
            .field("root_type", &self.root_type)
            .field("nodes", &self.len())
            .field("readiness", &self.readiness)
            .finish_non_exhaustive()
    }
}

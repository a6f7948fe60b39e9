//! Choice nodes
//!
//! # Core Concepts
//!
//! - [`NodeId`]: handle of a node inside one tree's arena
//! - [`ChoiceNode`]: parent link, ordered children and the cached completeness flag
//! - [`NodeKind`]: closed set of node variants
//!
//! Nodes never hold references to each other, only [`NodeId`]s, so copying a
//! tree is index remapping.

use serde::{Deserialize, Serialize};
use std::fmt;
use sweep_core::{Constructor, ConstructorSignature, Literal, ParamSpec, ParamType};

/// Handle of a node in a [`ConfigurationTree`](crate::ConfigurationTree)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Index into the arena
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Parameter slot; its children are alternative values for the slot
#[derive(Debug, Clone, PartialEq)]
pub struct ClassChoice {
    /// Declared type of the slot
    pub declared: ParamType,
    /// Parameter annotations, `None` for the root slot and array elements
    pub param: Option<ParamSpec>,
}

impl ClassChoice {
    /// Label used by [`ConfigurationTree::describe`](crate::ConfigurationTree::describe)
    #[must_use]
    pub fn label(&self) -> String {
        match &self.param {
            Some(param) => format!("{} : {}", param.name, self.declared),
            None => self.declared.to_string(),
        }
    }
}

/// Bound constructor; its children are the formal parameter slots in order
#[derive(Debug, Clone)]
pub struct ConstructorChoice {
    /// Resolved constructor
    pub constructor: Constructor,
    /// Pointers aliasing this constructor (back-references)
    pub aliases: Vec<NodeId>,
    /// Display index, assigned while configured
    pub created_value: Option<u32>,
}

impl ConstructorChoice {
    /// Create unregistered choice
    #[inline]
    #[must_use]
    pub fn new(constructor: Constructor) -> Self {
        Self {
            constructor,
            aliases: Vec::new(),
            created_value: None,
        }
    }

    /// Get signature
    #[inline]
    #[must_use]
    pub fn signature(&self) -> &ConstructorSignature {
        self.constructor.signature()
    }
}

/// How an array instance produces its elements
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayLayout {
    /// Primitive or type-literal elements parsed from text; one combination
    Typable {
        /// Text the values were parsed from
        text: String,
        /// Parsed element values
        values: Vec<Literal>,
    },
    /// Object elements; children are element slots whose full sequences are concatenated
    Object,
}

/// Array instance
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayChoice {
    /// Element type
    pub element: ParamType,
    /// Element production
    pub layout: ArrayLayout,
}

impl ArrayChoice {
    /// Check if this is an object array
    #[inline]
    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self.layout, ArrayLayout::Object)
    }
}

/// Alias of a configured constructor elsewhere in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pointer {
    /// Aliased constructor
    pub target: NodeId,
    /// Re-expand the target's parameter space instead of sharing its instance
    pub cartesian: bool,
}

/// Node variant
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Pick one of the children
    ClassChoice(ClassChoice),
    /// Invoke a constructor with one value per child
    ConstructorChoice(ConstructorChoice),
    /// Build an array
    ArrayChoice(ArrayChoice),
    /// Terminal value
    LeafValue(Literal),
    /// Alias of a constructor
    Pointer(Pointer),
    /// Nothing legal could be resolved; never configured
    ErrorNode(String),
}

impl NodeKind {
    /// Short variant name for logs
    #[must_use]
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::ClassChoice(_) => "ClassChoice",
            Self::ConstructorChoice(_) => "ConstructorChoice",
            Self::ArrayChoice(_) => "ArrayChoice",
            Self::LeafValue(_) => "LeafValue",
            Self::Pointer(_) => "Pointer",
            Self::ErrorNode(_) => "ErrorNode",
        }
    }
}

/// Node of a configuration tree
#[derive(Debug, Clone)]
pub struct ChoiceNode {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) configured: bool,
    pub(crate) kind: NodeKind,
}

impl ChoiceNode {
    pub(crate) fn new(parent: Option<NodeId>, kind: NodeKind) -> Self {
        Self {
            parent,
            children: Vec::new(),
            configured: false,
            kind,
        }
    }

    /// Get parent, `None` for the root
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Get children in order
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Completeness as of the last recomputation
    #[inline]
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Get variant
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Get constructor payload
    #[inline]
    #[must_use]
    pub fn as_constructor(&self) -> Option<&ConstructorChoice> {
        match &self.kind {
            NodeKind::ConstructorChoice(c) => Some(c),
            _ => None,
        }
    }

    /// Get slot payload
    #[inline]
    #[must_use]
    pub fn as_class_choice(&self) -> Option<&ClassChoice> {
        match &self.kind {
            NodeKind::ClassChoice(c) => Some(c),
            _ => None,
        }
    }

    /// Get pointer payload
    #[inline]
    #[must_use]
    pub fn as_pointer(&self) -> Option<Pointer> {
        match &self.kind {
            NodeKind::Pointer(p) => Some(*p),
            _ => None,
        }
    }

    /// Get array payload
    #[inline]
    #[must_use]
    pub fn as_array(&self) -> Option<&ArrayChoice> {
        match &self.kind {
            NodeKind::ArrayChoice(a) => Some(a),
            _ => None,
        }
    }
}

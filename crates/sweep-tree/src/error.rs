//! Error types for configuration trees
//!
//! - [`TreeError`]: rejected structural edits
//! - [`AliasError`]: pointer topology inconsistencies
//! - [`EnumerationError`]: conditions that abort an enumeration pass
//! - [`PersistError`]: save/load failures

use crate::node::NodeId;
use sweep_core::{ConstructError, ConstructorSignature, LiteralError, ParamType, TypeName};

/// Pointer topology inconsistency
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AliasError {
    /// Pointer refers to a node that no longer exists
    #[error("pointer {pointer} refers to detached node {target}")]
    DanglingTarget {
        /// Offending pointer
        pointer: NodeId,
        /// Missing target
        target: NodeId,
    },

    /// Pointer target is not a constructor
    #[error("pointer target {0} is not a constructor choice")]
    NotAConstructor(NodeId),

    /// Pointer would make the tree cyclic
    #[error("pointer from {slot} to {target} would create a cycle")]
    WouldCreateCycle {
        /// Slot receiving the pointer
        slot: NodeId,
        /// Requested target
        target: NodeId,
    },

    /// A node was reached again while its own value was being realized
    #[error("node {0} depends on itself")]
    Reentrant(NodeId),
}

/// Rejected structural edit
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TreeError {
    /// Node handle does not exist
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// Operation needs a different node variant
    #[error("node {node} is a {found}, expected {expected}")]
    WrongKind {
        /// Node handle
        node: NodeId,
        /// Required variant
        expected: &'static str,
        /// Actual variant
        found: &'static str,
    },

    /// Value does not fit the slot's declared type
    #[error("slot {slot} of type {declared} cannot hold {what}")]
    Incompatible {
        /// Slot handle
        slot: NodeId,
        /// Declared type of the slot
        declared: ParamType,
        /// Rejected value description
        what: String,
    },

    /// Type is not offered for the slot
    #[error("type {0} is not an available implementation")]
    NotAnImplementation(TypeName),

    /// Catalog does not resolve the constructor
    #[error("constructor {0} cannot be resolved")]
    UnresolvedConstructor(ConstructorSignature),

    /// Root node cannot be removed
    #[error("the root node cannot be removed")]
    RemoveRoot,

    /// Literal text rejected
    #[error("invalid literal: {0}")]
    Literal(#[from] LiteralError),

    /// Pointer topology error
    #[error("alias error: {0}")]
    Alias(#[from] AliasError),
}

/// Condition that aborts an enumeration pass
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EnumerationError {
    /// Enumeration requested over an incomplete tree
    #[error("node {0} is not configured")]
    NotConfigured(NodeId),

    /// Pointer topology error
    #[error("alias error: {0}")]
    Alias(#[from] AliasError),

    /// Constructor failed; the pass is terminated
    #[error("constructing {signature} failed: {source}")]
    Construction {
        /// Constructor that failed
        signature: ConstructorSignature,
        /// Error reported by the constructor
        #[source]
        source: ConstructError,
    },
}

impl EnumerationError {
    /// Check if the error comes from a constructor rather than the tree
    #[inline]
    #[must_use]
    pub fn is_construction_failure(&self) -> bool {
        matches!(self, Self::Construction { .. })
    }
}

/// Save or load failure
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// File system error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed document
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Document written by an incompatible format version
    #[error("unsupported format version {found}, expected {expected}")]
    UnsupportedVersion {
        /// Version in the document
        found: u32,
        /// Version this build reads
        expected: u32,
    },

    /// Tree could not be snapshotted for saving
    #[error("alias error: {0}")]
    Alias(#[from] AliasError),
}

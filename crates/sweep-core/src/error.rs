//! Error types for sweep core
//!
//! Provides error handling for:
//! - Constructor invocation (skip versus failure)
//! - Literal parsing
//! - Rebuilding objects from recipes

use crate::types::{ConstructorSignature, PrimitiveKind};
use crate::value::SkipSignal;

/// Outcome of a constructor that did not produce an object
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConstructError {
    /// Combination is not a meaningful experiment; enumeration continues
    #[error("{0}")]
    Skip(SkipSignal),

    /// Constructor failed; enumeration must stop
    #[error("constructing {type_name} failed: {message}")]
    Failed {
        /// Type being constructed
        type_name: String,
        /// Failure description
        message: String,
    },
}

impl ConstructError {
    /// Create skip outcome
    #[inline]
    #[must_use]
    pub fn skip(reason: impl Into<String>) -> Self {
        Self::Skip(SkipSignal::new(reason))
    }

    /// Create failure outcome
    #[inline]
    #[must_use]
    pub fn failed(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Check if this is a skip rather than a failure
    #[inline]
    #[must_use]
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip(_))
    }
}

/// Literal text rejected by the parser
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LiteralError {
    /// Text is empty
    #[error("empty literal for {0:?}")]
    Empty(PrimitiveKind),

    /// A number could not be parsed
    #[error("invalid {kind:?} literal '{text}'")]
    InvalidNumber {
        /// Target kind
        kind: PrimitiveKind,
        /// Offending fragment
        text: String,
    },

    /// Interval item has an unexpected shape
    #[error("malformed interval '{0}'")]
    MalformedInterval(String),

    /// Interval step is zero or negative
    #[error("interval step must be positive in '{0}'")]
    NonPositiveStep(String),

    /// Character literal must be exactly one character
    #[error("char literal must be exactly one character, got '{0}'")]
    InvalidChar(String),

    /// Boolean literal must be `true` or `false`
    #[error("boolean literal must be true or false, got '{0}'")]
    InvalidBool(String),

    /// Literal expands to more values than a slot may hold
    #[error("'{text}' expands to more than {limit} values")]
    TooManyValues {
        /// Offending item or list
        text: String,
        /// Maximum number of values
        limit: usize,
    },
}

/// Recipe could not be rebuilt
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecipeError {
    /// Catalog no longer knows the constructor
    #[error("constructor {0} cannot be resolved")]
    Unresolved(ConstructorSignature),

    /// Constructor refused the arguments
    #[error("rebuilding {signature} failed: {source}")]
    Construct {
        /// Constructor being invoked
        signature: ConstructorSignature,
        /// Underlying failure
        #[source]
        source: ConstructError,
    },
}

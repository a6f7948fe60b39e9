//! Realized values
//!
//! # Core Concepts
//!
//! - [`Literal`]: serializable terminal value stored in a configuration tree
//! - [`Value`]: argument or result of a constructor invocation
//! - [`Instance`]: type-erased object produced by a constructor
//! - [`SkipSignal`]: "this combination is not a meaningful experiment"

use crate::types::TypeName;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Reason a combination was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipSignal {
    /// Human readable reason
    pub reason: String,
}

impl SkipSignal {
    /// Create new skip signal
    #[inline]
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SkipSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "skipped: {}", self.reason)
    }
}

/// Terminal value that can be written to a persisted tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Literal {
    /// Null reference
    Null,
    /// Boolean
    Bool(bool),
    /// Any integer kind
    Int(i64),
    /// Any floating point kind
    Float(f64),
    /// Character
    Char(char),
    /// String
    Str(String),
    /// Enumeration constant
    Enum {
        /// Enumeration type
        ty: TypeName,
        /// Constant name
        constant: String,
    },
    /// Type literal
    Class(TypeName),
}

impl Literal {
    /// Convert into a runtime value
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::Int(*i),
            Self::Float(x) => Value::Float(*x),
            Self::Char(c) => Value::Char(*c),
            Self::Str(s) => Value::Str(s.clone()),
            Self::Enum { ty, constant } => Value::Enum {
                ty: ty.clone(),
                constant: constant.clone(),
            },
            Self::Class(ty) => Value::Class(ty.clone()),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Char(c) => write!(f, "'{c}'"),
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::Enum { constant, .. } => f.write_str(constant),
            Self::Class(ty) => write!(f, "{}.class", ty.simple_name()),
        }
    }
}

/// Type-erased object produced by a constructor
///
/// Cloning shares the underlying object; [`Instance::same_instance`]
/// compares identity, not content.
#[derive(Clone)]
pub struct Instance {
    ty: TypeName,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    /// Wrap a freshly constructed object
    #[must_use]
    pub fn new<T: Any + Send + Sync>(ty: impl Into<TypeName>, value: T) -> Self {
        Self {
            ty: ty.into(),
            inner: Arc::new(value),
        }
    }

    /// Concrete type of the object
    #[inline]
    #[must_use]
    pub fn type_name(&self) -> &TypeName {
        &self.ty
    }

    /// Borrow the object as `T`
    #[inline]
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Check if both handles refer to the same object
    #[inline]
    #[must_use]
    pub fn same_instance(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance<{}>@{:p}", self.ty, Arc::as_ptr(&self.inner))
    }
}

/// Argument or result of a constructor invocation
#[derive(Debug, Clone)]
pub enum Value {
    /// Null reference
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// Character
    Char(char),
    /// String
    Str(String),
    /// Enumeration constant
    Enum {
        /// Enumeration type
        ty: TypeName,
        /// Constant name
        constant: String,
    },
    /// Type literal
    Class(TypeName),
    /// Array of values
    Array(Arc<[Value]>),
    /// Constructed object
    Object(Instance),
    /// No object for this combination
    Skip(SkipSignal),
}

impl Value {
    /// Check if value is the skip sentinel
    #[inline]
    #[must_use]
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip(_))
    }

    /// Get integer payload
    #[inline]
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get float payload, widening integers
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(x) => Some(*x),
            #[allow(clippy::cast_precision_loss)]
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get string payload
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get object payload
    #[inline]
    #[must_use]
    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Self::Object(instance) => Some(instance),
            _ => None,
        }
    }

    /// Get array payload
    #[inline]
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow an object payload as `T`
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_instance().and_then(Instance::downcast_ref)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (
                Self::Enum { ty: ta, constant: ca },
                Self::Enum { ty: tb, constant: cb },
            ) => ta == tb && ca == cb,
            (Self::Class(a), Self::Class(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.same_instance(b),
            (Self::Skip(a), Self::Skip(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Char(c) => write!(f, "'{c}'"),
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::Enum { constant, .. } => f.write_str(constant),
            Self::Class(ty) => write!(f, "{}.class", ty.simple_name()),
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Object(instance) => write!(f, "<{}>", instance.type_name().simple_name()),
            Self::Skip(signal) => write!(f, "{signal}"),
        }
    }
}

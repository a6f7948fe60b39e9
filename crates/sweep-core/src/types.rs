//! Type descriptors
//!
//! Provides [`TypeName`], [`ParamType`], [`ParamSpec`] and [`ConstructorSignature`].
//! Signatures are plain data so a persisted tree can be re-resolved against
//! a different catalog than the one it was built with.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fully qualified name of a type known to a catalog
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(String);

impl TypeName {
    /// Create new type name
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the name as a string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last segment of a dotted or `::` separated name
    #[must_use]
    pub fn simple_name(&self) -> &str {
        let tail = self.0.rsplit("::").next().unwrap_or(&self.0);
        tail.rsplit('.').next().unwrap_or(tail)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TypeName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Primitive parameter kinds that accept typed literal text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    /// 16-bit signed integer
    Short,
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// Single precision float
    Float,
    /// Double precision float
    Double,
    /// Boolean
    Bool,
    /// Single character
    Char,
    /// String
    Str,
}

impl PrimitiveKind {
    /// Check if kind is an integer kind
    #[inline]
    #[must_use]
    pub fn is_integer(self) -> bool {
        matches!(self, Self::Short | Self::Int | Self::Long)
    }

    /// Check if kind is a floating point kind
    #[inline]
    #[must_use]
    pub fn is_float(self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }

    /// Keyword used when rendering signatures
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Bool => "boolean",
            Self::Char => "char",
            Self::Str => "String",
        }
    }
}

/// Declared type of a constructor parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "of", rename_all = "snake_case")]
pub enum ParamType {
    /// Primitive or string value given as literal text
    Primitive(PrimitiveKind),
    /// Object built by one of the implementations of the named type
    Object(TypeName),
    /// One constant of the named enumeration
    Enum(TypeName),
    /// A type literal bounded by the named type
    ClassLiteral(TypeName),
    /// Array of the element type
    Array(Box<ParamType>),
}

impl ParamType {
    /// Shorthand for `Primitive(PrimitiveKind::Int)`
    #[inline]
    #[must_use]
    pub fn int() -> Self {
        Self::Primitive(PrimitiveKind::Int)
    }

    /// Shorthand for `Primitive(PrimitiveKind::Double)`
    #[inline]
    #[must_use]
    pub fn double() -> Self {
        Self::Primitive(PrimitiveKind::Double)
    }

    /// Shorthand for `Primitive(PrimitiveKind::Str)`
    #[inline]
    #[must_use]
    pub fn string() -> Self {
        Self::Primitive(PrimitiveKind::Str)
    }

    /// Shorthand for an object parameter
    #[inline]
    #[must_use]
    pub fn object(name: impl Into<TypeName>) -> Self {
        Self::Object(name.into())
    }

    /// Shorthand for an array parameter
    #[inline]
    #[must_use]
    pub fn array_of(element: ParamType) -> Self {
        Self::Array(Box::new(element))
    }

    /// Check if values of this type can be written as literal text
    ///
    /// Arrays of such types become typable arrays.
    #[inline]
    #[must_use]
    pub fn is_typable(&self) -> bool {
        matches!(self, Self::Primitive(_) | Self::ClassLiteral(_))
    }

    /// Check if `null` is an acceptable value
    #[inline]
    #[must_use]
    pub fn accepts_null(&self) -> bool {
        matches!(
            self,
            Self::Object(_) | Self::Array(_) | Self::ClassLiteral(_) | Self::Primitive(PrimitiveKind::Str)
        )
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(kind) => f.write_str(kind.keyword()),
            Self::Object(name) | Self::Enum(name) => f.write_str(name.simple_name()),
            Self::ClassLiteral(bound) => write!(f, "Class<{}>", bound.simple_name()),
            Self::Array(element) => write!(f, "{element}[]"),
        }
    }
}

/// Formal parameter of a constructor with its sweep annotations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name
    pub name: String,
    /// Declared type
    pub ty: ParamType,
    /// Default literal text, `"null"` meaning a null value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Preferred implementation when defaults are applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_class: Option<TypeName>,
    /// Implementations offered must also be assignable to this type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_interface: Option<TypeName>,
}

impl ParamSpec {
    /// Create new parameter without annotations
    #[must_use]
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            default_class: None,
            require_interface: None,
        }
    }

    /// Set default literal text
    #[inline]
    #[must_use]
    pub fn with_default(mut self, text: impl Into<String>) -> Self {
        self.default = Some(text.into());
        self
    }

    /// Set preferred implementation
    #[inline]
    #[must_use]
    pub fn with_default_class(mut self, ty: impl Into<TypeName>) -> Self {
        self.default_class = Some(ty.into());
        self
    }

    /// Restrict implementations to those assignable to `ty`
    #[inline]
    #[must_use]
    pub fn with_required_interface(mut self, ty: impl Into<TypeName>) -> Self {
        self.require_interface = Some(ty.into());
        self
    }
}

/// Declaring type plus parameter types of a constructor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstructorSignature {
    /// Type the constructor builds
    pub declaring_type: TypeName,
    /// Parameter types in declaration order
    pub param_types: Vec<ParamType>,
}

impl ConstructorSignature {
    /// Create new signature
    #[inline]
    #[must_use]
    pub fn new(declaring_type: impl Into<TypeName>, param_types: Vec<ParamType>) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            param_types,
        }
    }

    /// Number of parameters
    #[inline]
    #[must_use]
    pub fn arity(&self) -> usize {
        self.param_types.len()
    }
}

impl fmt::Display for ConstructorSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.declaring_type.simple_name())?;
        for (i, ty) in self.param_types.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{ty}")?;
        }
        f.write_str(")")
    }
}

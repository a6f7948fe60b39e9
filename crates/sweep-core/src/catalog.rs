//! Type catalog
//!
//! # Core Concepts
//!
//! - [`TypeCatalog`]: discovers concrete implementations and their constructors
//! - [`Constructor`]: signature, annotated parameters and a factory closure
//! - [`ClassRegistry`]: in-memory catalog populated by the host application
//!
//! # Example
//!
//! ```rust,ignore
//! use sweep_core::{ClassRegistry, Constructor, Instance, ParamSpec, ParamType, TypeDecl, Value};
//!
//! let mut registry = ClassRegistry::new();
//! registry.register(TypeDecl::interface("Topology"));
//! registry.register(TypeDecl::class("Ring").implements("Topology"));
//! registry.add_constructor(Constructor::new(
//!     "Ring",
//!     vec![ParamSpec::new("size", ParamType::int())],
//!     |args| Ok(Value::Object(Instance::new("Ring", args[0].as_int()))),
//! ));
//!
//! let impls = registry.discover_implementations(&"Topology".into());
//! ```

use crate::error::ConstructError;
use crate::types::{ConstructorSignature, ParamSpec, TypeName};
use crate::value::Value;
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

/// Factory closure invoked with realized arguments
pub type Factory = Arc<dyn Fn(&[Value]) -> Result<Value, ConstructError> + Send + Sync>;

/// Constructor known to a catalog
#[derive(Clone)]
pub struct Constructor {
    signature: ConstructorSignature,
    params: Vec<ParamSpec>,
    is_default: bool,
    ignored: bool,
    factory: Factory,
}

impl Constructor {
    /// Create new constructor; the signature is derived from the parameters
    pub fn new<F>(declaring_type: impl Into<TypeName>, params: Vec<ParamSpec>, factory: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, ConstructError> + Send + Sync + 'static,
    {
        let signature = ConstructorSignature::new(
            declaring_type,
            params.iter().map(|p| p.ty.clone()).collect(),
        );
        Self {
            signature,
            params,
            is_default: false,
            ignored: false,
            factory: Arc::new(factory),
        }
    }

    /// Mark as the constructor to use when defaults are applied
    #[inline]
    #[must_use]
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Hide from discovery
    #[inline]
    #[must_use]
    pub fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }

    /// Get signature
    #[inline]
    #[must_use]
    pub fn signature(&self) -> &ConstructorSignature {
        &self.signature
    }

    /// Get annotated parameters
    #[inline]
    #[must_use]
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Get declaring type
    #[inline]
    #[must_use]
    pub fn declaring_type(&self) -> &TypeName {
        &self.signature.declaring_type
    }

    /// Check if marked default
    #[inline]
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Check if hidden from discovery
    #[inline]
    #[must_use]
    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    /// Check if every parameter carries a default
    #[must_use]
    pub fn all_params_defaulted(&self) -> bool {
        !self.params.is_empty() && self.params.iter().all(|p| p.default.is_some())
    }

    /// Invoke the factory
    ///
    /// # Errors
    /// Returns [`ConstructError::Skip`] for meaningless combinations and
    /// [`ConstructError::Failed`] for genuine failures.
    pub fn invoke(&self, args: &[Value]) -> Result<Value, ConstructError> {
        if args.len() != self.params.len() {
            return Err(ConstructError::failed(
                self.signature.declaring_type.as_str(),
                format!("expected {} arguments, got {}", self.params.len(), args.len()),
            ));
        }
        (self.factory)(args)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("signature", &self.signature.to_string())
            .field("is_default", &self.is_default)
            .finish_non_exhaustive()
    }
}

/// Source of candidate types and constructors
///
/// Implementations must be referentially stable for the lifetime of the
/// trees that use them.
pub trait TypeCatalog: Send + Sync {
    /// Concrete, non-abstract types assignable to `base`, including `base` itself when concrete
    fn discover_implementations(&self, base: &TypeName) -> BTreeSet<TypeName>;

    /// Visible constructors of a concrete type
    fn constructors(&self, ty: &TypeName) -> Vec<Constructor>;

    /// Constants of an enumeration, `None` when `ty` is not an enumeration
    fn enum_constants(&self, ty: &TypeName) -> Option<Vec<String>>;

    /// Check if `ty` is `base` or one of its subtypes
    fn is_assignable(&self, ty: &TypeName, base: &TypeName) -> bool;

    /// Check if the catalog knows `ty`
    fn contains(&self, ty: &TypeName) -> bool;

    /// Resolve a persisted signature
    fn resolve_constructor(&self, signature: &ConstructorSignature) -> Option<Constructor> {
        self.constructors(&signature.declaring_type)
            .into_iter()
            .find(|c| c.signature() == signature)
    }
}

/// Registration record for [`ClassRegistry`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    name: TypeName,
    supertypes: Vec<TypeName>,
    is_abstract: bool,
    enum_constants: Option<Vec<String>>,
}

impl TypeDecl {
    /// Concrete class
    #[must_use]
    pub fn class(name: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            supertypes: Vec::new(),
            is_abstract: false,
            enum_constants: None,
        }
    }

    /// Interface or abstract class
    #[must_use]
    pub fn interface(name: impl Into<TypeName>) -> Self {
        Self {
            is_abstract: true,
            ..Self::class(name)
        }
    }

    /// Enumeration with its constants
    #[must_use]
    pub fn enumeration<I, S>(name: impl Into<TypeName>, constants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enum_constants: Some(constants.into_iter().map(Into::into).collect()),
            ..Self::class(name)
        }
    }

    /// Add a direct supertype
    #[inline]
    #[must_use]
    pub fn implements(mut self, supertype: impl Into<TypeName>) -> Self {
        self.supertypes.push(supertype.into());
        self
    }

    /// Get name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &TypeName {
        &self.name
    }
}

#[derive(Debug, Clone)]
struct TypeEntry {
    decl: TypeDecl,
    constructors: Vec<Constructor>,
}

/// In-memory [`TypeCatalog`]
///
/// Types keep registration order, so discovery results and constructor
/// lists are deterministic.
#[derive(Debug, Default, Clone)]
pub struct ClassRegistry {
    types: IndexMap<TypeName, TypeEntry>,
}

impl ClassRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            types: IndexMap::new(),
        }
    }

    /// Register a type, replacing an earlier declaration with the same name
    pub fn register(&mut self, decl: TypeDecl) {
        match self.types.get_mut(decl.name()) {
            Some(entry) => entry.decl = decl,
            None => {
                self.types.insert(
                    decl.name().clone(),
                    TypeEntry {
                        decl,
                        constructors: Vec::new(),
                    },
                );
            }
        }
    }

    /// Register a constructor; its declaring type is registered as a class if unknown
    pub fn add_constructor(&mut self, constructor: Constructor) {
        let name = constructor.declaring_type().clone();
        let entry = self.types.entry(name.clone()).or_insert_with(|| TypeEntry {
            decl: TypeDecl::class(name),
            constructors: Vec::new(),
        });
        entry
            .constructors
            .retain(|c| c.signature() != constructor.signature());
        entry.constructors.push(constructor);
    }

    /// Remove a type and its constructors
    pub fn remove(&mut self, name: &TypeName) -> bool {
        self.types.shift_remove(name).is_some()
    }

    /// Get number of registered types
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn supertypes_of(&self, ty: &TypeName) -> &[TypeName] {
        self.types
            .get(ty)
            .map_or(&[][..], |entry| entry.decl.supertypes.as_slice())
    }
}

impl TypeCatalog for ClassRegistry {
    fn discover_implementations(&self, base: &TypeName) -> BTreeSet<TypeName> {
        let found: BTreeSet<TypeName> = self
            .types
            .values()
            .filter(|entry| !entry.decl.is_abstract && entry.decl.enum_constants.is_none())
            .filter(|entry| self.is_assignable(&entry.decl.name, base))
            .map(|entry| entry.decl.name.clone())
            .collect();
        tracing::trace!("discovered {} implementations of {}", found.len(), base);
        found
    }

    fn constructors(&self, ty: &TypeName) -> Vec<Constructor> {
        self.types.get(ty).map_or_else(Vec::new, |entry| {
            entry
                .constructors
                .iter()
                .filter(|c| !c.is_ignored())
                .cloned()
                .collect()
        })
    }

    fn enum_constants(&self, ty: &TypeName) -> Option<Vec<String>> {
        self.types.get(ty)?.decl.enum_constants.clone()
    }

    fn is_assignable(&self, ty: &TypeName, base: &TypeName) -> bool {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([ty.clone()]);
        while let Some(current) = queue.pop_front() {
            if &current == base {
                return true;
            }
            if seen.insert(current.clone()) {
                queue.extend(self.supertypes_of(&current).iter().cloned());
            }
        }
        false
    }

    fn contains(&self, ty: &TypeName) -> bool {
        self.types.contains_key(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParamType;
    use crate::value::Instance;

    fn sample() -> ClassRegistry {
        let mut registry = ClassRegistry::new();
        registry.register(TypeDecl::interface("Shape"));
        registry.register(TypeDecl::interface("Polygon").implements("Shape"));
        registry.register(TypeDecl::class("Square").implements("Polygon"));
        registry.register(TypeDecl::class("Circle").implements("Shape"));
        registry.register(TypeDecl::enumeration("Color", ["RED", "GREEN"]));
        registry.add_constructor(Constructor::new(
            "Square",
            vec![ParamSpec::new("side", ParamType::int())],
            |args| Ok(Value::Object(Instance::new("Square", args[0].as_int()))),
        ));
        registry
    }

    #[test]
    fn discovery_is_transitive_and_skips_abstract() {
        let registry = sample();
        let found = registry.discover_implementations(&"Shape".into());
        let names: Vec<&str> = found.iter().map(TypeName::as_str).collect();
        assert_eq!(names, vec!["Circle", "Square"]);
    }

    #[test]
    fn concrete_base_discovers_itself() {
        let registry = sample();
        let found = registry.discover_implementations(&"Square".into());
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn enums_are_not_implementations() {
        let registry = sample();
        assert!(registry.discover_implementations(&"Color".into()).is_empty());
        assert_eq!(
            registry.enum_constants(&"Color".into()),
            Some(vec!["RED".to_string(), "GREEN".to_string()])
        );
    }

    #[test]
    fn resolve_constructor_by_signature() {
        let registry = sample();
        let sig = ConstructorSignature::new("Square", vec![ParamType::int()]);
        assert!(registry.resolve_constructor(&sig).is_some());
        let wrong = ConstructorSignature::new("Square", vec![ParamType::double()]);
        assert!(registry.resolve_constructor(&wrong).is_none());
    }

    #[test]
    fn invoke_checks_arity() {
        let registry = sample();
        let ctor = registry.constructors(&"Square".into()).remove(0);
        assert!(ctor.invoke(&[]).is_err());
        assert!(ctor.invoke(&[Value::Int(2)]).is_ok());
    }

    #[test]
    fn ignored_constructors_are_hidden() {
        let mut registry = sample();
        registry.add_constructor(
            Constructor::new("Circle", vec![], |_| Ok(Value::Null)).ignored(),
        );
        assert!(registry.constructors(&"Circle".into()).is_empty());
    }
}

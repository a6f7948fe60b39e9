//! Object recipes
//!
//! An [`ObjectRecipe`] records which constructor and which arguments produced
//! one realized object. Nested objects are recorded as nested recipes, so a
//! recipe is plain data: comparable, serializable and rebuildable against any
//! catalog that still resolves the signatures.

use crate::catalog::TypeCatalog;
use crate::error::RecipeError;
use crate::types::ConstructorSignature;
use crate::value::{Literal, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One recorded constructor argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "arg", content = "value", rename_all = "snake_case")]
pub enum Argument {
    /// Terminal value
    Literal(Literal),
    /// Array of arguments
    Array(Vec<Argument>),
    /// Object built by a nested constructor
    Recipe(Box<ObjectRecipe>),
}

impl Argument {
    /// Rebuild the runtime value
    ///
    /// # Errors
    /// Returns [`RecipeError`] if a nested recipe cannot be rebuilt.
    pub fn build(&self, catalog: &dyn TypeCatalog) -> Result<Value, RecipeError> {
        match self {
            Self::Literal(lit) => Ok(lit.to_value()),
            Self::Array(items) => {
                let values = items
                    .iter()
                    .map(|item| item.build(catalog))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(Arc::from(values)))
            }
            Self::Recipe(recipe) => recipe.build(catalog),
        }
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(lit) => write!(f, "{lit}"),
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
            Self::Recipe(recipe) => write!(f, "{recipe}"),
        }
    }
}

/// Constructor plus the arguments it was invoked with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecipe {
    signature: ConstructorSignature,
    arguments: Vec<Argument>,
}

impl ObjectRecipe {
    /// Create new recipe
    #[inline]
    #[must_use]
    pub fn new(signature: ConstructorSignature, arguments: Vec<Argument>) -> Self {
        Self {
            signature,
            arguments,
        }
    }

    /// Get constructor signature
    #[inline]
    #[must_use]
    pub fn signature(&self) -> &ConstructorSignature {
        &self.signature
    }

    /// Get recorded arguments
    #[inline]
    #[must_use]
    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    /// Construct a fresh object from this recipe
    ///
    /// Objects shared between arguments are rebuilt separately.
    ///
    /// # Errors
    /// Returns [`RecipeError::Unresolved`] if the catalog no longer resolves a
    /// signature, or [`RecipeError::Construct`] if a constructor refuses.
    pub fn build(&self, catalog: &dyn TypeCatalog) -> Result<Value, RecipeError> {
        let constructor = catalog
            .resolve_constructor(&self.signature)
            .ok_or_else(|| RecipeError::Unresolved(self.signature.clone()))?;
        let args = self
            .arguments
            .iter()
            .map(|arg| arg.build(catalog))
            .collect::<Result<Vec<_>, _>>()?;
        constructor
            .invoke(&args)
            .map_err(|source| RecipeError::Construct {
                signature: self.signature.clone(),
                source,
            })
    }
}

impl fmt::Display for ObjectRecipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.signature.declaring_type.simple_name())?;
        for (i, arg) in self.arguments.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ClassRegistry, Constructor};
    use crate::error::ConstructError;
    use crate::types::{ParamSpec, ParamType};
    use crate::value::Instance;

    #[derive(Debug, PartialEq)]
    struct Pair(i64, i64);

    fn registry() -> ClassRegistry {
        let mut registry = ClassRegistry::new();
        registry.add_constructor(Constructor::new(
            "Pair",
            vec![
                ParamSpec::new("a", ParamType::int()),
                ParamSpec::new("b", ParamType::int()),
            ],
            |args| match (args[0].as_int(), args[1].as_int()) {
                (Some(a), Some(b)) => Ok(Value::Object(Instance::new("Pair", Pair(a, b)))),
                _ => Err(ConstructError::failed("Pair", "expected ints")),
            },
        ));
        registry
    }

    fn pair_recipe(a: i64, b: i64) -> ObjectRecipe {
        ObjectRecipe::new(
            ConstructorSignature::new("Pair", vec![ParamType::int(), ParamType::int()]),
            vec![Argument::Literal(Literal::Int(a)), Argument::Literal(Literal::Int(b))],
        )
    }

    #[test]
    fn build_invokes_constructor() {
        let value = pair_recipe(1, 20).build(&registry()).unwrap();
        assert_eq!(value.downcast_ref::<Pair>(), Some(&Pair(1, 20)));
    }

    #[test]
    fn build_unresolved_signature() {
        let recipe = ObjectRecipe::new(ConstructorSignature::new("Gone", vec![]), vec![]);
        assert!(matches!(
            recipe.build(&registry()),
            Err(RecipeError::Unresolved(_))
        ));
    }

    #[test]
    fn build_reports_constructor_refusal() {
        let recipe = ObjectRecipe::new(
            ConstructorSignature::new("Pair", vec![ParamType::int(), ParamType::int()]),
            vec![
                Argument::Literal(Literal::Null),
                Argument::Literal(Literal::Int(1)),
            ],
        );
        assert!(matches!(
            recipe.build(&registry()),
            Err(RecipeError::Construct { .. })
        ));
    }

    #[test]
    fn display_nests() {
        let outer = ObjectRecipe::new(
            ConstructorSignature::new("Box", vec![ParamType::object("Pair")]),
            vec![Argument::Array(vec![Argument::Recipe(Box::new(pair_recipe(1, 2)))])],
        );
        assert_eq!(outer.to_string(), "Box([Pair(1, 2)])");
    }
}

//! Sweep Core
//!
//! Values, type descriptors and type discovery shared by configuration trees
//! and experiment runners.
//!
//! # Core Concepts
//!
//! - [`TypeCatalog`]: discovers implementations and constructors of a type
//! - [`ClassRegistry`]: in-memory catalog filled by the host application
//! - [`ConstructorSignature`]: declaring type plus parameter types, persistable
//! - [`Value`]: realized argument or object, including the [`SkipSignal`] sentinel
//! - [`ObjectRecipe`]: provenance of one realized object
//! - [`parse_literal`]: literal and interval syntax for primitive parameters
//!
//! # Example
//!
//! ```rust,ignore
//! use sweep_core::{parse_literal, PrimitiveKind};
//!
//! // Five sizes, 4 through 64 on a log scale
//! let sizes = parse_literal(PrimitiveKind::Int, "4:64log5")?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod catalog;
mod error;
mod literal;
mod recipe;
mod types;
mod value;

// Re-exports
pub use catalog::{ClassRegistry, Constructor, Factory, TypeCatalog, TypeDecl};
pub use error::{ConstructError, LiteralError, RecipeError};
pub use literal::{parse_literal, MAX_LITERAL_VALUES};
pub use recipe::{Argument, ObjectRecipe};
pub use types::{ConstructorSignature, ParamSpec, ParamType, PrimitiveKind, TypeName};
pub use value::{Instance, Literal, SkipSignal, Value};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Sweep Tree
//!
//! Configuration trees describing a parameter sweep, and resettable
//! enumeration of every object the tree describes.
//!
//! # Core Concepts
//!
//! - [`ConfigurationTree`]: arena of [`ChoiceNode`]s; slots, constructors,
//!   arrays, leaves and pointers
//! - Readiness: root completeness, broadcast to [`TreeListener`]s on transitions
//! - [`ObjectEnumerator`]: odometer over a snapshot, one [`Produced`] per combination
//! - Pointers: shared (reuse the target's instance) or cartesian (re-expand
//!   the target's parameters)
//! - Persistence: versioned JSON, pruning constructors that no longer resolve
//!
//! # Example
//!
//! ```rust,ignore
//! use sweep_tree::{ConfigurationTree, Produced};
//!
//! let mut tree = ConfigurationTree::new("demo.Foo", catalog);
//! let foo = tree.add_constructor(tree.root(), &foo_signature, false)?;
//! tree.add_literal(tree.children(foo)[0], "1,2")?;
//! tree.add_literal(tree.children(foo)[1], "10:10:30")?;
//!
//! for produced in tree.enumerate()? {
//!     if let Produced::Object { recipe: Some(recipe), .. } = produced? {
//!         println!("{recipe}");
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod alias;
mod defaults;
mod edit;
mod enumerator;
mod error;
mod iter;
mod node;
mod persist;
mod readiness;
mod tree;

// Re-exports
pub use alias::IdentityMap;
pub use enumerator::{ObjectEnumerator, Produced};
pub use error::{AliasError, EnumerationError, PersistError, TreeError};
pub use node::{ArrayChoice, ArrayLayout, ChoiceNode, ClassChoice, ConstructorChoice, NodeId, NodeKind, Pointer};
pub use persist::{LoadReport, PersistedNode, TreeDocument, FORMAT_VERSION};
pub use readiness::{ReadyState, TreeListener};
pub use tree::{ConfigurationTree, RegisteredConstructor, TreeOptions};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Top-level enumeration
//!
//! [`ConfigurationTree::enumerate`] snapshots the live tree, expands
//! cartesian pointers in the snapshot and hands back an [`ObjectEnumerator`]
//! that yields one [`Produced`] element per combination. The live tree is
//! never touched by iteration.

use crate::alias::expand_cartesian;
use crate::error::EnumerationError;
use crate::iter::{Realization, RecipeIterator};
use crate::tree::ConfigurationTree;
use std::iter::FusedIterator;
use sweep_core::{Argument, ObjectRecipe, SkipSignal, Value};

/// One element of an enumeration pass
#[derive(Debug, Clone)]
pub enum Produced {
    /// Realized value; objects carry the recipe that built them
    Object {
        /// Realized root value
        value: Value,
        /// Provenance, `None` when the root value is not a constructed object
        recipe: Option<ObjectRecipe>,
    },
    /// Combination is not a meaningful experiment
    Skipped(SkipSignal),
}

impl Produced {
    fn from_realization(realization: Realization) -> Self {
        match realization.value {
            Value::Skip(signal) => Self::Skipped(signal),
            value => {
                let recipe = match realization.argument {
                    Some(Argument::Recipe(recipe)) => Some(*recipe),
                    _ => None,
                };
                Self::Object { value, recipe }
            }
        }
    }

    /// Check if no object resulted
    #[inline]
    #[must_use]
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }

    /// Get realized value
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Object { value, .. } => Some(value),
            Self::Skipped(_) => None,
        }
    }

    /// Get recipe
    #[inline]
    #[must_use]
    pub fn recipe(&self) -> Option<&ObjectRecipe> {
        match self {
            Self::Object { recipe, .. } => recipe.as_ref(),
            Self::Skipped(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Positioned on the first combination, nothing produced yet
    Fresh,
    Running,
    Exhausted,
    /// Buffers dropped by `cleanup`; `reset` starts a new pass
    Released,
}

/// Resettable iterator over every combination of a snapshot
///
/// Single-threaded: one enumerator per worker, each from its own
/// [`ConfigurationTree::enumerate`] call.
#[derive(Debug)]
pub struct ObjectEnumerator {
    iterator: RecipeIterator,
    phase: Phase,
    total: u64,
    produced: u64,
    skipped: u64,
}

impl ObjectEnumerator {
    fn new(iterator: RecipeIterator) -> Self {
        let total = iterator.total_combinations();
        Self {
            iterator,
            phase: Phase::Fresh,
            total,
            produced: 0,
            skipped: 0,
        }
    }

    /// Combinations one full pass yields
    #[inline]
    #[must_use]
    pub fn total_combinations(&self) -> u64 {
        self.total
    }

    /// Elements yielded in the current pass, skips included
    #[inline]
    #[must_use]
    pub fn produced(&self) -> u64 {
        self.produced
    }

    /// Skips yielded in the current pass
    #[inline]
    #[must_use]
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Check if the pass has ended
    #[inline]
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self.phase, Phase::Exhausted | Phase::Released)
    }

    /// Rewind to the first combination
    ///
    /// The next pass yields the same recipes in the same order.
    pub fn reset(&mut self) {
        self.iterator.reset_root();
        self.phase = Phase::Fresh;
        self.produced = 0;
        self.skipped = 0;
    }

    /// Drop every buffered value and end the pass
    pub fn cleanup(&mut self) {
        self.iterator.release();
        self.phase = Phase::Released;
        tracing::debug!("enumerator released after {} elements", self.produced);
    }

    fn step(&mut self) -> Option<Result<Produced, EnumerationError>> {
        match self.phase {
            Phase::Fresh => self.phase = Phase::Running,
            Phase::Running => {
                if !self.iterator.can_advance_root() {
                    self.phase = Phase::Exhausted;
                    return None;
                }
                self.iterator.advance_root();
            }
            Phase::Exhausted | Phase::Released => return None,
        }
        match self.iterator.realize_root() {
            Ok(realization) => {
                let produced = Produced::from_realization(realization);
                self.produced += 1;
                if produced.is_skip() {
                    self.skipped += 1;
                }
                Some(Ok(produced))
            }
            Err(e) => {
                self.phase = Phase::Exhausted;
                Some(Err(e))
            }
        }
    }
}

impl Iterator for ObjectEnumerator {
    type Item = Result<Produced, EnumerationError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.step()
    }
}

impl FusedIterator for ObjectEnumerator {}

impl ConfigurationTree {
    /// Enumerate every combination of a snapshot of this tree
    ///
    /// # Errors
    /// Returns [`EnumerationError::NotConfigured`] if the tree is not ready
    /// and [`EnumerationError::Alias`] if pointer topology is inconsistent.
    pub fn enumerate(&self) -> Result<ObjectEnumerator, EnumerationError> {
        if !self.is_ready() {
            return Err(EnumerationError::NotConfigured(self.root));
        }
        let mut snapshot = self.snapshot()?;
        expand_cartesian(&mut snapshot)?;
        let iterator = RecipeIterator::compile(&snapshot)?;
        let enumerator = ObjectEnumerator::new(iterator);
        tracing::debug!(
            "enumerating {} ({} nodes, {} combinations)",
            self.root_type,
            snapshot.len(),
            enumerator.total
        );
        Ok(enumerator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use sweep_core::{
        ClassRegistry, Constructor, ConstructError, ConstructorSignature, Instance, ParamSpec,
        ParamType, TypeDecl,
    };

    #[derive(Debug)]
    struct Size(i64);

    fn catalog() -> Arc<ClassRegistry> {
        let mut registry = ClassRegistry::new();
        registry.register(TypeDecl::class("Size"));
        registry.add_constructor(Constructor::new(
            "Size",
            vec![ParamSpec::new("n", ParamType::int())],
            |args: &[Value]| match args[0].as_int() {
                Some(0) => Err(ConstructError::skip("empty")),
                Some(n) if n < 0 => Err(ConstructError::failed("Size", "negative")),
                Some(n) => Ok(Value::Object(Instance::new("Size", Size(n)))),
                None => Err(ConstructError::failed("Size", "not an int")),
            },
        ));
        Arc::new(registry)
    }

    fn tree(literal: &str) -> ConfigurationTree {
        let mut tree = ConfigurationTree::new("Size", catalog());
        let sig = ConstructorSignature::new("Size", vec![ParamType::int()]);
        let ctor = tree.add_constructor(tree.root(), &sig, false).unwrap();
        let n = tree.children(ctor)[0];
        tree.add_literal(n, literal).unwrap();
        tree
    }

    #[test]
    fn unready_tree_rejected() {
        let tree = ConfigurationTree::new("Size", catalog());
        assert!(matches!(tree.enumerate(), Err(EnumerationError::NotConfigured(_))));
    }

    #[test]
    fn first_call_does_not_advance() {
        let mut en = tree("3,5").enumerate().unwrap();
        let first = en.next().unwrap().unwrap();
        assert_eq!(first.value().and_then(|v| v.downcast_ref::<Size>()).map(|s| s.0), Some(3));
        let second = en.next().unwrap().unwrap();
        assert_eq!(second.value().and_then(|v| v.downcast_ref::<Size>()).map(|s| s.0), Some(5));
        assert!(en.next().is_none());
        assert!(en.next().is_none());
        assert_eq!(en.produced(), 2);
    }

    #[test]
    fn skip_is_an_element() {
        let en = tree("0:2").enumerate().unwrap();
        let all: Vec<Produced> = en.map(Result::unwrap).collect();
        assert_eq!(all.len(), 3);
        assert!(all[0].is_skip());
        assert!(!all[1].is_skip());
        assert!(all[1].recipe().is_some());
    }

    #[test]
    fn failure_ends_the_pass() {
        let mut en = tree("-1,1").enumerate().unwrap();
        let err = en.next().unwrap().unwrap_err();
        assert!(err.is_construction_failure());
        assert!(en.next().is_none());
        assert!(en.is_exhausted());
    }

    #[test]
    fn cleanup_then_reset() {
        let mut en = tree("1:4").enumerate().unwrap();
        assert_eq!(en.by_ref().count(), 4);
        en.cleanup();
        assert!(en.next().is_none());
        en.reset();
        assert_eq!(en.by_ref().count(), 4);
        assert_eq!(en.total_combinations(), 4);
    }
}

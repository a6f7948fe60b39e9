//! Recipe iteration
//!
//! An enumeration snapshot is compiled into a flat plan, one [`Step`] per
//! node, plus a cursor per node. Moving through the combination space and
//! realizing values are separate concerns:
//!
//! - `reset` rewinds a node to its first combination
//! - `can_advance` / `advance` form a mixed-radix counter: a constructor
//!   advances its first parameter that still has a next value, rewinding the
//!   parameters before it, so parameter 0 varies fastest; a slot advances its
//!   current alternative, then moves to the next alternative
//! - `realize` builds the value of the current combination bottom-up
//!
//! Every cursor movement is stamped with a fresh epoch. A constructor keeps
//! its last realization together with the newest stamp among its inputs and
//! is only invoked again when that stamp changes. Shared pointers therefore
//! see the very instance their target produced for the current combination,
//! and the target is driven only from its own position in the tree.

use crate::error::{AliasError, EnumerationError};
use crate::node::{ArrayLayout, ChoiceNode, NodeId, NodeKind};
use crate::tree::ConfigurationTree;
use std::collections::HashSet;
use std::sync::Arc;
use sweep_core::{Argument, Constructor, ConstructError, Literal, ObjectRecipe, SkipSignal, Value};

/// Value of the current combination plus its provenance
#[derive(Debug, Clone)]
pub(crate) struct Realization {
    pub(crate) value: Value,
    /// `None` exactly when `value` is a skip
    pub(crate) argument: Option<Argument>,
}

impl Realization {
    fn literal(literal: &Literal) -> Self {
        Self {
            value: literal.to_value(),
            argument: Some(Argument::Literal(literal.clone())),
        }
    }

    fn skipped(signal: SkipSignal) -> Self {
        Self {
            value: Value::Skip(signal),
            argument: None,
        }
    }

    fn skip_signal(&self) -> Option<&SkipSignal> {
        match &self.value {
            Value::Skip(signal) => Some(signal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Step {
    /// Alternatives of a slot
    Choice { alternatives: Vec<usize> },
    /// Constructor over its parameter slots
    Construct { constructor: Constructor, params: Vec<usize> },
    /// Replays the target's realization
    Shared { target: usize },
    /// Constant value
    Leaf(Literal),
    /// Constant array
    Typable(Vec<Literal>),
    /// Concatenated full sequences of the element slots; `external` lists
    /// shared targets outside the array that elements depend on
    ObjectArray { elements: Vec<usize>, external: Vec<usize> },
}

/// Who is using a node's realization in the current round
#[derive(Debug, Clone, Default)]
enum DriveState {
    /// Nothing realized since the last cleanup
    #[default]
    NotStarted,
    /// Realization in progress; reaching the node again is a cycle
    Driving,
    /// Realization valid for inputs stamped `version`; later readers replay it
    Replaying { version: u64, realization: Realization },
}

#[derive(Debug, Clone, Default)]
struct Cursor {
    alternative: usize,
    stamp: u64,
    drive: DriveState,
}

/// Odometer over one compiled snapshot
#[derive(Debug)]
pub(crate) struct RecipeIterator {
    plan: Vec<Step>,
    root: usize,
    cursors: Vec<Cursor>,
    epoch: u64,
}

impl RecipeIterator {
    /// Compile an expanded snapshot; every node must be configured
    pub(crate) fn compile(tree: &ConfigurationTree) -> Result<Self, EnumerationError> {
        let mut plan = Vec::with_capacity(tree.nodes.len());
        for (index, slot) in tree.nodes.iter().enumerate() {
            let id = NodeId(u32::try_from(index).unwrap_or(u32::MAX));
            let node = slot.as_ref().ok_or(EnumerationError::NotConfigured(id))?;
            plan.push(compile_node(tree, id, node)?);
        }
        let mut iterator = Self {
            cursors: vec![Cursor::default(); plan.len()],
            plan,
            root: tree.root().index(),
            epoch: 0,
        };
        iterator.link_array_dependencies();
        iterator.reset_root();
        Ok(iterator)
    }

    /// Record, per object array, the shared targets outside it
    fn link_array_dependencies(&mut self) {
        for index in 0..self.plan.len() {
            let Step::ObjectArray { elements, .. } = &self.plan[index] else {
                continue;
            };
            let mut inside = HashSet::new();
            let mut stack = elements.clone();
            while let Some(current) = stack.pop() {
                if inside.insert(current) {
                    stack.extend(self.children_of(current));
                }
            }
            let mut external: Vec<usize> = inside
                .iter()
                .filter_map(|i| match &self.plan[*i] {
                    Step::Shared { target } if !inside.contains(target) => Some(*target),
                    _ => None,
                })
                .collect();
            external.sort_unstable();
            external.dedup();
            if let Step::ObjectArray { external: slot, .. } = &mut self.plan[index] {
                *slot = external;
            }
        }
    }

    fn children_of(&self, index: usize) -> Vec<usize> {
        match &self.plan[index] {
            Step::Choice { alternatives } => alternatives.clone(),
            Step::Construct { params, .. } => params.clone(),
            Step::ObjectArray { elements, .. } => elements.clone(),
            Step::Shared { .. } | Step::Leaf(_) | Step::Typable(_) => Vec::new(),
        }
    }

    /// Combinations of the compiled tree
    pub(crate) fn total_combinations(&self) -> u64 {
        self.count(self.root)
    }

    fn count(&self, index: usize) -> u64 {
        match &self.plan[index] {
            Step::Choice { alternatives } => alternatives
                .iter()
                .fold(0u64, |acc, a| acc.saturating_add(self.count(*a))),
            Step::Construct { params, .. } => params
                .iter()
                .fold(1u64, |acc, p| acc.saturating_mul(self.count(*p))),
            Step::Shared { .. } | Step::Leaf(_) | Step::Typable(_) | Step::ObjectArray { .. } => 1,
        }
    }

    /// Rewind to the first combination and drop buffered realizations
    pub(crate) fn reset_root(&mut self) {
        self.release();
        self.reset(self.root);
    }

    pub(crate) fn can_advance_root(&self) -> bool {
        self.can_advance(self.root)
    }

    pub(crate) fn advance_root(&mut self) {
        self.advance(self.root);
    }

    pub(crate) fn realize_root(&mut self) -> Result<Realization, EnumerationError> {
        self.realize(self.root).map(|(realization, _)| realization)
    }

    /// Drop every buffered realization
    pub(crate) fn release(&mut self) {
        for cursor in &mut self.cursors {
            cursor.drive = DriveState::NotStarted;
        }
    }

    fn touch(&mut self, index: usize) {
        self.epoch += 1;
        self.cursors[index].stamp = self.epoch;
    }

    fn reset(&mut self, index: usize) {
        match &self.plan[index] {
            Step::Choice { alternatives } => {
                let first = alternatives.first().copied();
                self.cursors[index].alternative = 0;
                self.touch(index);
                if let Some(first) = first {
                    self.reset(first);
                }
            }
            Step::Construct { params, .. } => {
                let params = params.clone();
                self.touch(index);
                for param in params {
                    self.reset(param);
                }
            }
            Step::ObjectArray { .. } => self.touch(index),
            // a shared pointer never rewinds its target
            Step::Shared { .. } | Step::Leaf(_) | Step::Typable(_) => {}
        }
    }

    fn can_advance(&self, index: usize) -> bool {
        match &self.plan[index] {
            Step::Choice { alternatives } => {
                let current = self.cursors[index].alternative;
                alternatives
                    .get(current)
                    .is_some_and(|a| self.can_advance(*a))
                    || current + 1 < alternatives.len()
            }
            Step::Construct { params, .. } => params.iter().any(|p| self.can_advance(*p)),
            Step::Shared { .. } | Step::Leaf(_) | Step::Typable(_) | Step::ObjectArray { .. } => false,
        }
    }

    /// Move to the next combination; callers check `can_advance` first
    fn advance(&mut self, index: usize) {
        match &self.plan[index] {
            Step::Choice { alternatives } => {
                let current = self.cursors[index].alternative;
                let active = alternatives.get(current).copied();
                let next = alternatives.get(current + 1).copied();
                match active {
                    Some(active) if self.can_advance(active) => self.advance(active),
                    _ => {
                        if let Some(next) = next {
                            self.cursors[index].alternative = current + 1;
                            self.touch(index);
                            self.reset(next);
                        }
                    }
                }
            }
            Step::Construct { params, .. } => {
                let params = params.clone();
                for param in params {
                    if self.can_advance(param) {
                        self.advance(param);
                        return;
                    }
                    self.reset(param);
                }
            }
            Step::Shared { .. } | Step::Leaf(_) | Step::Typable(_) | Step::ObjectArray { .. } => {}
        }
    }

    /// Realize the current combination of a node, returning the newest input stamp
    fn realize(&mut self, index: usize) -> Result<(Realization, u64), EnumerationError> {
        match &self.plan[index] {
            Step::Leaf(literal) => Ok((Realization::literal(literal), 0)),
            Step::Typable(values) => {
                let realization = Realization {
                    value: Value::Array(values.iter().map(Literal::to_value).collect::<Vec<_>>().into()),
                    argument: Some(Argument::Array(
                        values.iter().cloned().map(Argument::Literal).collect(),
                    )),
                };
                Ok((realization, 0))
            }
            Step::Choice { alternatives } => {
                let active = alternatives
                    .get(self.cursors[index].alternative)
                    .copied()
                    .ok_or(EnumerationError::NotConfigured(node_id(index)))?;
                let (realization, version) = self.realize(active)?;
                Ok((realization, version.max(self.cursors[index].stamp)))
            }
            Step::Shared { target } => {
                let target = *target;
                self.realize(target)
            }
            Step::Construct { constructor, params } => {
                let constructor = constructor.clone();
                let params = params.clone();
                self.realize_constructor(index, &constructor, &params)
            }
            Step::ObjectArray { elements, external } => {
                let elements = elements.clone();
                let external = external.clone();
                self.realize_array(index, &elements, &external)
            }
        }
    }

    /// Mark `index` as driving; the previous state is returned for replay checks
    fn begin_drive(&mut self, index: usize) -> Result<DriveState, EnumerationError> {
        let previous = std::mem::replace(&mut self.cursors[index].drive, DriveState::Driving);
        if matches!(previous, DriveState::Driving) {
            return Err(AliasError::Reentrant(node_id(index)).into());
        }
        Ok(previous)
    }

    fn finish_drive(&mut self, index: usize, version: u64, realization: &Realization) {
        self.cursors[index].drive = DriveState::Replaying {
            version,
            realization: realization.clone(),
        };
    }

    fn realize_constructor(
        &mut self,
        index: usize,
        constructor: &Constructor,
        params: &[usize],
    ) -> Result<(Realization, u64), EnumerationError> {
        let previous = self.begin_drive(index)?;
        let mut version = self.cursors[index].stamp;
        let mut inputs = Vec::with_capacity(params.len());
        for param in params {
            match self.realize(*param) {
                Ok((realization, stamp)) => {
                    version = version.max(stamp);
                    inputs.push(realization);
                }
                Err(e) => {
                    self.cursors[index].drive = DriveState::NotStarted;
                    return Err(e);
                }
            }
        }

        if let DriveState::Replaying {
            version: buffered,
            realization,
        } = previous
        {
            if buffered == version {
                self.finish_drive(index, version, &realization);
                return Ok((realization, version));
            }
        }

        let realization = if let Some(signal) = inputs.iter().find_map(Realization::skip_signal) {
            tracing::debug!("{} skipped by argument: {}", constructor.signature(), signal);
            Realization::skipped(signal.clone())
        } else {
            let values: Vec<Value> = inputs.iter().map(|r| r.value.clone()).collect();
            match constructor.invoke(&values) {
                Ok(Value::Skip(signal)) | Err(ConstructError::Skip(signal)) => {
                    tracing::debug!("{} skipped: {}", constructor.signature(), signal);
                    Realization::skipped(signal)
                }
                Ok(value) => Realization {
                    value,
                    argument: Some(Argument::Recipe(Box::new(ObjectRecipe::new(
                        constructor.signature().clone(),
                        inputs.into_iter().filter_map(|r| r.argument).collect(),
                    )))),
                },
                Err(source) => {
                    tracing::error!("{} failed: {}", constructor.signature(), source);
                    self.cursors[index].drive = DriveState::NotStarted;
                    return Err(EnumerationError::Construction {
                        signature: constructor.signature().clone(),
                        source,
                    });
                }
            }
        };
        self.finish_drive(index, version, &realization);
        Ok((realization, version))
    }

    fn realize_array(
        &mut self,
        index: usize,
        elements: &[usize],
        external: &[usize],
    ) -> Result<(Realization, u64), EnumerationError> {
        let previous = self.begin_drive(index)?;
        let mut version = self.cursors[index].stamp;
        for dependency in external {
            match self.realize(*dependency) {
                Ok((_, stamp)) => version = version.max(stamp),
                Err(e) => {
                    self.cursors[index].drive = DriveState::NotStarted;
                    return Err(e);
                }
            }
        }
        if let DriveState::Replaying {
            version: buffered,
            realization,
        } = previous
        {
            if buffered == version {
                self.finish_drive(index, version, &realization);
                return Ok((realization, version));
            }
        }

        let mut items = Vec::new();
        let mut skip = None;
        for element in elements {
            // each element contributes its whole sequence
            self.reset(*element);
            loop {
                let realization = match self.realize(*element) {
                    Ok((realization, _)) => realization,
                    Err(e) => {
                        self.cursors[index].drive = DriveState::NotStarted;
                        return Err(e);
                    }
                };
                if skip.is_none() {
                    skip = realization.skip_signal().cloned();
                }
                items.push(realization);
                if !self.can_advance(*element) {
                    break;
                }
                self.advance(*element);
            }
        }

        let realization = match skip {
            Some(signal) => Realization::skipped(signal),
            None => {
                let values: Vec<Value> = items.iter().map(|r| r.value.clone()).collect();
                Realization {
                    value: Value::Array(Arc::from(values)),
                    argument: Some(Argument::Array(
                        items.into_iter().filter_map(|r| r.argument).collect(),
                    )),
                }
            }
        };
        self.finish_drive(index, version, &realization);
        Ok((realization, version))
    }
}

fn node_id(index: usize) -> NodeId {
    NodeId(u32::try_from(index).unwrap_or(u32::MAX))
}

fn compile_node(tree: &ConfigurationTree, id: NodeId, node: &ChoiceNode) -> Result<Step, EnumerationError> {
    if !node.configured {
        return Err(EnumerationError::NotConfigured(id));
    }
    let children = || node.children.iter().map(|c| c.index()).collect::<Vec<_>>();
    let step = match &node.kind {
        NodeKind::ClassChoice(_) => {
            if node.children.is_empty() {
                return Err(EnumerationError::NotConfigured(id));
            }
            Step::Choice {
                alternatives: children(),
            }
        }
        NodeKind::ConstructorChoice(c) => Step::Construct {
            constructor: c.constructor.clone(),
            params: children(),
        },
        NodeKind::ArrayChoice(array) => match &array.layout {
            ArrayLayout::Typable { values, .. } => Step::Typable(values.clone()),
            ArrayLayout::Object => Step::ObjectArray {
                elements: children(),
                external: Vec::new(),
            },
        },
        NodeKind::LeafValue(literal) => Step::Leaf(literal.clone()),
        NodeKind::Pointer(pointer) => {
            let target = tree.node(pointer.target).ok_or(AliasError::DanglingTarget {
                pointer: id,
                target: pointer.target,
            })?;
            if target.as_constructor().is_none() {
                return Err(AliasError::NotAConstructor(pointer.target).into());
            }
            Step::Shared {
                target: pointer.target.index(),
            }
        }
        NodeKind::ErrorNode(_) => return Err(EnumerationError::NotConfigured(id)),
    };
    Ok(step)
}

//! Structural edit operations
//!
//! Every successful edit ends with a completeness recomputation, so
//! readiness listeners observe the tree after each call.

use crate::alias;
use crate::error::{AliasError, TreeError};
use crate::node::{ArrayChoice, ArrayLayout, ClassChoice, ConstructorChoice, NodeId, NodeKind, Pointer};
use crate::tree::ConfigurationTree;
use sweep_core::{
    parse_literal, Constructor, ConstructorSignature, Literal, ParamType, PrimitiveKind, TypeName,
};

impl ConfigurationTree {
    /// Constructors offered for an object slot
    ///
    /// # Errors
    /// Returns [`TreeError`] if `slot` is not an object slot.
    pub fn candidate_constructors(&self, slot: NodeId) -> Result<Vec<Constructor>, TreeError> {
        Ok(self
            .implementations(slot)?
            .iter()
            .flat_map(|ty| self.catalog.constructors(ty))
            .collect())
    }

    /// Add a constructor as a new alternative of an object slot
    ///
    /// With `with_defaults` every parameter slot is pre-filled from its
    /// annotations.
    ///
    /// # Errors
    /// Returns [`TreeError`] if the slot is not an object slot, the declaring
    /// type is not offered for it, or the catalog does not resolve the signature.
    pub fn add_constructor(
        &mut self,
        slot: NodeId,
        signature: &ConstructorSignature,
        with_defaults: bool,
    ) -> Result<NodeId, TreeError> {
        if !self.implementations(slot)?.contains(&signature.declaring_type) {
            return Err(TreeError::NotAnImplementation(signature.declaring_type.clone()));
        }
        let constructor = self
            .catalog
            .resolve_constructor(signature)
            .ok_or_else(|| TreeError::UnresolvedConstructor(signature.clone()))?;
        let id = self.insert_constructor(slot, constructor);
        if with_defaults {
            let mut path = vec![signature.declaring_type.clone()];
            for param in self.children(id).to_vec() {
                self.apply_defaults(param, &mut path);
            }
        }
        self.recompute_configured();
        Ok(id)
    }

    /// Insert a constructor node with one fresh slot per parameter
    pub(crate) fn insert_constructor(&mut self, slot: NodeId, constructor: Constructor) -> NodeId {
        let params = constructor.params().to_vec();
        tracing::debug!("adding constructor {} under {}", constructor.signature(), slot);
        let id = self.insert(
            Some(slot),
            NodeKind::ConstructorChoice(ConstructorChoice::new(constructor)),
        );
        for param in params {
            let child = self.insert(
                Some(id),
                NodeKind::ClassChoice(ClassChoice {
                    declared: param.ty.clone(),
                    param: Some(param),
                }),
            );
            self.init_slot(child);
        }
        id
    }

    /// Parse literal text into leaf alternatives of a slot
    ///
    /// Values already present are not duplicated; the returned handles are
    /// the newly added leaves.
    ///
    /// # Errors
    /// Returns [`TreeError`] if the slot does not take literal text or the
    /// text does not parse.
    pub fn add_literal(&mut self, slot: NodeId, text: &str) -> Result<Vec<NodeId>, TreeError> {
        let declared = self.slot(slot)?.declared.clone();
        let literals = self.parse_for(slot, &declared, text)?;
        let added: Vec<NodeId> = literals
            .into_iter()
            .filter_map(|lit| self.push_leaf(slot, lit))
            .collect();
        self.recompute_configured();
        Ok(added)
    }

    /// Add one value as a leaf alternative of a slot
    ///
    /// Returns the existing leaf when an equal value is already present.
    ///
    /// # Errors
    /// Returns [`TreeError::Incompatible`] if the value does not fit the slot.
    pub fn add_value(&mut self, slot: NodeId, value: Literal) -> Result<NodeId, TreeError> {
        let declared = self.slot(slot)?.declared.clone();
        self.check_value(slot, &declared, &value)?;
        let id = match self.push_leaf(slot, value.clone()) {
            Some(id) => id,
            None => self
                .children(slot)
                .iter()
                .copied()
                .find(|c| matches!(self.node(*c).map(|n| &n.kind), Some(NodeKind::LeafValue(l)) if *l == value))
                .ok_or(TreeError::UnknownNode(slot))?,
        };
        self.recompute_configured();
        Ok(id)
    }

    fn push_leaf(&mut self, slot: NodeId, literal: Literal) -> Option<NodeId> {
        let duplicate = self.children(slot).iter().any(|c| {
            matches!(self.node(*c).map(|n| &n.kind), Some(NodeKind::LeafValue(l)) if *l == literal)
        });
        if duplicate {
            return None;
        }
        Some(self.insert(Some(slot), NodeKind::LeafValue(literal)))
    }

    fn parse_for(&self, slot: NodeId, declared: &ParamType, text: &str) -> Result<Vec<Literal>, TreeError> {
        match declared {
            ParamType::Primitive(kind) => Ok(parse_literal(*kind, text)?),
            ParamType::ClassLiteral(bound) => text
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(|name| {
                    let ty = TypeName::new(name);
                    if self.catalog.contains(&ty) && self.catalog.is_assignable(&ty, bound) {
                        Ok(Literal::Class(ty))
                    } else {
                        Err(TreeError::Incompatible {
                            slot,
                            declared: declared.clone(),
                            what: format!("type {name}"),
                        })
                    }
                })
                .collect(),
            ParamType::Enum(ty) => text
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(|name| {
                    let literal = Literal::Enum {
                        ty: ty.clone(),
                        constant: name.to_string(),
                    };
                    self.check_value(slot, declared, &literal).map(|()| literal)
                })
                .collect(),
            ParamType::Object(_) | ParamType::Array(_) => Err(TreeError::Incompatible {
                slot,
                declared: declared.clone(),
                what: format!("literal text '{text}'"),
            }),
        }
    }

    fn check_value(&self, slot: NodeId, declared: &ParamType, value: &Literal) -> Result<(), TreeError> {
        let fits = match (declared, value) {
            (_, Literal::Null) => declared.accepts_null(),
            (ParamType::Primitive(PrimitiveKind::Bool), Literal::Bool(_))
            | (ParamType::Primitive(PrimitiveKind::Char), Literal::Char(_))
            | (ParamType::Primitive(PrimitiveKind::Str), Literal::Str(_)) => true,
            (ParamType::Primitive(kind), Literal::Int(i)) if kind.is_integer() => {
                parse_literal(*kind, &i.to_string()).is_ok()
            }
            (ParamType::Primitive(kind), Literal::Float(_)) => kind.is_float(),
            (ParamType::Enum(ty), Literal::Enum { ty: value_ty, constant }) => {
                ty == value_ty
                    && self
                        .catalog
                        .enum_constants(ty)
                        .is_some_and(|constants| constants.iter().any(|c| c == constant))
            }
            (ParamType::ClassLiteral(bound), Literal::Class(ty)) => {
                self.catalog.contains(ty) && self.catalog.is_assignable(ty, bound)
            }
            _ => false,
        };
        if fits {
            Ok(())
        } else {
            Err(TreeError::Incompatible {
                slot,
                declared: declared.clone(),
                what: value.to_string(),
            })
        }
    }

    /// Add an empty array instance to an array slot
    ///
    /// Arrays of primitives, strings and type literals are typable and take
    /// their values from [`set_array_literal`](Self::set_array_literal);
    /// other arrays take element slots from
    /// [`add_array_element`](Self::add_array_element).
    ///
    /// # Errors
    /// Returns [`TreeError::Incompatible`] if the slot is not an array slot.
    pub fn add_array(&mut self, slot: NodeId) -> Result<NodeId, TreeError> {
        let declared = self.slot(slot)?.declared.clone();
        let ParamType::Array(element) = declared else {
            return Err(TreeError::Incompatible {
                slot,
                declared,
                what: "an array".to_string(),
            });
        };
        let layout = if element.is_typable() {
            ArrayLayout::Typable {
                text: String::new(),
                values: Vec::new(),
            }
        } else {
            ArrayLayout::Object
        };
        let id = self.insert(
            Some(slot),
            NodeKind::ArrayChoice(ArrayChoice {
                element: *element,
                layout,
            }),
        );
        self.recompute_configured();
        Ok(id)
    }

    /// Replace the values of a typable array
    ///
    /// # Errors
    /// Returns [`TreeError`] if `array` is not a typable array or the text
    /// does not parse.
    pub fn set_array_literal(&mut self, array: NodeId, text: &str) -> Result<(), TreeError> {
        let node = self.get(array)?;
        let element = match &node.kind {
            NodeKind::ArrayChoice(ArrayChoice {
                element,
                layout: ArrayLayout::Typable { .. },
            }) => element.clone(),
            other => {
                return Err(TreeError::WrongKind {
                    node: array,
                    expected: "typable ArrayChoice",
                    found: other.variant_name(),
                })
            }
        };
        let values = self.parse_for(array, &element, text)?;
        if let NodeKind::ArrayChoice(ArrayChoice { layout, .. }) = &mut self.get_mut(array)?.kind {
            *layout = ArrayLayout::Typable {
                text: text.to_string(),
                values,
            };
        }
        self.recompute_configured();
        Ok(())
    }

    /// Append an element slot to an object array
    ///
    /// # Errors
    /// Returns [`TreeError::WrongKind`] if `array` is not an object array.
    pub fn add_array_element(&mut self, array: NodeId) -> Result<NodeId, TreeError> {
        let node = self.get(array)?;
        let element = match &node.kind {
            NodeKind::ArrayChoice(ArrayChoice {
                element,
                layout: ArrayLayout::Object,
            }) => element.clone(),
            other => {
                return Err(TreeError::WrongKind {
                    node: array,
                    expected: "object ArrayChoice",
                    found: other.variant_name(),
                })
            }
        };
        let id = self.insert(
            Some(array),
            NodeKind::ClassChoice(ClassChoice {
                declared: element,
                param: None,
            }),
        );
        self.init_slot(id);
        self.recompute_configured();
        Ok(id)
    }

    /// Add a shared pointer to a configured constructor as an alternative of a slot
    ///
    /// # Errors
    /// Returns [`TreeError`] if the target is not a configured constructor,
    /// its type is not offered for the slot, or the pointer would create a cycle.
    pub fn add_pointer(&mut self, slot: NodeId, target: NodeId) -> Result<NodeId, TreeError> {
        let offered = self.implementations(slot)?;
        let target_node = self.get(target)?;
        let constructor = target_node
            .as_constructor()
            .ok_or(AliasError::NotAConstructor(target))?;
        if !target_node.is_configured() {
            return Err(TreeError::WrongKind {
                node: target,
                expected: "configured ConstructorChoice",
                found: "unconfigured ConstructorChoice",
            });
        }
        let ty = constructor.constructor.declaring_type().clone();
        if !offered.contains(&ty) {
            return Err(TreeError::NotAnImplementation(ty));
        }
        if self.reaches(target, slot) {
            return Err(AliasError::WouldCreateCycle { slot, target }.into());
        }
        let id = self.insert(
            Some(slot),
            NodeKind::Pointer(Pointer {
                target,
                cartesian: false,
            }),
        );
        if let NodeKind::ConstructorChoice(c) = &mut self.get_mut(target)?.kind {
            c.aliases.push(id);
        }
        tracing::debug!("pointer {} now aliases {}", id, target);
        self.recompute_configured();
        Ok(id)
    }

    /// Switch a pointer between shared and cartesian mode
    ///
    /// # Errors
    /// Returns [`TreeError::WrongKind`] if `pointer` is not a pointer.
    pub fn set_cartesian(&mut self, pointer: NodeId, cartesian: bool) -> Result<(), TreeError> {
        let node = self.get_mut(pointer)?;
        match &mut node.kind {
            NodeKind::Pointer(p) => {
                p.cartesian = cartesian;
                Ok(())
            }
            other => Err(TreeError::WrongKind {
                node: pointer,
                expected: "Pointer",
                found: other.variant_name(),
            }),
        }
    }

    /// Deep-copy a constructor subtree as a new alternative of the same slot
    ///
    /// Pointers inside the copy that target nodes inside the source subtree
    /// are redirected to the copies; other pointers keep their targets.
    ///
    /// # Errors
    /// Returns [`TreeError`] if `constructor` is not a constructor choice.
    pub fn copy_constructor(&mut self, constructor: NodeId) -> Result<NodeId, TreeError> {
        let node = self.get(constructor)?;
        if node.as_constructor().is_none() {
            return Err(TreeError::WrongKind {
                node: constructor,
                expected: "ConstructorChoice",
                found: node.kind.variant_name(),
            });
        }
        let parent = node.parent.ok_or(TreeError::UnknownNode(constructor))?;
        let copy = alias::copy_within(self, &[constructor], parent)?;
        self.recompute_configured();
        copy.first()
            .copied()
            .ok_or(TreeError::UnknownNode(constructor))
    }

    /// Remove a node and its subtree
    ///
    /// Pointers aliasing removed constructors are detached.
    ///
    /// # Errors
    /// Returns [`TreeError`] for the root or unknown nodes.
    pub fn remove(&mut self, id: NodeId) -> Result<(), TreeError> {
        if id == self.root {
            return Err(TreeError::RemoveRoot);
        }
        self.get(id)?;
        tracing::debug!("removing {} ({})", id, self.describe(id));
        self.remove_subtree(id);
        self.recompute_configured();
        Ok(())
    }

    /// Remove every child of a node; typable arrays lose their values
    ///
    /// # Errors
    /// Returns [`TreeError::UnknownNode`] for unknown nodes.
    pub fn clear(&mut self, id: NodeId) -> Result<(), TreeError> {
        let node = self.get_mut(id)?;
        if let NodeKind::ArrayChoice(ArrayChoice { layout: layout @ ArrayLayout::Typable { .. }, .. }) = &mut node.kind {
            *layout = ArrayLayout::Typable {
                text: String::new(),
                values: Vec::new(),
            };
        }
        for child in self.children(id).to_vec() {
            self.remove_subtree(child);
        }
        self.recompute_configured();
        Ok(())
    }
}

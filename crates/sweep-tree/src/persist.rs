//! Persistence
//!
//! Trees are stored as a versioned JSON [`TreeDocument`]. Constructor nodes
//! are stored by signature rather than by handle so a document can be loaded
//! against a catalog that changed since it was saved; each one also carries a
//! document-local key that pointers refer to.
//!
//! Loading never fails because a constructor went away: the constructor's
//! subtree and every pointer to it are pruned, logged and listed in the
//! returned [`LoadReport`].

use crate::error::{AliasError, PersistError};
use crate::node::{ArrayChoice, ArrayLayout, ClassChoice, ConstructorChoice, NodeId, NodeKind, Pointer};
use crate::tree::{ConfigurationTree, TreeOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use sweep_core::{ConstructorSignature, Literal, ParamSpec, ParamType, TypeCatalog, TypeName};

/// Document format this build reads and writes
pub const FORMAT_VERSION: u32 = 1;

/// Serialized tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeDocument {
    /// Format version
    pub format_version: u32,
    /// Declared root type
    pub root_type: TypeName,
    /// Tree options
    #[serde(default)]
    pub options: TreeOptions,
    /// Root slot
    pub root: PersistedNode,
}

/// Serialized node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PersistedNode {
    /// Parameter slot
    ClassChoice {
        /// Declared type
        declared: ParamType,
        /// Parameter annotations
        #[serde(default, skip_serializing_if = "Option::is_none")]
        param: Option<ParamSpec>,
        /// Alternatives
        #[serde(default)]
        children: Vec<PersistedNode>,
    },
    /// Bound constructor
    ConstructorChoice {
        /// Document-local key referenced by pointers
        key: u32,
        /// Constructor to resolve on load
        signature: ConstructorSignature,
        /// Parameter slots
        #[serde(default)]
        children: Vec<PersistedNode>,
    },
    /// Primitive array parsed from text
    TypableArray {
        /// Element type
        element: ParamType,
        /// Literal text
        text: String,
        /// Parsed values
        values: Vec<Literal>,
    },
    /// Array of object element slots
    ObjectArray {
        /// Element type
        element: ParamType,
        /// Element slots
        #[serde(default)]
        children: Vec<PersistedNode>,
    },
    /// Terminal value
    LeafValue {
        /// Value
        value: Literal,
    },
    /// Alias of a constructor
    Pointer {
        /// Key of the aliased constructor
        target: u32,
        /// Cartesian mode
        #[serde(default)]
        cartesian: bool,
    },
    /// Unresolvable slot marker
    ErrorNode {
        /// Reason
        message: String,
    },
}

/// Incompatibilities recovered while loading
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Constructors that no longer resolve, pruned with their subtrees
    pub pruned: Vec<ConstructorSignature>,
    /// Pointers dropped because their target was pruned or missing, or
    /// because they would make the tree cyclic
    pub dropped_pointers: usize,
}

impl LoadReport {
    /// Check if the document loaded without pruning
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.pruned.is_empty() && self.dropped_pointers == 0
    }
}

impl ConfigurationTree {
    /// Convert to a document
    ///
    /// # Errors
    /// Returns [`AliasError`] if a pointer refers to a missing node or to a
    /// node that is not a constructor.
    pub fn to_document(&self) -> Result<TreeDocument, AliasError> {
        Ok(TreeDocument {
            format_version: FORMAT_VERSION,
            root_type: self.root_type.clone(),
            options: self.options.clone(),
            root: self.persist_node(self.root)?,
        })
    }

    fn persist_node(&self, id: NodeId) -> Result<PersistedNode, AliasError> {
        let Some(node) = self.node(id) else {
            return Ok(PersistedNode::ErrorNode {
                message: format!("missing node {id}"),
            });
        };
        let children = || {
            node.children
                .iter()
                .map(|c| self.persist_node(*c))
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(match &node.kind {
            NodeKind::ClassChoice(choice) => PersistedNode::ClassChoice {
                declared: choice.declared.clone(),
                param: choice.param.clone(),
                children: children()?,
            },
            NodeKind::ConstructorChoice(c) => PersistedNode::ConstructorChoice {
                key: id.0,
                signature: c.signature().clone(),
                children: children()?,
            },
            NodeKind::ArrayChoice(array) => match &array.layout {
                ArrayLayout::Typable { text, values } => PersistedNode::TypableArray {
                    element: array.element.clone(),
                    text: text.clone(),
                    values: values.clone(),
                },
                ArrayLayout::Object => PersistedNode::ObjectArray {
                    element: array.element.clone(),
                    children: children()?,
                },
            },
            NodeKind::LeafValue(literal) => PersistedNode::LeafValue {
                value: literal.clone(),
            },
            NodeKind::Pointer(pointer) => {
                match self.node(pointer.target) {
                    Some(target) if target.as_constructor().is_some() => {}
                    Some(_) => return Err(AliasError::NotAConstructor(pointer.target)),
                    None => {
                        return Err(AliasError::DanglingTarget {
                            pointer: id,
                            target: pointer.target,
                        })
                    }
                }
                PersistedNode::Pointer {
                    target: pointer.target.0,
                    cartesian: pointer.cartesian,
                }
            }
            NodeKind::ErrorNode(message) => PersistedNode::ErrorNode {
                message: message.clone(),
            },
        })
    }

    /// Write the tree to `path` as pretty-printed JSON
    ///
    /// # Errors
    /// Returns [`PersistError`] on I/O or serialization failure.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.to_document()?)?;
        std::fs::write(path, json)?;
        tracing::info!("saved {} to {}", self.root_type, path.display());
        Ok(())
    }

    /// Read a tree from `path`, resolving constructors against `catalog`
    ///
    /// # Errors
    /// Returns [`PersistError`] on I/O failure, malformed JSON or an
    /// unsupported format version.
    pub fn load(
        path: impl AsRef<Path>,
        catalog: Arc<dyn TypeCatalog>,
    ) -> Result<(Self, LoadReport), PersistError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let document: TreeDocument = serde_json::from_str(&text)?;
        let (tree, report) = Self::from_document(document, catalog)?;
        tracing::info!(
            "loaded {} from {} ({} nodes, {} pruned)",
            tree.root_type,
            path.display(),
            tree.len(),
            report.pruned.len()
        );
        Ok((tree, report))
    }

    /// Rebuild a tree from a document
    ///
    /// # Errors
    /// Returns [`PersistError::UnsupportedVersion`] for documents of another
    /// format version.
    pub fn from_document(
        document: TreeDocument,
        catalog: Arc<dyn TypeCatalog>,
    ) -> Result<(Self, LoadReport), PersistError> {
        if document.format_version != FORMAT_VERSION {
            return Err(PersistError::UnsupportedVersion {
                found: document.format_version,
                expected: FORMAT_VERSION,
            });
        }
        let mut loader = Loader {
            tree: Self::detached(document.root_type, catalog, document.options),
            keys: HashMap::new(),
            pointers: Vec::new(),
            report: LoadReport::default(),
        };
        let root = match document.root {
            root @ PersistedNode::ClassChoice { .. } => loader.build(None, root),
            _ => {
                tracing::warn!("document root is not a slot; starting empty");
                None
            }
        };
        let mut tree = match root {
            Some(root) => {
                loader.tree.root = root;
                loader.link_pointers();
                loader.tree
            }
            None => {
                let fresh = Self::with_options(
                    loader.tree.root_type.clone(),
                    loader.tree.catalog.clone(),
                    loader.tree.options.clone(),
                );
                return Ok((fresh, loader.report));
            }
        };
        tree.recompute_configured();
        Ok((tree, loader.report))
    }
}

struct Loader {
    tree: ConfigurationTree,
    /// Document key to rebuilt constructor
    keys: HashMap<u32, NodeId>,
    /// Rebuilt pointer nodes with the key they refer to
    pointers: Vec<(NodeId, u32)>,
    report: LoadReport,
}

impl Loader {
    /// Rebuild `node` under `parent`; `None` when the node was pruned
    fn build(&mut self, parent: Option<NodeId>, node: PersistedNode) -> Option<NodeId> {
        match node {
            PersistedNode::ClassChoice {
                declared,
                param,
                children,
            } => {
                let id = self
                    .tree
                    .insert(parent, NodeKind::ClassChoice(ClassChoice { declared, param }));
                for child in children {
                    self.build(Some(id), child);
                }
                Some(id)
            }
            PersistedNode::ConstructorChoice {
                key,
                signature,
                children,
            } => {
                let resolved = self
                    .tree
                    .catalog
                    .resolve_constructor(&signature)
                    .filter(|c| c.params().len() == children.len());
                let Some(constructor) = resolved else {
                    tracing::warn!("pruning unresolvable constructor {}", signature);
                    self.report.pruned.push(signature);
                    return None;
                };
                let id = self.tree.insert(
                    parent,
                    NodeKind::ConstructorChoice(ConstructorChoice::new(constructor)),
                );
                self.keys.insert(key, id);
                for child in children {
                    self.build(Some(id), child);
                }
                Some(id)
            }
            PersistedNode::TypableArray {
                element,
                text,
                values,
            } => Some(self.tree.insert(
                parent,
                NodeKind::ArrayChoice(ArrayChoice {
                    element,
                    layout: ArrayLayout::Typable { text, values },
                }),
            )),
            PersistedNode::ObjectArray { element, children } => {
                let id = self.tree.insert(
                    parent,
                    NodeKind::ArrayChoice(ArrayChoice {
                        element,
                        layout: ArrayLayout::Object,
                    }),
                );
                for child in children {
                    self.build(Some(id), child);
                }
                Some(id)
            }
            PersistedNode::LeafValue { value } => {
                Some(self.tree.insert(parent, NodeKind::LeafValue(value)))
            }
            PersistedNode::Pointer { target, cartesian } => {
                // retargeted once every constructor has been rebuilt
                let id = self.tree.insert(
                    parent,
                    NodeKind::Pointer(Pointer {
                        target: NodeId(u32::MAX),
                        cartesian,
                    }),
                );
                self.pointers.push((id, target));
                Some(id)
            }
            PersistedNode::ErrorNode { message } => {
                Some(self.tree.insert(parent, NodeKind::ErrorNode(message)))
            }
        }
    }

    fn link_pointers(&mut self) {
        for (pointer, key) in std::mem::take(&mut self.pointers) {
            let Some(target) = self.keys.get(&key).copied() else {
                tracing::warn!("dropping pointer {} to pruned constructor {}", pointer, key);
                self.drop_pointer(pointer);
                continue;
            };
            let slot = self.tree.node(pointer).and_then(|n| n.parent);
            if slot.is_some_and(|slot| self.tree.reaches(target, slot)) {
                tracing::warn!("dropping pointer {} to {}: it would close a cycle", pointer, key);
                self.drop_pointer(pointer);
                continue;
            }
            if let Some(NodeKind::Pointer(p)) = self
                .tree
                .nodes
                .get_mut(pointer.index())
                .and_then(Option::as_mut)
                .map(|n| &mut n.kind)
            {
                p.target = target;
            }
            if let Some(NodeKind::ConstructorChoice(c)) = self
                .tree
                .nodes
                .get_mut(target.index())
                .and_then(Option::as_mut)
                .map(|n| &mut n.kind)
            {
                c.aliases.push(pointer);
            }
        }
    }

    fn drop_pointer(&mut self, pointer: NodeId) {
        self.tree.unlink(pointer);
        self.tree.nodes[pointer.index()] = None;
        self.report.dropped_pointers += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ChoiceNode;
    use sweep_core::{ClassRegistry, Constructor, Instance, TypeDecl, Value};

    fn unit(_: &[Value]) -> Result<Value, sweep_core::ConstructError> {
        Ok(Value::Object(Instance::new("any", ())))
    }

    fn catalog() -> Arc<ClassRegistry> {
        let mut registry = ClassRegistry::new();
        registry.add_constructor(Constructor::new(
            "Cell",
            vec![ParamSpec::new("n", ParamType::int())],
            unit,
        ));
        Arc::new(registry)
    }

    fn cell_tree() -> ConfigurationTree {
        let mut tree = ConfigurationTree::new("Cell", catalog());
        let sig = ConstructorSignature::new("Cell", vec![ParamType::int()]);
        let ctor = tree.add_constructor(tree.root(), &sig, false).unwrap();
        tree.add_literal(tree.children(ctor)[0], "1:3").unwrap();
        tree
    }

    #[test]
    fn document_round_trip() {
        let tree = cell_tree();
        let document = tree.to_document().unwrap();
        let json = serde_json::to_string(&document).unwrap();
        let parsed: TreeDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, document);

        let (loaded, report) = ConfigurationTree::from_document(parsed, catalog()).unwrap();
        assert!(report.is_clean());
        assert!(loaded.is_ready());
        assert_eq!(loaded.total_combinations(), 3);
    }

    #[test]
    fn newer_format_rejected() {
        let mut document = cell_tree().to_document().unwrap();
        document.format_version = FORMAT_VERSION + 1;
        let err = ConfigurationTree::from_document(document, catalog()).unwrap_err();
        assert!(matches!(err, PersistError::UnsupportedVersion { .. }));
    }

    fn shape_catalog() -> Arc<ClassRegistry> {
        let mut registry = ClassRegistry::new();
        registry.register(TypeDecl::interface("Shape"));
        registry.register(TypeDecl::class("Box").implements("Shape"));
        registry.register(TypeDecl::class("Dot").implements("Shape"));
        registry.add_constructor(Constructor::new(
            "Box",
            vec![ParamSpec::new("inner", ParamType::object("Shape"))],
            unit,
        ));
        registry.add_constructor(Constructor::new("Dot", vec![], unit));
        Arc::new(registry)
    }

    /// Box(inner = Dot) with an extra pointer from `inner` back to the Box
    fn self_referencing_document(cartesian: bool) -> TreeDocument {
        let mut tree = ConfigurationTree::new("Shape", shape_catalog());
        let boxed = ConstructorSignature::new("Box", vec![ParamType::object("Shape")]);
        let outer = tree.add_constructor(tree.root(), &boxed, false).unwrap();
        let inner = tree.children(outer)[0];
        tree.add_constructor(inner, &ConstructorSignature::new("Dot", vec![]), false)
            .unwrap();
        let mut document = tree.to_document().unwrap();

        let PersistedNode::ClassChoice { children, .. } = &mut document.root else {
            panic!("root is not a slot");
        };
        let PersistedNode::ConstructorChoice { key, children, .. } = &mut children[0] else {
            panic!("first alternative is not a constructor");
        };
        let target = *key;
        let PersistedNode::ClassChoice { children, .. } = &mut children[0] else {
            panic!("parameter is not a slot");
        };
        children.push(PersistedNode::Pointer { target, cartesian });
        document
    }

    #[test]
    fn cyclic_pointer_dropped() {
        for cartesian in [false, true] {
            let document = self_referencing_document(cartesian);
            let (loaded, report) =
                ConfigurationTree::from_document(document, shape_catalog()).unwrap();
            assert_eq!(report.dropped_pointers, 1);
            assert!(report.pruned.is_empty());
            assert!(loaded
                .node_ids()
                .all(|id| loaded.node(id).and_then(ChoiceNode::as_pointer).is_none()));
            assert!(loaded.is_ready());
            assert_eq!(loaded.total_combinations(), 1);
            assert_eq!(loaded.enumerate().unwrap().count(), 1);
        }
    }

    #[test]
    fn missing_constructor_pruned() {
        let document = cell_tree().to_document().unwrap();
        let (loaded, report) =
            ConfigurationTree::from_document(document, Arc::new(ClassRegistry::new())).unwrap();
        assert_eq!(report.pruned.len(), 1);
        assert!(!loaded.is_ready());
        assert!(loaded.children(loaded.root()).is_empty());
    }
}

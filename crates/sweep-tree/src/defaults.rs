//! Default population
//!
//! Pre-fills a slot from its parameter annotations. Object slots pick an
//! implementation (the annotated default class, else the only candidate) and
//! then a constructor, in order of preference:
//!
//! 1. with both a default text and a default class, a one-parameter
//!    constructor taking `int`, `double`, `long` or `String` that accepts the text
//! 2. the no-argument constructor
//! 3. a constructor marked default, or one whose parameters all carry defaults
//! 4. the only constructor
//!
//! A default of `"null"` adds a null leaf wherever null is accepted.

use crate::node::NodeId;
use crate::tree::ConfigurationTree;
use sweep_core::{parse_literal, Constructor, Literal, ParamType, PrimitiveKind, TypeName};

const NULL_TEXT: &str = "null";

impl ConfigurationTree {
    /// Fill `slot` from its annotations
    ///
    /// `path` holds the types being defaulted above this slot; a type is never
    /// defaulted inside itself. Failures are logged and leave the slot as is.
    pub(crate) fn apply_defaults(&mut self, slot: NodeId, path: &mut Vec<TypeName>) {
        let Ok(choice) = self.slot(slot) else {
            return;
        };
        let declared = choice.declared.clone();
        let param = choice.param.clone();
        let default = param.as_ref().and_then(|p| p.default.clone());
        let default_class = param.as_ref().and_then(|p| p.default_class.clone());

        if default.as_deref() == Some(NULL_TEXT) && declared.accepts_null() {
            if let Err(e) = self.add_value(slot, Literal::Null) {
                tracing::debug!("null default rejected for {}: {}", slot, e);
            }
            return;
        }

        match &declared {
            ParamType::Primitive(_) | ParamType::Enum(_) | ParamType::ClassLiteral(_) => {
                if let Some(text) = default {
                    if let Err(e) = self.add_literal(slot, &text) {
                        tracing::debug!("default '{}' rejected for {}: {}", text, slot, e);
                    }
                }
            }
            ParamType::Array(_) => {}
            ParamType::Object(_) => {
                self.default_object(slot, default.as_deref(), default_class, path);
            }
        }
    }

    fn default_object(
        &mut self,
        slot: NodeId,
        default: Option<&str>,
        default_class: Option<TypeName>,
        path: &mut Vec<TypeName>,
    ) {
        let Ok(offered) = self.implementations(slot) else {
            return;
        };
        let chosen = match default_class.clone() {
            Some(ty) if offered.contains(&ty) => ty,
            _ if offered.len() == 1 => match offered.into_iter().next() {
                Some(ty) => ty,
                None => return,
            },
            _ => return,
        };
        if path.contains(&chosen) {
            tracing::debug!("not defaulting {} inside itself", chosen);
            return;
        }
        let constructors = self.catalog.constructors(&chosen);
        let Some((constructor, argument)) =
            pick_constructor(&constructors, default.filter(|_| default_class.is_some()))
        else {
            tracing::debug!("no default constructor for {}", chosen);
            return;
        };

        let id = self.insert_constructor(slot, constructor);
        let params = self.children(id).to_vec();
        match argument {
            Some(text) => {
                if let Some(first) = params.first() {
                    if let Err(e) = self.add_literal(*first, &text) {
                        tracing::debug!("default argument '{}' rejected: {}", text, e);
                    }
                }
            }
            None => {
                path.push(chosen);
                for param in params {
                    self.apply_defaults(param, path);
                }
                path.pop();
            }
        }
        self.recompute_configured();
    }
}

/// Choose a constructor; the second element is literal text for its single parameter
fn pick_constructor(constructors: &[Constructor], text: Option<&str>) -> Option<(Constructor, Option<String>)> {
    if let Some(text) = text {
        for kind in [PrimitiveKind::Int, PrimitiveKind::Double, PrimitiveKind::Long, PrimitiveKind::Str] {
            let accepts = parse_literal(kind, text).is_ok();
            let single = constructors.iter().find(|c| {
                c.params().len() == 1 && c.params()[0].ty == ParamType::Primitive(kind)
            });
            if let (true, Some(c)) = (accepts, single) {
                return Some((c.clone(), Some(text.to_string())));
            }
        }
    }
    constructors
        .iter()
        .find(|c| c.params().is_empty())
        .or_else(|| {
            constructors
                .iter()
                .find(|c| c.is_default() || c.all_params_defaulted())
        })
        .or_else(|| match constructors {
            [only] => Some(only),
            _ => None,
        })
        .map(|c| (c.clone(), None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;
    use std::sync::Arc;
    use sweep_core::{
        ClassRegistry, ConstructorSignature, Instance, ParamSpec, TypeCatalog, TypeDecl, Value,
    };

    fn unit(_: &[Value]) -> Result<Value, sweep_core::ConstructError> {
        Ok(Value::Object(Instance::new("any", ())))
    }

    fn catalog() -> Arc<ClassRegistry> {
        let mut registry = ClassRegistry::new();
        registry.register(TypeDecl::interface("Metric"));
        registry.register(TypeDecl::class("Distance").implements("Metric"));
        registry.register(TypeDecl::class("Hops").implements("Metric"));
        registry.add_constructor(Constructor::new(
            "Distance",
            vec![ParamSpec::new("meters", ParamType::double())],
            unit,
        ));
        registry.add_constructor(Constructor::new("Hops", vec![], unit));
        registry.add_constructor(Constructor::new(
            "Router",
            vec![
                ParamSpec::new("ports", ParamType::int()).with_default("4"),
                ParamSpec::new("metric", ParamType::object("Metric"))
                    .with_default("2.5")
                    .with_default_class("Distance"),
                ParamSpec::new("fallback", ParamType::object("Metric")).with_default("null"),
                ParamSpec::new("name", ParamType::string()),
            ],
            unit,
        ));
        Arc::new(registry)
    }

    fn router() -> ConstructorSignature {
        ConstructorSignature::new(
            "Router",
            vec![
                ParamType::int(),
                ParamType::object("Metric"),
                ParamType::object("Metric"),
                ParamType::string(),
            ],
        )
    }

    #[test]
    fn defaults_fill_annotated_params() {
        let mut tree = ConfigurationTree::new("Router", catalog());
        let ctor = tree.add_constructor(tree.root(), &router(), true).unwrap();
        let params = tree.children(ctor).to_vec();

        let ports = tree.children(params[0]);
        assert_eq!(ports.len(), 1);
        assert!(matches!(
            tree.node(ports[0]).map(|n| n.kind()),
            Some(NodeKind::LeafValue(Literal::Int(4)))
        ));

        let metric = tree.children(params[1]);
        assert_eq!(metric.len(), 1);
        let distance = tree.node(metric[0]).and_then(|n| n.as_constructor()).unwrap();
        assert_eq!(distance.signature().declaring_type.as_str(), "Distance");
        let meters = tree.children(tree.children(metric[0])[0]);
        assert!(matches!(
            tree.node(meters[0]).map(|n| n.kind()),
            Some(NodeKind::LeafValue(Literal::Float(x))) if (*x - 2.5).abs() < f64::EPSILON
        ));

        let fallback = tree.children(params[2]);
        assert!(matches!(
            tree.node(fallback[0]).map(|n| n.kind()),
            Some(NodeKind::LeafValue(Literal::Null))
        ));

        // no default for the name, so the tree is not ready yet
        assert!(tree.children(params[3]).is_empty());
        assert!(!tree.is_ready());
    }

    #[test]
    fn no_arg_constructor_preferred() {
        let ctors = catalog().constructors(&"Hops".into());
        let (picked, arg) = pick_constructor(&ctors, None).unwrap();
        assert!(picked.params().is_empty());
        assert!(arg.is_none());
    }

    #[test]
    fn only_constructor_as_last_resort() {
        let ctors = catalog().constructors(&"Distance".into());
        let (picked, arg) = pick_constructor(&ctors, None).unwrap();
        assert_eq!(picked.params().len(), 1);
        assert!(arg.is_none());
    }

    #[test]
    fn ambiguous_slot_left_empty() {
        let mut registry = ClassRegistry::new();
        registry.register(TypeDecl::interface("Metric"));
        registry.add_constructor(Constructor::new("Hops", vec![], unit));
        registry.register(TypeDecl::class("Hops").implements("Metric"));
        registry.add_constructor(Constructor::new("Cost", vec![], unit));
        registry.register(TypeDecl::class("Cost").implements("Metric"));
        registry.add_constructor(Constructor::new(
            "Holder",
            vec![ParamSpec::new("metric", ParamType::object("Metric"))],
            unit,
        ));
        let mut tree = ConfigurationTree::new("Holder", Arc::new(registry));
        let sig = ConstructorSignature::new("Holder", vec![ParamType::object("Metric")]);
        let ctor = tree.add_constructor(tree.root(), &sig, true).unwrap();
        assert!(tree.children(tree.children(ctor)[0]).is_empty());
    }
}

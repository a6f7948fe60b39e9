//! Demo catalog
//!
//! A small routing study used by the CLI: every `Experiment` pairs a network
//! topology with a routing scheme and a list of offered loads.
//!
//! ```text
//! Experiment(Topology topology, Routing routing, double[] loads)
//!   Topology: Ring(int size) | Mesh(int rows, int cols)
//!   Routing:  ShortestPath() | Flooding(int ttl)
//! ```
//!
//! Flooding with a TTL larger than the network is not a meaningful
//! experiment and is skipped.

use std::sync::Arc;
use sweep_core::{
    ClassRegistry, ConstructError, Constructor, ConstructorSignature, Instance, ParamSpec, ParamType, TypeDecl,
    Value,
};
use sweep_tree::{ConfigurationTree, TreeError};

/// Root type of the demo tree
pub const EXPERIMENT: &str = "demo.Experiment";

/// Network topology
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topology {
    /// Ring of `size` nodes
    Ring {
        /// Node count
        size: i64,
    },
    /// Grid of `rows` x `cols` nodes
    Mesh {
        /// Row count
        rows: i64,
        /// Column count
        cols: i64,
    },
}

impl Topology {
    /// Number of nodes
    #[must_use]
    pub fn node_count(&self) -> i64 {
        match self {
            Self::Ring { size } => *size,
            Self::Mesh { rows, cols } => rows * cols,
        }
    }
}

/// Routing scheme
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routing {
    /// Dijkstra over hop count
    ShortestPath,
    /// Flooding with a hop limit
    Flooding {
        /// Hop limit
        ttl: i64,
    },
}

/// Realized demo experiment
#[derive(Debug, Clone, PartialEq)]
pub struct Experiment {
    /// Network
    pub topology: Topology,
    /// Routing scheme
    pub routing: Routing,
    /// Offered loads
    pub loads: Vec<f64>,
}

fn int(args: &[Value], index: usize, ty: &str) -> Result<i64, ConstructError> {
    args.get(index)
        .and_then(Value::as_int)
        .ok_or_else(|| ConstructError::failed(ty, format!("argument {index} is not an int")))
}

fn positive(value: i64, ty: &str, what: &str) -> Result<i64, ConstructError> {
    if value > 0 {
        Ok(value)
    } else {
        Err(ConstructError::failed(ty, format!("{what} must be positive, got {value}")))
    }
}

/// Catalog of the demo types
#[must_use]
pub fn demo_catalog() -> Arc<ClassRegistry> {
    let mut registry = ClassRegistry::new();
    registry.register(TypeDecl::interface("demo.Topology"));
    registry.register(TypeDecl::interface("demo.Routing"));
    registry.register(TypeDecl::class("demo.Ring").implements("demo.Topology"));
    registry.register(TypeDecl::class("demo.Mesh").implements("demo.Topology"));
    registry.register(TypeDecl::class("demo.ShortestPath").implements("demo.Routing"));
    registry.register(TypeDecl::class("demo.Flooding").implements("demo.Routing"));

    registry.add_constructor(Constructor::new(
        "demo.Ring",
        vec![ParamSpec::new("size", ParamType::int()).with_default("8")],
        |args: &[Value]| {
            let size = positive(int(args, 0, "Ring")?, "Ring", "size")?;
            Ok(Value::Object(Instance::new("demo.Ring", Topology::Ring { size })))
        },
    ));
    registry.add_constructor(Constructor::new(
        "demo.Mesh",
        vec![
            ParamSpec::new("rows", ParamType::int()).with_default("2"),
            ParamSpec::new("cols", ParamType::int()).with_default("2"),
        ],
        |args: &[Value]| {
            let rows = positive(int(args, 0, "Mesh")?, "Mesh", "rows")?;
            let cols = positive(int(args, 1, "Mesh")?, "Mesh", "cols")?;
            Ok(Value::Object(Instance::new("demo.Mesh", Topology::Mesh { rows, cols })))
        },
    ));
    registry.add_constructor(Constructor::new("demo.ShortestPath", vec![], |_: &[Value]| {
        Ok(Value::Object(Instance::new("demo.ShortestPath", Routing::ShortestPath)))
    }));
    registry.add_constructor(Constructor::new(
        "demo.Flooding",
        vec![ParamSpec::new("ttl", ParamType::int())],
        |args: &[Value]| {
            let ttl = positive(int(args, 0, "Flooding")?, "Flooding", "ttl")?;
            Ok(Value::Object(Instance::new("demo.Flooding", Routing::Flooding { ttl })))
        },
    ));
    registry.add_constructor(Constructor::new(
        EXPERIMENT,
        vec![
            ParamSpec::new("topology", ParamType::object("demo.Topology")),
            ParamSpec::new("routing", ParamType::object("demo.Routing")).with_default_class("demo.ShortestPath"),
            ParamSpec::new("loads", ParamType::array_of(ParamType::double())),
        ],
        |args: &[Value]| {
            let topology = args
                .first()
                .and_then(|v| v.downcast_ref::<Topology>())
                .cloned()
                .ok_or_else(|| ConstructError::failed("Experiment", "missing topology"))?;
            let routing = args
                .get(1)
                .and_then(|v| v.downcast_ref::<Routing>())
                .cloned()
                .ok_or_else(|| ConstructError::failed("Experiment", "missing routing"))?;
            if let Routing::Flooding { ttl } = routing {
                if ttl > topology.node_count() {
                    return Err(ConstructError::skip(format!(
                        "ttl {ttl} exceeds {} nodes",
                        topology.node_count()
                    )));
                }
            }
            let loads = args
                .get(2)
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(Value::as_float).collect())
                .unwrap_or_default();
            Ok(Value::Object(Instance::new(
                EXPERIMENT,
                Experiment {
                    topology,
                    routing,
                    loads,
                },
            )))
        },
    ));
    Arc::new(registry)
}

fn sig(ty: &str, params: Vec<ParamType>) -> ConstructorSignature {
    ConstructorSignature::new(ty, params)
}

/// Demo sweep
///
/// Rings of 4, 8 and 16 nodes, a 2x3 mesh, shortest-path routing and
/// flooding with TTL 6 or 12, three offered loads.
///
/// # Errors
/// Returns [`TreeError`] if the demo catalog rejects an edit.
pub fn demo_tree() -> Result<ConfigurationTree, TreeError> {
    let mut tree = ConfigurationTree::new(EXPERIMENT, demo_catalog());
    let experiment = tree.add_constructor(
        tree.root(),
        &sig(
            EXPERIMENT,
            vec![
                ParamType::object("demo.Topology"),
                ParamType::object("demo.Routing"),
                ParamType::array_of(ParamType::double()),
            ],
        ),
        false,
    )?;
    let params = tree.children(experiment).to_vec();

    let ring = tree.add_constructor(params[0], &sig("demo.Ring", vec![ParamType::int()]), false)?;
    tree.add_literal(tree.children(ring)[0], "4:16log3")?;
    tree.add_constructor(
        params[0],
        &sig("demo.Mesh", vec![ParamType::int(), ParamType::int()]),
        true,
    )?;
    if let Some(mesh) = tree.children(params[0]).last().copied() {
        let cols = tree.children(mesh)[1];
        tree.clear(cols)?;
        tree.add_literal(cols, "3")?;
    }

    tree.add_constructor(params[1], &sig("demo.ShortestPath", vec![]), false)?;
    let flooding = tree.add_constructor(params[1], &sig("demo.Flooding", vec![ParamType::int()]), false)?;
    tree.add_literal(tree.children(flooding)[0], "6,12")?;

    let loads = tree.add_array(params[2])?;
    tree.set_array_literal(loads, "0.25:0.25:0.75")?;
    Ok(tree)
}

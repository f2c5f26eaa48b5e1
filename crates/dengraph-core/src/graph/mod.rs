mod adjacency;
mod distance_graph;

pub use adjacency::AdjacencyGraph;
pub use distance_graph::DistanceGraph;

use indexmap::IndexMap;

use crate::error::{NodeId, Result};

/// What to do with a node's outgoing edges on [`Graph::set_node`].
///
/// Stands in for the two meanings a single "edges" argument carries at this call site: "just
/// make sure the node exists" versus "here is its (partial) edge mapping, union it in".
pub enum NodeEdges<N: NodeId> {
    /// Ensure the node is present; leave existing edges (or an empty mapping) untouched.
    Ensure,
    /// Replace the node's outgoing edges with the union of its current edges and these.
    Edges(IndexMap<N, f64>),
}

/// Uniform access to a node/edge set, whether materialised ([`AdjacencyGraph`]) or implicit
/// ([`DistanceGraph`]).
///
/// Every read/write/delete is a named, `Result`-returning method rather than operator overloads:
/// `std::ops::Index` cannot return `Result`, and an infallible, panicking `Index` impl would
/// reintroduce exactly the `NoSuchNode`/`NoSuchEdge` failure modes this trait exists to make
/// explicit.
pub trait Graph<N: NodeId> {
    /// Number of nodes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `node` is present.
    fn contains_node(&self, node: &N) -> bool;

    /// Whether the directed edge `(from, to)` is defined.
    fn contains_edge(&self, from: &N, to: &N) -> bool;

    /// Iterate all nodes in insertion order.
    fn nodes(&self) -> Box<dyn Iterator<Item = &N> + '_>;

    /// A node's outgoing edges as `neighbour -> weight`.
    fn edges_of(&self, node: &N) -> Result<IndexMap<N, f64>, N>;

    /// Weight of the directed edge `(from, to)`.
    fn edge(&self, from: &N, to: &N) -> Result<f64, N>;

    /// Ensure a node exists, or replace/union its outgoing edges.
    fn set_node(&mut self, node: N, edges: NodeEdges<N>) -> Result<(), N>;

    /// Set the weight of the directed edge `(from, to)`. Fails `NoSuchNode` if either endpoint
    /// is absent.
    fn set_edge(&mut self, from: N, to: N, weight: f64) -> Result<(), N>;

    /// Remove a node and every edge incident to it.
    fn remove_node(&mut self, node: &N) -> Result<(), N>;

    /// Remove the directed edge `(from, to)`.
    fn remove_edge(&mut self, from: &N, to: &N) -> Result<(), N>;

    /// Nodes `u != node` with `d(node, u) <= max_distance`, or every direct neighbour when
    /// `max_distance` is `None` (the `ANY_DISTANCE` sentinel of the source material).
    fn neighbours(&self, node: &N, max_distance: Option<f64>) -> Result<Vec<N>, N>;
}

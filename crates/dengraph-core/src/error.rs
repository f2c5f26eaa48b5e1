use std::fmt;

/// Anything usable as a node identity: cheap to clone, totally comparable, hashable, printable.
///
/// Blanket-implemented for every type that already satisfies the bounds, so callers never write
/// `impl NodeId for MyId {}` by hand.
pub trait NodeId: Clone + Eq + std::hash::Hash + fmt::Debug {}

impl<T: Clone + Eq + std::hash::Hash + fmt::Debug> NodeId for T {}

/// Errors raised at the boundary of the graph and clustering contracts.
#[derive(Debug, thiserror::Error)]
pub enum DenGraphError<N: NodeId> {
    /// A node was queried, mutated, or deleted that is not present in the graph.
    #[error("no such node: {0:?}")]
    NoSuchNode(N),

    /// An edge was queried or deleted that is not defined, including edges suppressed by a
    /// bounded graph's `max_distance`.
    #[error("no such edge: {0:?} -> {1:?}")]
    NoSuchEdge(N, N),

    /// A `Distance` was asked to do something (e.g. compute a mean) it does not implement.
    #[error("distance does not support {0}")]
    NoDistanceSupport(&'static str),

    /// Graph union found the same directed edge in both operands with different weights.
    #[error("conflicting weights for edge {from:?} -> {to:?}: {left} != {right}")]
    UnionConflict {
        from: N,
        to: N,
        left: f64,
        right: f64,
    },

    /// The clustering parameters themselves are invalid (e.g. `ε <= 0` or `η == 0`).
    #[error("invalid clustering parameters: {0}")]
    InvalidParameters(&'static str),
}

pub type Result<T, N> = std::result::Result<T, DenGraphError<N>>;

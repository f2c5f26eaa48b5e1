//! Incremental density-based graph clustering (the DenGraph family): a DBSCAN-lineage algorithm
//! that maintains overlapping core/border/noise membership as nodes and edges stream in and out.

mod cluster;
mod distance;
mod engine;
mod error;
mod fio;
mod graph;

pub use cluster::{Cluster, ClusterView, NodeState};
pub use distance::{Distance, FnDistance, MeanCapable};
pub use engine::DenGraphIO;
pub use error::{DenGraphError, NodeId, Result};
pub use fio::DenGraphFio;
pub use graph::{AdjacencyGraph, DistanceGraph, Graph, NodeEdges};

use indexmap::IndexMap;

use crate::cluster::Cluster;
use crate::distance::Distance;
use crate::engine::DenGraphIO;
use crate::error::{DenGraphError, NodeId, Result};
use crate::graph::{DistanceGraph, Graph, NodeEdges};

/// The fixed-parameter DenGraph profile: requires a distance capable of computing a
/// representative mean, and clusters with hardcoded `ε = 0.1`, `η = 4`.
///
/// The one dynamic check this type needs — "does the `Distance` value I was handed support
/// means" — can't be pushed to a compile-time bound without forcing every `Distance` impl to
/// also implement `MeanCapable`, so it is resolved once, at construction, via
/// [`Distance::as_mean_capable`].
pub struct DenGraphFio<N: NodeId, D: Distance<N>> {
    engine: DenGraphIO<N, DistanceGraph<N, D>>,
}

impl<N: NodeId, D: Distance<N>> DenGraphFio<N, D> {
    pub const CLUSTER_DISTANCE: f64 = 0.1;
    pub const CORE_NEIGHBOURS: usize = 4;

    pub fn try_new(nodes: impl IntoIterator<Item = N>, distance: D) -> Result<Self, N> {
        if distance.as_mean_capable().is_none() {
            return Err(DenGraphError::NoDistanceSupport(
                "mean: DenGraphFio requires a MeanCapable distance",
            ));
        }
        let graph = DistanceGraph::new(nodes, distance);
        let engine = DenGraphIO::new(graph, Self::CLUSTER_DISTANCE, Self::CORE_NEIGHBOURS)?;
        Ok(Self { engine })
    }

    pub fn contains(&self, node: &N) -> bool {
        self.engine.contains(node)
    }

    pub fn get(&self, node: &N) -> Result<IndexMap<N, f64>, N> {
        self.engine.get(node)
    }

    pub fn insert(&mut self, node: N, edges: NodeEdges<N>) -> Result<(), N> {
        self.engine.insert(node, edges)
    }

    pub fn remove(&mut self, node: &N) -> Result<(), N> {
        self.engine.remove(node)
    }

    pub fn clusters(&self) -> impl Iterator<Item = &Cluster<N>> {
        self.engine.clusters()
    }

    pub fn noise(&self) -> &indexmap::IndexSet<N> {
        self.engine.noise()
    }

    /// The representative of `cluster`, computed on demand from its current membership.
    ///
    /// The source maintains a layered, incrementally-updated cache of this value per cluster
    /// (`ClusterRepresentative`); that cache's shadowed-write/whiteout bookkeeping is explicitly
    /// out of scope here (see the crate's design notes), so the representative is recomputed
    /// from the live membership on every call instead of being maintained as mutable state. It is
    /// consumed only by callers — the engine itself never uses it for classification.
    pub fn representative_of(&self, cluster: &Cluster<N>) -> N {
        let mean_capable = self
            .engine
            .graph()
            .distance()
            .as_mean_capable()
            .expect("construction guarantees the distance is MeanCapable");
        let members: Vec<N> = cluster.iter().cloned().collect();
        mean_capable.mean(&members, &[])
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::distance::MeanCapable;

    /// A distance that treats every pair as coincident (for exercising the fixed `ε = 0.1`
    /// profile without needing five numerically-close-but-distinct node ids) and whose mean is
    /// the arithmetic average of the member ids, rounded to the nearest integer.
    struct Averaging;

    impl Distance<i32> for Averaging {
        fn distance(&self, _a: &i32, _b: &i32) -> f64 {
            0.0
        }

        fn is_symmetric(&self) -> bool {
            true
        }

        fn as_mean_capable(&self) -> Option<&dyn MeanCapable<i32>> {
            Some(self)
        }
    }

    impl MeanCapable<i32> for Averaging {
        fn mean(&self, nodes: &[i32], _changes: &[i32]) -> i32 {
            if nodes.is_empty() {
                return 0;
            }
            (nodes.iter().sum::<i32>() as f64 / nodes.len() as f64).round() as i32
        }
    }

    struct NoMean;

    impl Distance<i32> for NoMean {
        fn distance(&self, a: &i32, b: &i32) -> f64 {
            (a - b).unsigned_abs() as f64
        }
    }

    #[test]
    fn rejects_distance_without_mean() {
        let result = DenGraphFio::try_new([1, 2, 3], NoMean);
        assert!(matches!(result, Err(DenGraphError::NoDistanceSupport(_))));
    }

    #[test]
    fn uses_fixed_parameters() {
        let fio = DenGraphFio::try_new([1, 2, 3, 4, 5], Averaging).unwrap();
        assert_eq!(fio.engine.cluster_distance(), 0.1);
        assert_eq!(fio.engine.core_neighbours(), 4);
    }

    #[test]
    fn representative_is_the_cluster_mean() {
        let fio = DenGraphFio::try_new([1, 2, 3, 4, 5], Averaging).unwrap();
        let clusters: Vec<&Cluster<i32>> = fio.clusters().collect();
        assert_eq!(clusters.len(), 1);
        assert_eq!(fio.representative_of(clusters[0]), 3);
    }
}

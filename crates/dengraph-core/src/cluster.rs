use indexmap::IndexSet;

use crate::error::{NodeId, Result};
use crate::graph::Graph;

/// Which density role a node plays within a cluster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeState {
    Core,
    Border,
}

/// A cluster's membership: disjoint core and border node sets.
///
/// Deliberately holds no reference to its host graph, to avoid a self-referential struct inside
/// `DenGraphIO` (which owns both the graph and the list of clusters). Graph-forwarding operations
/// go through [`Cluster::view`] instead, grounded in the teacher's `FlatGraphView` pattern of a
/// struct pairing a borrowed graph with derived indices.
///
/// Equality is structural over membership alone, matching the source: two clusters are equal iff
/// their core and border sets match, independent of which host graph they were built against.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cluster<N: NodeId + Eq + std::hash::Hash> {
    core: IndexSet<N>,
    border: IndexSet<N>,
}

impl<N: NodeId + Eq + std::hash::Hash> Cluster<N> {
    pub fn new() -> Self {
        Self {
            core: IndexSet::new(),
            border: IndexSet::new(),
        }
    }

    pub fn core(&self) -> &IndexSet<N> {
        &self.core
    }

    pub fn border(&self) -> &IndexSet<N> {
        &self.border
    }

    pub fn len(&self) -> usize {
        self.core.len() + self.border.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, node: &N) -> bool {
        self.core.contains(node) || self.border.contains(node)
    }

    /// Mark `node` with `state`, moving it out of the other set if it was there. Idempotent.
    pub fn categorize(&mut self, node: N, state: NodeState) {
        match state {
            NodeState::Core => {
                self.border.shift_remove(&node);
                self.core.insert(node);
            }
            NodeState::Border => {
                self.core.shift_remove(&node);
                self.border.insert(node);
            }
        }
    }

    pub fn remove(&mut self, node: &N) {
        self.core.shift_remove(node);
        self.border.shift_remove(node);
    }

    /// Iterate members, border first then core, matching the source's iteration order.
    pub fn iter(&self) -> impl Iterator<Item = &N> {
        self.border.iter().chain(self.core.iter())
    }

    /// Borrow a host graph to answer graph-forwarding queries (neighbours, edges) restricted to
    /// this cluster's membership.
    pub fn view<'c, 'g, G: Graph<N>>(&'c self, host: &'g G) -> ClusterView<'c, 'g, N, G> {
        ClusterView { cluster: self, host }
    }
}

/// Transient, borrowing view of a [`Cluster`] over its host graph.
///
/// Exists only for the duration of a call; never stored alongside the cluster it borrows.
pub struct ClusterView<'c, 'g, N: NodeId + Eq + std::hash::Hash, G: Graph<N>> {
    cluster: &'c Cluster<N>,
    host: &'g G,
}

impl<'c, 'g, N: NodeId + Eq + std::hash::Hash, G: Graph<N>> ClusterView<'c, 'g, N, G> {
    pub fn edge(&self, from: &N, to: &N) -> Result<f64, N> {
        self.host.edge(from, to)
    }

    /// Host neighbours of `node`, restricted to nodes also present in this cluster.
    pub fn neighbours(&self, node: &N, max_distance: Option<f64>) -> Result<Vec<N>, N> {
        Ok(self
            .host
            .neighbours(node, max_distance)?
            .into_iter()
            .filter(|n| self.cluster.contains(n))
            .collect())
    }

    pub fn contains(&self, node: &N) -> bool {
        self.cluster.contains(node)
    }

    pub fn len(&self) -> usize {
        self.cluster.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cluster.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::graph::AdjacencyGraph;
    use indexmap::IndexMap;

    fn graph() -> AdjacencyGraph<i32> {
        let mut src = IndexMap::new();
        src.insert(1, IndexMap::from([(2, 1.0), (3, 1.0), (9, 1.0)]));
        src.insert(2, IndexMap::from([(1, 1.0)]));
        src.insert(3, IndexMap::from([(1, 1.0)]));
        src.insert(9, IndexMap::from([(1, 1.0)]));
        AdjacencyGraph::from_map(src, f64::INFINITY, true)
    }

    #[test]
    fn categorize_is_mutually_exclusive() {
        let mut cluster = Cluster::new();
        cluster.categorize(1, NodeState::Border);
        assert!(cluster.border().contains(&1));
        cluster.categorize(1, NodeState::Core);
        assert!(cluster.core().contains(&1));
        assert!(!cluster.border().contains(&1));
    }

    #[test]
    fn equality_is_structural_over_membership() {
        let mut a = Cluster::new();
        a.categorize(1, NodeState::Core);
        a.categorize(2, NodeState::Border);

        let mut b = Cluster::new();
        b.categorize(2, NodeState::Border);
        b.categorize(1, NodeState::Core);

        assert_eq!(a, b);
    }

    #[test]
    fn view_filters_neighbours_to_cluster_membership() {
        let host = graph();
        let mut cluster = Cluster::new();
        cluster.categorize(1, NodeState::Core);
        cluster.categorize(2, NodeState::Border);
        cluster.categorize(3, NodeState::Border);
        // node 9 is a host neighbour of 1 but not part of this cluster

        let view = cluster.view(&host);
        let mut neighbours = view.neighbours(&1, None).unwrap();
        neighbours.sort();
        assert_eq!(neighbours, vec![2, 3]);
    }

    #[test]
    fn iteration_is_border_then_core() {
        let mut cluster = Cluster::new();
        cluster.categorize(1, NodeState::Core);
        cluster.categorize(2, NodeState::Border);
        let order: Vec<i32> = cluster.iter().copied().collect();
        assert_eq!(order, vec![2, 1]);
    }
}

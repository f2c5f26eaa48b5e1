use indexmap::{IndexMap, IndexSet};

use super::{Graph, NodeEdges};
use crate::distance::Distance;
use crate::error::{DenGraphError, NodeId, Result};

/// An implicit graph: nodes are held explicitly, edge weight is computed on demand as
/// `distance.distance(u, v)`. There is no adjacency mapping to maintain, so mutation only ever
/// touches the node set.
#[derive(Clone, Debug)]
pub struct DistanceGraph<N: NodeId, D> {
    nodes: IndexSet<N>,
    distance: D,
}

impl<N: NodeId, D: Distance<N>> DistanceGraph<N, D> {
    pub fn new(nodes: impl IntoIterator<Item = N>, distance: D) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
            distance,
        }
    }

    pub fn distance(&self) -> &D {
        &self.distance
    }
}

impl<N: NodeId, D: Distance<N>> Graph<N> for DistanceGraph<N, D> {
    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn contains_node(&self, node: &N) -> bool {
        self.nodes.contains(node)
    }

    fn contains_edge(&self, from: &N, to: &N) -> bool {
        from != to && self.nodes.contains(from) && self.nodes.contains(to)
    }

    fn nodes(&self) -> Box<dyn Iterator<Item = &N> + '_> {
        Box::new(self.nodes.iter())
    }

    fn edges_of(&self, node: &N) -> Result<IndexMap<N, f64>, N> {
        if !self.nodes.contains(node) {
            return Err(DenGraphError::NoSuchNode(node.clone()));
        }
        Ok(self
            .nodes
            .iter()
            .filter(|&other| other != node)
            .map(|other| (other.clone(), self.distance.distance(node, other)))
            .collect())
    }

    fn edge(&self, from: &N, to: &N) -> Result<f64, N> {
        if self.contains_edge(from, to) {
            Ok(self.distance.distance(from, to))
        } else {
            Err(DenGraphError::NoSuchEdge(from.clone(), to.clone()))
        }
    }

    fn set_node(&mut self, node: N, _edges: NodeEdges<N>) -> Result<(), N> {
        self.nodes.insert(node);
        Ok(())
    }

    fn set_edge(&mut self, _from: N, _to: N, _weight: f64) -> Result<(), N> {
        Err(DenGraphError::NoDistanceSupport(
            "set_edge: edge weights are computed from the distance, not stored",
        ))
    }

    fn remove_node(&mut self, node: &N) -> Result<(), N> {
        if self.nodes.shift_remove(node) {
            Ok(())
        } else {
            Err(DenGraphError::NoSuchNode(node.clone()))
        }
    }

    fn remove_edge(&mut self, _from: &N, _to: &N) -> Result<(), N> {
        Err(DenGraphError::NoDistanceSupport(
            "remove_edge: edges are computed from the distance, remove a node instead",
        ))
    }

    fn neighbours(&self, node: &N, max_distance: Option<f64>) -> Result<Vec<N>, N> {
        if !self.nodes.contains(node) {
            return Err(DenGraphError::NoSuchNode(node.clone()));
        }
        Ok(self
            .nodes
            .iter()
            .filter(|&other| other != node)
            .filter(|other| max_distance.is_none_or(|bound| self.distance.distance(node, other) <= bound))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::distance::FnDistance;

    fn abs_diff() -> FnDistance<impl Fn(&i32, &i32) -> f64> {
        FnDistance::symmetric(|a: &i32, b: &i32| (a - b).unsigned_abs() as f64)
    }

    #[test]
    fn neighbours_excludes_self_and_respects_bound() {
        let graph = DistanceGraph::new([1, 2, 3, 4, 5, 6, 20], abs_diff());
        let mut within_five = graph.neighbours(&1, Some(5.0)).unwrap();
        within_five.sort();
        assert_eq!(within_five, vec![2, 3, 4, 5, 6]);
    }

    #[test]
    fn neighbours_monotonic_in_distance() {
        let graph = DistanceGraph::new([1, 2, 3, 10], abs_diff());
        let mut tight = graph.neighbours(&1, Some(2.0)).unwrap();
        let mut loose = graph.neighbours(&1, Some(9.0)).unwrap();
        tight.sort();
        loose.sort();
        assert!(tight.iter().all(|n| loose.contains(n)));
    }

    #[test]
    fn missing_node_is_no_such_node() {
        let graph = DistanceGraph::new([1, 2, 3], abs_diff());
        assert!(matches!(graph.neighbours(&9, None), Err(DenGraphError::NoSuchNode(9))));
    }

    #[test]
    fn self_edge_is_never_defined() {
        let graph = DistanceGraph::new([1, 2, 3], abs_diff());
        assert!(!graph.contains_edge(&1, &1));
        assert!(matches!(graph.edge(&1, &1), Err(DenGraphError::NoSuchEdge(1, 1))));
    }

    #[test]
    fn mutation_only_touches_node_set() {
        let mut graph = DistanceGraph::new([1, 2], abs_diff());
        graph.set_node(3, NodeEdges::Ensure).unwrap();
        assert!(graph.contains_node(&3));
        graph.remove_node(&1).unwrap();
        assert!(!graph.contains_node(&1));
        assert!(matches!(graph.remove_node(&1), Err(DenGraphError::NoSuchNode(1))));
    }
}

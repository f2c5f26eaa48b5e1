use indexmap::IndexMap;

use super::{Graph, NodeEdges};
use crate::error::{DenGraphError, NodeId, Result};

/// A materialised weighted graph: `adj[u][v]` is the weight of the directed edge `u -> v`.
///
/// `max_distance` unifies what the source models as two classes (`AdjacencyGraph` and a bounded
/// subclass): writing an edge whose weight exceeds `max_distance` drops it instead of raising,
/// exactly as the bounded variant does. Defaulting `max_distance` to `f64::INFINITY` makes the
/// unbounded case a special case of the same struct rather than a distinct type, since the
/// behavioural difference is a single threshold comparison.
#[derive(Clone, Debug)]
pub struct AdjacencyGraph<N: NodeId> {
    adj: IndexMap<N, IndexMap<N, f64>>,
    max_distance: f64,
    symmetric: bool,
}

impl<N: NodeId> Default for AdjacencyGraph<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: NodeId> AdjacencyGraph<N> {
    /// An empty, unbounded, asymmetric graph.
    pub fn new() -> Self {
        Self {
            adj: IndexMap::new(),
            max_distance: f64::INFINITY,
            symmetric: false,
        }
    }

    pub fn with_bounds(max_distance: f64, symmetric: bool) -> Self {
        Self {
            adj: IndexMap::new(),
            max_distance,
            symmetric,
        }
    }

    /// Build from a raw `node -> (neighbour -> weight)` mapping. Edges whose weight exceeds
    /// `max_distance` are dropped during the copy, mirroring the bounded constructor's behaviour.
    pub fn from_map(
        source: IndexMap<N, IndexMap<N, f64>>,
        max_distance: f64,
        symmetric: bool,
    ) -> Self {
        let mut graph = Self::with_bounds(max_distance, symmetric);
        for (node, _) in &source {
            graph.adj.entry(node.clone()).or_default();
        }
        for (from, edges) in &source {
            for (to, &weight) in edges {
                if weight <= max_distance {
                    graph.adj.entry(from.clone()).or_default().insert(to.clone(), weight);
                    if symmetric {
                        graph.adj.entry(to.clone()).or_default().insert(from.clone(), weight);
                    }
                }
            }
        }
        graph
    }

    /// Copy nodes and edges from any other graph implementation, applying this graph's own
    /// `max_distance`/`symmetric` settings on the way in.
    pub fn from_graph<G: Graph<N>>(source: &G, max_distance: f64, symmetric: bool) -> Result<Self, N> {
        let mut graph = Self::with_bounds(max_distance, symmetric);
        for node in source.nodes() {
            graph.adj.entry(node.clone()).or_default();
        }
        let nodes: Vec<N> = source.nodes().cloned().collect();
        for node in &nodes {
            for (neighbour, weight) in source.edges_of(node)? {
                if weight <= max_distance {
                    graph
                        .adj
                        .entry(node.clone())
                        .or_default()
                        .insert(neighbour.clone(), weight);
                    if symmetric {
                        graph
                            .adj
                            .entry(neighbour)
                            .or_default()
                            .insert(node.clone(), weight);
                    }
                }
            }
        }
        Ok(graph)
    }

    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    pub fn is_symmetric(&self) -> bool {
        self.symmetric
    }

    fn write_edge(&mut self, from: &N, to: N, weight: f64) {
        let edges = self.adj.get_mut(from).expect("endpoint presence checked by caller");
        if weight > self.max_distance {
            edges.shift_remove(&to);
        } else {
            edges.insert(to, weight);
        }
    }

    /// Union two adjacency graphs. Nodes are the set union; a directed edge present in both
    /// operands must carry the same weight in both, else [`DenGraphError::UnionConflict`].
    /// Bounding and symmetry are inherited from `self`.
    pub fn union(&self, other: &Self) -> Result<Self, N> {
        let mut result = Self::with_bounds(self.max_distance, self.symmetric);
        for node in self.adj.keys().chain(other.adj.keys()) {
            result.adj.entry(node.clone()).or_default();
        }
        for (from, edges) in self.adj.iter().chain(other.adj.iter()) {
            for (to, &weight) in edges {
                let slot = result.adj.entry(from.clone()).or_default();
                match slot.get(to) {
                    Some(&existing) if existing != weight => {
                        return Err(DenGraphError::UnionConflict {
                            from: from.clone(),
                            to: to.clone(),
                            left: existing,
                            right: weight,
                        });
                    }
                    _ => {
                        slot.insert(to.clone(), weight);
                    }
                }
            }
        }
        Ok(result)
    }
}

impl<N: NodeId> Graph<N> for AdjacencyGraph<N> {
    fn len(&self) -> usize {
        self.adj.len()
    }

    fn contains_node(&self, node: &N) -> bool {
        self.adj.contains_key(node)
    }

    fn contains_edge(&self, from: &N, to: &N) -> bool {
        self.adj.get(from).is_some_and(|edges| edges.contains_key(to))
    }

    fn nodes(&self) -> Box<dyn Iterator<Item = &N> + '_> {
        Box::new(self.adj.keys())
    }

    fn edges_of(&self, node: &N) -> Result<IndexMap<N, f64>, N> {
        self.adj
            .get(node)
            .cloned()
            .ok_or_else(|| DenGraphError::NoSuchNode(node.clone()))
    }

    fn edge(&self, from: &N, to: &N) -> Result<f64, N> {
        self.adj
            .get(from)
            .and_then(|edges| edges.get(to))
            .copied()
            .ok_or_else(|| DenGraphError::NoSuchEdge(from.clone(), to.clone()))
    }

    fn set_node(&mut self, node: N, edges: NodeEdges<N>) -> Result<(), N> {
        match edges {
            NodeEdges::Ensure => {
                self.adj.entry(node).or_default();
            }
            NodeEdges::Edges(new_edges) => {
                let existing = self.adj.entry(node.clone()).or_default();
                for (to, weight) in new_edges {
                    existing.insert(to, weight);
                }
                let merged = self.adj.get(&node).cloned().unwrap_or_default();
                for (to, weight) in merged {
                    if weight > self.max_distance {
                        self.adj.get_mut(&node).unwrap().shift_remove(&to);
                    } else if self.symmetric {
                        self.adj.entry(to).or_default().insert(node.clone(), weight);
                    }
                }
            }
        }
        Ok(())
    }

    fn set_edge(&mut self, from: N, to: N, weight: f64) -> Result<(), N> {
        if !self.adj.contains_key(&from) {
            return Err(DenGraphError::NoSuchNode(from));
        }
        if !self.adj.contains_key(&to) {
            return Err(DenGraphError::NoSuchNode(to));
        }
        if from == to {
            return Ok(());
        }
        self.write_edge(&from, to.clone(), weight);
        if self.symmetric {
            self.write_edge(&to, from, weight);
        }
        Ok(())
    }

    fn remove_node(&mut self, node: &N) -> Result<(), N> {
        if self.adj.shift_remove(node).is_none() {
            return Err(DenGraphError::NoSuchNode(node.clone()));
        }
        for edges in self.adj.values_mut() {
            edges.shift_remove(node);
        }
        Ok(())
    }

    fn remove_edge(&mut self, from: &N, to: &N) -> Result<(), N> {
        let removed = self
            .adj
            .get_mut(from)
            .and_then(|edges| edges.shift_remove(to))
            .is_some();
        if !removed {
            return Err(DenGraphError::NoSuchEdge(from.clone(), to.clone()));
        }
        if self.symmetric {
            if let Some(edges) = self.adj.get_mut(to) {
                edges.shift_remove(from);
            }
        }
        Ok(())
    }

    fn neighbours(&self, node: &N, max_distance: Option<f64>) -> Result<Vec<N>, N> {
        let edges = self
            .adj
            .get(node)
            .ok_or_else(|| DenGraphError::NoSuchNode(node.clone()))?;
        Ok(edges
            .iter()
            .filter(|&(n, _)| n != node)
            .filter(|&(_, &w)| max_distance.is_none_or(|bound| w <= bound))
            .map(|(n, _)| n.clone())
            .collect())
    }
}

use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, trace};

use crate::cluster::{Cluster, NodeState};
use crate::error::{DenGraphError, NodeId, Result};
use crate::graph::{Graph, NodeEdges};

/// Incremental density-based clustering engine.
///
/// Owns a host graph `G` exclusively: there is no external handle left to mutate it out of band
/// once the engine is constructed, so the "concurrent external mutation is undefined behaviour"
/// rule of the reference material becomes a borrow-checker fact here rather than a documented
/// caveat.
///
/// Clusters are keyed by a monotonically increasing id rather than stored positionally, so that
/// merges and splits never have to renumber unrelated clusters.
pub struct DenGraphIO<N: NodeId, G: Graph<N>> {
    graph: G,
    cluster_distance: f64,
    core_neighbours: usize,
    clusters: IndexMap<u64, Cluster<N>>,
    noise: IndexSet<N>,
    next_cluster_id: u64,
}

impl<N: NodeId, G: Graph<N>> DenGraphIO<N, G> {
    pub fn new(graph: G, cluster_distance: f64, core_neighbours: usize) -> Result<Self, N> {
        if !(cluster_distance > 0.0) {
            return Err(DenGraphError::InvalidParameters(
                "cluster_distance must be greater than zero",
            ));
        }
        if core_neighbours == 0 {
            return Err(DenGraphError::InvalidParameters(
                "core_neighbours must be at least one",
            ));
        }
        let mut engine = Self {
            graph,
            cluster_distance,
            core_neighbours,
            clusters: IndexMap::new(),
            noise: IndexSet::new(),
            next_cluster_id: 0,
        };
        engine.build()?;
        debug!(
            clusters = engine.clusters.len(),
            noise = engine.noise.len(),
            "initial build complete"
        );
        Ok(engine)
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn cluster_distance(&self) -> f64 {
        self.cluster_distance
    }

    pub fn core_neighbours(&self) -> usize {
        self.core_neighbours
    }

    pub fn contains(&self, node: &N) -> bool {
        self.graph.contains_node(node)
    }

    pub fn get(&self, node: &N) -> Result<IndexMap<N, f64>, N> {
        self.graph.edges_of(node)
    }

    pub fn clusters(&self) -> impl Iterator<Item = &Cluster<N>> {
        self.clusters.values()
    }

    pub fn noise(&self) -> &IndexSet<N> {
        &self.noise
    }

    pub fn clusters_for_node(&self, node: &N) -> Vec<&Cluster<N>> {
        self.clusters.values().filter(|c| c.contains(node)).collect()
    }

    /// Two engines are equal iff they share parameters, the same noise set, and there is a
    /// bijection between their cluster lists under which corresponding clusters have equal core
    /// and border sets. A free function rather than `PartialEq` since neither `G` nor the
    /// bijection search need operator sugar, and `G` is not required to be comparable.
    pub fn clustering_eq(&self, other: &Self) -> bool {
        if self.cluster_distance != other.cluster_distance || self.core_neighbours != other.core_neighbours {
            return false;
        }
        if self.noise != other.noise {
            return false;
        }
        if self.clusters.len() != other.clusters.len() {
            return false;
        }
        let others: Vec<&Cluster<N>> = other.clusters.values().collect();
        let mut used = vec![false; others.len()];
        'outer: for mine in self.clusters.values() {
            for (i, theirs) in others.iter().enumerate() {
                if !used[i] && mine == *theirs {
                    used[i] = true;
                    continue 'outer;
                }
            }
            return false;
        }
        true
    }

    fn epsilon_neighbours(&self, v: &N) -> Result<IndexSet<N>, N> {
        Ok(self
            .graph
            .neighbours(v, Some(self.cluster_distance))?
            .into_iter()
            .collect())
    }

    fn is_core(&self, v: &N) -> Result<bool, N> {
        Ok(self.epsilon_neighbours(v)?.len() >= self.core_neighbours)
    }

    fn new_cluster(&mut self) -> u64 {
        let id = self.next_cluster_id;
        self.next_cluster_id += 1;
        self.clusters.insert(id, Cluster::new());
        id
    }

    fn any_core_contains(&self, node: &N) -> bool {
        self.clusters.values().any(|c| c.core().contains(node))
    }

    fn is_border_somewhere(&self, node: &N) -> bool {
        self.clusters.values().any(|c| c.border().contains(node))
    }

    fn core_clusters_among<'a>(&self, nodes: impl IntoIterator<Item = &'a N>) -> Vec<u64>
    where
        N: 'a,
    {
        let nodes: Vec<&N> = nodes.into_iter().collect();
        let mut ids: Vec<u64> = self
            .clusters
            .iter()
            .filter(|(_, c)| nodes.iter().any(|n| c.core().contains(*n)))
            .map(|(&id, _)| id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Move every core/border node of `drop` into `keep` and discard `drop`. Returns the nodes
    /// that were core of `drop`, so callers tracking their own `node -> cluster id` map (the
    /// initial build) can update it.
    fn merge_clusters(&mut self, keep: u64, drop: u64) -> Vec<N> {
        trace!(keep, drop, "merging clusters");
        let Some(dropped) = self.clusters.shift_remove(&drop) else {
            return Vec::new();
        };
        let moved_core: Vec<N> = dropped.core().iter().cloned().collect();
        for node in &moved_core {
            self.clusters
                .get_mut(&keep)
                .expect("keep cluster exists for the duration of a merge")
                .categorize(node.clone(), NodeState::Core);
        }
        for node in dropped.border().iter().cloned().collect::<Vec<_>>() {
            self.clusters
                .get_mut(&keep)
                .expect("keep cluster exists for the duration of a merge")
                .categorize(node, NodeState::Border);
        }
        moved_core
    }

    /// Remove `id`; any of its members not otherwise claimed by another cluster fall back to
    /// noise.
    fn dissolve(&mut self, id: u64) {
        let Some(cluster) = self.clusters.shift_remove(&id) else {
            return;
        };
        trace!(id, size = cluster.len(), "dissolving cluster");
        for node in cluster.iter() {
            if !self.clusters.values().any(|c| c.contains(node)) {
                self.noise.insert(node.clone());
            }
        }
    }

    /// Density-connect the nodes of `pool` into new clusters, exactly as the initial build does,
    /// but restricted to `pool` membership: neighbour counts still come from the full host graph
    /// (so a node's core/border classification is unaffected by the restriction), but expansion
    /// only ever steps to neighbours that are themselves in `pool`. Returns the ids of the
    /// clusters created.
    fn build_over_pool(&mut self, pool: &IndexSet<N>) -> Result<Vec<u64>, N> {
        let mut seed: IndexMap<N, bool> = IndexMap::new();
        for v in pool {
            seed.insert(v.clone(), self.is_core(v)?);
        }
        let mut assigned: IndexMap<N, u64> = IndexMap::new();
        let mut created: Vec<u64> = Vec::new();

        for v in pool {
            if !*seed.get(v).unwrap_or(&false) || assigned.contains_key(v) {
                continue;
            }
            let mut cluster_id = self.new_cluster();
            created.push(cluster_id);
            self.clusters
                .get_mut(&cluster_id)
                .expect("just created")
                .categorize(v.clone(), NodeState::Core);
            assigned.insert(v.clone(), cluster_id);

            let mut queue: VecDeque<N> = VecDeque::new();
            queue.push_back(v.clone());
            while let Some(u) = queue.pop_front() {
                for w in self.epsilon_neighbours(&u)? {
                    if !pool.contains(&w) {
                        continue;
                    }
                    if *seed.get(&w).unwrap_or(&false) {
                        match assigned.get(&w).copied() {
                            Some(existing) if existing != cluster_id => {
                                let (keep, drop) = if cluster_id < existing {
                                    (cluster_id, existing)
                                } else {
                                    (existing, cluster_id)
                                };
                                for node in self.merge_clusters(keep, drop) {
                                    assigned.insert(node, keep);
                                }
                                created.retain(|&id| id != drop);
                                cluster_id = keep;
                            }
                            Some(_) => {}
                            None => {
                                self.clusters
                                    .get_mut(&cluster_id)
                                    .expect("cluster_id is live")
                                    .categorize(w.clone(), NodeState::Core);
                                assigned.insert(w.clone(), cluster_id);
                                queue.push_back(w);
                            }
                        }
                    } else {
                        self.clusters
                            .get_mut(&cluster_id)
                            .expect("cluster_id is live")
                            .categorize(w, NodeState::Border);
                    }
                }
            }
        }
        Ok(created)
    }

    fn build(&mut self) -> Result<(), N> {
        self.clusters.clear();
        self.noise.clear();
        self.next_cluster_id = 0;
        let nodes: IndexSet<N> = self.graph.nodes().cloned().collect();
        self.build_over_pool(&nodes)?;
        let touched: IndexSet<N> = self.clusters.values().flat_map(|c| c.iter().cloned()).collect();
        self.noise = nodes.into_iter().filter(|n| !touched.contains(n)).collect();
        Ok(())
    }

    /// When `v` newly qualifies as core (either a fresh insertion or a promoted border), attach
    /// it — and any of its non-core neighbours — to the cluster reached via its core neighbours,
    /// merging if more than one such cluster is reached, or seed a new cluster if none is.
    fn attach_new_core(&mut self, v: N, n_v: &IndexSet<N>) -> Result<(), N> {
        let reached = self.core_clusters_among(n_v);
        let cluster_id = if reached.is_empty() {
            self.new_cluster()
        } else {
            let keep = *reached.iter().min().expect("non-empty");
            for &other in &reached {
                if other != keep {
                    self.merge_clusters(keep, other);
                }
            }
            keep
        };
        self.clusters
            .get_mut(&cluster_id)
            .expect("cluster_id is live")
            .categorize(v.clone(), NodeState::Core);
        self.noise.shift_remove(&v);
        for u in n_v {
            if !self.any_core_contains(u) {
                self.clusters
                    .get_mut(&cluster_id)
                    .expect("cluster_id is live")
                    .categorize(u.clone(), NodeState::Border);
                self.noise.shift_remove(u);
            }
        }
        Ok(())
    }

    /// `u` was border somewhere and has just crossed the core threshold: re-run the core-attach
    /// logic for it after detaching it from whatever cluster(s) it used to be a border of.
    fn promote_border_to_core(&mut self, u: N) -> Result<(), N> {
        let n_u = self.epsilon_neighbours(&u)?;
        for cluster in self.clusters.values_mut() {
            cluster.remove(&u);
        }
        debug!(node = ?u, "border node promoted to core");
        self.attach_new_core(u, &n_u)
    }

    /// Remove `node` from every cluster it currently belongs to (core or border), dissolving any
    /// cluster this leaves without a core. Does not touch the noise set.
    fn detach_from_clusters(&mut self, node: &N) {
        let mut emptied = Vec::new();
        for (&id, cluster) in self.clusters.iter_mut() {
            if cluster.contains(node) {
                cluster.remove(node);
                if cluster.core().is_empty() {
                    emptied.push(id);
                }
            }
        }
        for id in emptied {
            self.dissolve(id);
        }
    }

    /// `node` is no longer a member of any cluster and has no core neighbour; send it to noise,
    /// detaching it from any cluster it still happens to be registered in.
    fn demote_to_noise(&mut self, node: &N) {
        self.detach_from_clusters(node);
        self.noise.insert(node.clone());
    }

    /// Insert or update `node` with `edges`, then reconcile cluster membership: detach `node`
    /// from any cluster a prior insertion left it in (its ε-neighbourhood may have just changed),
    /// classify it fresh, and propagate any upgrades (border -> core) among its ε-neighbours that
    /// the insertion triggered.
    pub fn insert(&mut self, node: N, edges: NodeEdges<N>) -> Result<(), N> {
        let is_new = !self.graph.contains_node(&node);
        self.graph.set_node(node.clone(), edges)?;
        if is_new {
            self.noise.insert(node.clone());
        } else {
            self.detach_from_clusters(&node);
        }
        debug!(node = ?node, new = is_new, "inserting node");

        let n_v = self.epsilon_neighbours(&node)?;

        let mut upgraded: Vec<N> = Vec::new();
        for u in &n_v {
            if self.is_border_somewhere(u) && self.is_core(u)? {
                upgraded.push(u.clone());
            }
        }

        if n_v.len() >= self.core_neighbours {
            self.attach_new_core(node.clone(), &n_v)?;
        } else {
            let reached = self.core_clusters_among(&n_v);
            if reached.is_empty() {
                self.demote_to_noise(&node);
            } else {
                for id in reached {
                    self.clusters
                        .get_mut(&id)
                        .expect("reached id is live")
                        .categorize(node.clone(), NodeState::Border);
                }
                self.noise.shift_remove(&node);
            }
        }

        for u in upgraded {
            self.promote_border_to_core(u)?;
        }

        Ok(())
    }

    /// For `u`, a former core neighbour of a just-removed node that no longer has enough
    /// ε-neighbours: downgrade it in every cluster where it was core, to border (if still
    /// adjacent to one of that cluster's remaining core nodes) or drop it (otherwise). Returns
    /// the ids of clusters that need reclustering as a result.
    fn downgrade(&mut self, u: &N) -> Result<Vec<u64>, N> {
        let touched: Vec<u64> = self
            .clusters
            .iter()
            .filter(|(_, c)| c.core().contains(u))
            .map(|(&id, _)| id)
            .collect();
        if touched.is_empty() {
            return Ok(Vec::new());
        }
        debug!(node = ?u, clusters = touched.len(), "downgrading node");
        let n_u = self.epsilon_neighbours(u)?;
        for &id in &touched {
            let keeps_core_neighbour = n_u
                .iter()
                .any(|w| self.clusters.get(&id).is_some_and(|c| c.core().contains(w)));
            let cluster = self.clusters.get_mut(&id).expect("touched id is live");
            if keeps_core_neighbour {
                cluster.categorize(u.clone(), NodeState::Border);
            } else {
                cluster.remove(u);
            }
        }
        if !self.clusters.values().any(|c| c.contains(u)) {
            self.noise.insert(u.clone());
        }
        Ok(touched)
    }

    /// Rebuild the density-connected components of `id`'s current membership. If more than one
    /// component emerges, the cluster splits; members that land in no component become noise
    /// (unless they remain border of some other, untouched cluster).
    fn recluster(&mut self, id: u64) -> Result<(), N> {
        let Some(cluster) = self.clusters.shift_remove(&id) else {
            return Ok(());
        };
        let pool: IndexSet<N> = cluster.iter().cloned().collect();
        trace!(id, pool_size = pool.len(), "reclustering");
        let created = self.build_over_pool(&pool)?;
        let touched: IndexSet<N> = created
            .iter()
            .filter_map(|cid| self.clusters.get(cid))
            .flat_map(|c| c.iter().cloned())
            .collect();
        for node in &pool {
            if touched.contains(node) {
                self.noise.shift_remove(node);
            } else if !self.clusters.values().any(|c| c.contains(node)) {
                self.noise.insert(node.clone());
            }
        }
        Ok(())
    }

    /// Remove `node` from the host graph and reconcile cluster membership: downgrade any former
    /// core neighbour that falls below density, recluster every cluster a downgrade touched, and
    /// dissolve any cluster left without a core.
    pub fn remove(&mut self, node: &N) -> Result<(), N> {
        let neighbours_before = self.epsilon_neighbours(node)?;
        self.graph.remove_node(node)?;
        for cluster in self.clusters.values_mut() {
            cluster.remove(node);
        }
        self.noise.shift_remove(node);
        debug!(node = ?node, "removed node");

        let mut touched_clusters: IndexSet<u64> = IndexSet::new();
        for u in &neighbours_before {
            if !self.graph.contains_node(u) {
                continue;
            }
            if self.any_core_contains(u) && !self.is_core(u)? {
                touched_clusters.extend(self.downgrade(u)?);
            }
        }

        for id in touched_clusters {
            if self.clusters.contains_key(&id) {
                self.recluster(id)?;
            }
        }

        let emptied: Vec<u64> = self
            .clusters
            .iter()
            .filter(|(_, c)| c.core().is_empty())
            .map(|(&id, _)| id)
            .collect();
        for id in emptied {
            self.dissolve(id);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::distance::FnDistance;
    use crate::graph::{AdjacencyGraph, DistanceGraph};

    fn abs_diff() -> FnDistance<impl Fn(&i32, &i32) -> f64> {
        FnDistance::symmetric(|a: &i32, b: &i32| (a - b).unsigned_abs() as f64)
    }

    fn build(nodes: impl IntoIterator<Item = i32>) -> DenGraphIO<i32, DistanceGraph<i32, FnDistance<impl Fn(&i32, &i32) -> f64>>> {
        DenGraphIO::new(DistanceGraph::new(nodes, abs_diff()), 5.0, 5).unwrap()
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let graph = DistanceGraph::new([1, 2], abs_diff());
        assert!(matches!(
            DenGraphIO::new(graph, 0.0, 5),
            Err(DenGraphError::InvalidParameters(_))
        ));
        let graph = DistanceGraph::new([1, 2], abs_diff());
        assert!(matches!(
            DenGraphIO::new(graph, 5.0, 0),
            Err(DenGraphError::InvalidParameters(_))
        ));
    }

    #[test]
    fn simple_noise() {
        let engine = build([1, 2, 3, 4, 5, 6, 20]);
        assert_eq!(engine.noise().iter().copied().collect::<Vec<_>>(), vec![20]);
        assert_eq!(engine.clusters().count(), 1);
    }

    #[test]
    fn two_dense_clusters() {
        let low: Vec<i32> = (10..=20).collect();
        let high: Vec<i32> = (40..=80).collect();
        let engine = build(low.into_iter().chain(high));
        assert_eq!(engine.clusters().count(), 2);
    }

    #[test]
    fn overlapping_border() {
        let nodes = [1, 2, 3, 4, 5, 6, 9, 14, 15, 16, 17, 18, 19, 20];
        let engine = build(nodes);
        assert_eq!(engine.clusters().count(), 2);
        let clusters_for_nine = engine.clusters_for_node(&9);
        assert_eq!(clusters_for_nine.len(), 2);
        for c in &clusters_for_nine {
            assert!(c.border().contains(&9));
            assert!(!c.core().contains(&9));
        }
    }

    #[test]
    fn incremental_insert_matches_batch_build() {
        let batch = build([1, 2, 3, 4, 5, 6]);

        let mut incremental = DenGraphIO::new(DistanceGraph::new([], abs_diff()), 5.0, 5).unwrap();
        assert_eq!(incremental.clusters().count(), 0);
        for node in [1, 2, 3, 4, 5, 6] {
            incremental.insert(node, NodeEdges::Ensure).unwrap();
        }

        assert!(batch.clustering_eq(&incremental));
    }

    #[test]
    fn incremental_add_matches_batch_build() {
        let batch = build([1, 2, 3, 4, 5, 6, 7, 8, 10]);

        let mut incremental = DenGraphIO::new(DistanceGraph::new([1, 2, 3, 4, 5, 6, 7, 8], abs_diff()), 5.0, 5).unwrap();
        incremental.insert(10, NodeEdges::Ensure).unwrap();

        assert!(batch.clustering_eq(&incremental));
    }

    #[test]
    fn noise_removal_matches_rebuild() {
        let base = [1, 2, 3, 4, 5, 6, 7, 8];
        let batch = build(base);

        let mut incremental = build(base.into_iter().chain([30, 31]));
        assert!(incremental.noise().contains(&30));
        assert!(incremental.noise().contains(&31));
        incremental.remove(&30).unwrap();
        incremental.remove(&31).unwrap();

        assert!(batch.clustering_eq(&incremental));
        assert!(!incremental.noise().contains(&30));
        assert!(!incremental.noise().contains(&31));
    }

    #[test]
    fn downgrade_on_removal_matches_rebuild() {
        let base = [1, 3, 4, 5, 6, 7, 13, 14, 15, 16, 17, 18];
        let batch = build(base);

        let mut incremental = build(base.into_iter().chain([2]));
        incremental.remove(&2).unwrap();

        assert!(batch.clustering_eq(&incremental));
    }

    #[test]
    fn removal_sequence_matches_rebuild_at_every_step() {
        let base = [1, 2, 3, 4, 5, 6, 12, 13, 14, 15, 16, 17];
        let batch = build(base);

        let mut incremental = build(base.into_iter().chain([7]));
        incremental.remove(&7).unwrap();
        assert!(batch.clustering_eq(&incremental));
    }

    #[test]
    fn cluster_dissolves_when_core_set_empties() {
        let batch = build([1, 2, 3, 4, 5]);
        let mut incremental = build([1, 2, 3, 4, 5, 6]);
        incremental.remove(&6).unwrap();
        assert!(batch.clustering_eq(&incremental));
    }

    /// Re-inserting an existing core node with edges that move it from one dense neighbourhood
    /// to another must detach it from its old cluster, not merely attach it to the new one —
    /// otherwise it ends up core of both, violating "core belongs to exactly one cluster".
    #[test]
    fn reinsert_with_changed_edges_detaches_from_stale_cluster() {
        let mut graph = AdjacencyGraph::with_bounds(f64::INFINITY, true);
        for v in (1..=6).chain(10..=14) {
            graph.set_node(v, NodeEdges::Ensure).unwrap();
        }
        for a in 1..=6 {
            for b in (a + 1)..=6 {
                graph.set_edge(a, b, 1.0).unwrap();
            }
        }
        for a in 10..=14 {
            for b in (a + 1)..=14 {
                graph.set_edge(a, b, 1.0).unwrap();
            }
        }
        let mut engine = DenGraphIO::new(graph, 5.0, 4).unwrap();
        assert_eq!(engine.clusters().count(), 2);

        let mut new_edges: IndexMap<i32, f64> = (1..=5).map(|v| (v, 999.0)).collect();
        new_edges.extend((10..=14).map(|v| (v, 1.0)));
        engine.insert(6, NodeEdges::Edges(new_edges)).unwrap();

        let clusters_for_six = engine.clusters_for_node(&6);
        assert_eq!(clusters_for_six.len(), 1);
        assert!(clusters_for_six[0].core().contains(&6));
        assert!(clusters_for_six[0].core().contains(&10));

        let old_cluster = engine
            .clusters()
            .find(|c| c.core().contains(&1))
            .expect("old cluster survives with its other core members");
        assert!(!old_cluster.core().contains(&6));
        assert!(!old_cluster.border().contains(&6));
    }

    #[test]
    fn clustering_eq_ignores_internal_cluster_order() {
        let a = build([1, 2, 3, 4, 5, 6, 40, 41, 42, 43, 44, 45]);
        let b = build([40, 41, 42, 43, 44, 45, 1, 2, 3, 4, 5, 6]);
        assert!(a.clustering_eq(&b));
    }
}

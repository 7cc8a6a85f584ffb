//! Weighted adjacency queries with lazily built cumulative-weight tables.
//!
//! For every queried vertex the querier snapshots its adjacent edges, evaluates
//! the weight function once per edge and stores the exclusive prefix sums. A
//! fraction `f` in `[0, 1)` then selects the edge `i` with
//! `prefix[i] <= f * W < prefix[i + 1]` by binary search, where `W` is the
//! total weight of the vertex.
//!
//! Tables of vertices with a degree below the threshold are kept for the
//! lifetime of the querier; larger ones only occupy a single "last vertex"
//! slot. The backing graph must not change the adjacency of a vertex while
//! its table is cached.

use super::{GraphQuerier, PolicyName};
use crate::error::{Error, Result};
use crate::graph::Edge;
use crate::weight_function::WeightFunction;
use crate::Node;
use crossbeam::atomic::AtomicCell;
use fxhash::FxHashMap;
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use std::sync::Arc;
use tracing::debug;

pub const UNBUFFERED: usize = 0;
pub const FULLY_BUFFERED: usize = usize::MAX;

#[derive(Clone, Debug)]
pub struct WeightedEdgeMapping {
    vertex: Node,
    edges: Vec<Edge>,
    cumulative: Vec<f64>,
    weights: FxHashMap<Edge, f64>,
    vertex_weight: f64,
}

impl WeightedEdgeMapping {
    fn build<W: WeightFunction + ?Sized>(
        querier: &GraphQuerier,
        weight_function: &W,
        vertex: Node,
    ) -> Result<Self> {
        let edges = querier.adjacent_edges(vertex).into_owned();

        let mut cumulative = Vec::with_capacity(edges.len());
        let mut weights = FxHashMap::default();
        let mut running = 0.0;

        for &edge in &edges {
            let weight = weight_function.weight(querier, edge)?;
            if !(weight.is_finite() && weight >= 0.0) {
                return Err(Error::InvalidWeight { edge, weight });
            }

            cumulative.push(running);
            weights.insert(edge, weight);
            running += weight;
        }

        Ok(Self {
            vertex,
            edges,
            cumulative,
            weights,
            vertex_weight: running,
        })
    }

    pub fn vertex(&self) -> Node {
        self.vertex
    }

    pub fn degree(&self) -> usize {
        self.edges.len()
    }

    pub fn vertex_weight(&self) -> f64 {
        self.vertex_weight
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Exclusive prefix sums; entry `i` is the total weight of edges `0..i`.
    pub fn cumulative(&self) -> &[f64] {
        &self.cumulative
    }

    pub fn edge_weight(&self, edge: &Edge) -> Option<f64> {
        self.weights.get(edge).copied()
    }

    /// Maps a fraction of the vertex weight to an adjacent edge index, `None` for isolated
    /// vertices.
    ///
    /// Zero-weight edges are never selected, except when every edge weighs zero or
    /// `fraction * W` rounds up to `W`: then the last edge absorbs the target.
    pub fn index_of_fraction(&self, fraction: f64) -> Option<usize> {
        match self.edges.len() {
            0 => None,
            1 => Some(0),
            degree => {
                let target = fraction * self.vertex_weight;
                let num_below = self.cumulative.partition_point(|&c| c <= target);
                Some(num_below.saturating_sub(1).min(degree - 1))
            }
        }
    }
}

#[derive(Default)]
struct MappingCache {
    persistent: FxHashMap<Node, Arc<WeightedEdgeMapping>>,
    last: Option<(Node, Arc<WeightedEdgeMapping>)>,
}

impl MappingCache {
    fn get(&self, vertex: Node) -> Option<Arc<WeightedEdgeMapping>> {
        if let Some(mapping) = self.persistent.get(&vertex) {
            return Some(mapping.clone());
        }

        match &self.last {
            Some((v, mapping)) if *v == vertex => Some(mapping.clone()),
            _ => None,
        }
    }
}

pub struct WeightedGraphQuerier<W> {
    querier: GraphQuerier,
    weight_function: W,
    degree_threshold: usize,
    cache: RwLock<MappingCache>,
    mappings_built: AtomicCell<usize>,
}

impl<W: WeightFunction> WeightedGraphQuerier<W> {
    /// Tables of vertices with fewer than `degree_threshold` adjacent edges are kept permanently.
    pub fn new(querier: GraphQuerier, weight_function: W, degree_threshold: usize) -> Self {
        let querier = querier.with_policy_name(weight_function.name());
        Self {
            querier,
            weight_function,
            degree_threshold,
            cache: RwLock::new(MappingCache::default()),
            mappings_built: AtomicCell::new(0),
        }
    }

    pub fn fully_buffered(querier: GraphQuerier, weight_function: W) -> Self {
        Self::new(querier, weight_function, FULLY_BUFFERED)
    }

    pub fn unbuffered(querier: GraphQuerier, weight_function: W) -> Self {
        Self::new(querier, weight_function, UNBUFFERED)
    }

    pub fn querier(&self) -> &GraphQuerier {
        &self.querier
    }

    pub fn policy_name(&self) -> &PolicyName {
        self.querier.policy_name()
    }

    pub fn weight_function(&self) -> &W {
        &self.weight_function
    }

    pub fn degree_threshold(&self) -> usize {
        self.degree_threshold
    }

    /// Number of vertices whose table is kept permanently.
    pub fn cached_vertices(&self) -> usize {
        self.cache.read().persistent.len()
    }

    /// Number of tables constructed so far, including rebuilds of high degree vertices.
    pub fn mappings_built(&self) -> usize {
        self.mappings_built.load()
    }

    pub fn vertex_mapping(&self, vertex: Node) -> Result<Arc<WeightedEdgeMapping>> {
        if let Some(mapping) = self.cache.read().get(vertex) {
            return Ok(mapping);
        }

        // Only one thread at a time may hold the upgradable guard, plain readers still proceed.
        let cache = self.cache.upgradable_read();
        if let Some(mapping) = cache.get(vertex) {
            return Ok(mapping);
        }

        let mapping = Arc::new(WeightedEdgeMapping::build(
            &self.querier,
            &self.weight_function,
            vertex,
        )?);
        self.mappings_built.fetch_add(1);

        let mut cache = RwLockUpgradableReadGuard::upgrade(cache);
        if mapping.degree() < self.degree_threshold {
            cache.persistent.insert(vertex, mapping.clone());
        } else {
            debug!(
                vertex,
                degree = mapping.degree(),
                threshold = self.degree_threshold,
                "built uncached weight table"
            );
            cache.last = Some((vertex, mapping.clone()));
        }

        Ok(mapping)
    }

    /// Selects the adjacent edge of `vertex` covering `fraction` of its weight; `None` if isolated.
    pub fn weighted_adjacent_edge(&self, vertex: Node, fraction: f64) -> Result<Option<Edge>> {
        let mapping = self.vertex_mapping(vertex)?;
        Ok(mapping
            .index_of_fraction(fraction)
            .map(|index| mapping.edges()[index]))
    }

    pub fn edge_weight(&self, edge: Edge) -> Result<f64> {
        self.vertex_mapping(edge.source)?
            .edge_weight(&edge)
            .ok_or(Error::UnknownEdge(edge))
    }

    pub fn vertex_weight(&self, vertex: Node) -> Result<f64> {
        Ok(self.vertex_mapping(vertex)?.vertex_weight())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graph::{AdjacencyGraph, UndirectedAdjacencyGraph};
    use crate::weight_function::{UniformWeight, WeightFn};
    use proptest::prelude::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    /// Star around vertex 0 whose edge to `i` weighs `weights[i - 1]`.
    fn star(weights: &[f64]) -> WeightedGraphQuerier<impl WeightFunction> {
        let edges = (1..=weights.len()).map(|i| Edge::new(0, i));
        let graph = AdjacencyGraph::from_edges(weights.len() + 1, edges);
        let querier = GraphQuerier::new(Arc::new(graph)).unwrap();

        let weights = weights.to_vec();
        WeightedGraphQuerier::fully_buffered(
            querier,
            WeightFn::new(PolicyName::new("T", "Test"), move |_: &GraphQuerier, e: Edge| {
                Ok(weights[e.target - 1])
            }),
        )
    }

    #[test]
    fn cumulative_table() {
        let q = star(&[1.0, 2.0, 3.0, 2.0]);
        let m = q.vertex_mapping(0).unwrap();

        assert_eq!(m.cumulative(), &[0.0, 1.0, 3.0, 6.0]);
        assert_eq!(m.vertex_weight(), 8.0);
        assert_eq!(q.vertex_weight(0).unwrap(), 8.0);
        assert_eq!(q.edge_weight(Edge::new(0, 3)).unwrap(), 3.0);
    }

    #[test]
    fn fraction_selects_bucket() {
        let q = star(&[1.0, 2.0, 3.0, 2.0]);

        // W = 8 and k / 64 are exact, so boundaries are hit precisely
        for k in 0..64 {
            let f = k as f64 / 64.0;
            let target = f * 8.0;
            let expected = match target {
                t if t < 1.0 => 1,
                t if t < 3.0 => 2,
                t if t < 6.0 => 3,
                _ => 4,
            };
            assert_eq!(
                q.weighted_adjacent_edge(0, f).unwrap(),
                Some(Edge::new(0, expected)),
                "f = {}",
                f
            );
        }
    }

    #[test]
    fn fraction_one_selects_last_edge() {
        let q = star(&[1.0, 2.0, 3.0]);
        assert_eq!(q.weighted_adjacent_edge(0, 1.0).unwrap(), Some(Edge::new(0, 3)));
    }

    #[test]
    fn zero_weight_edges_are_skipped() {
        let q = star(&[0.0, 1.0, 0.0, 1.0]);
        for k in 0..100 {
            let e = q.weighted_adjacent_edge(0, k as f64 / 100.0).unwrap().unwrap();
            assert!(e.target == 2 || e.target == 4, "{}", e);
        }
    }

    #[test]
    fn all_zero_weights_select_last_edge() {
        let q = star(&[0.0, 0.0, 0.0]);
        assert_eq!(q.vertex_weight(0).unwrap(), 0.0);
        for f in [0.0, 0.5, 0.99, 1.0] {
            assert_eq!(q.weighted_adjacent_edge(0, f).unwrap(), Some(Edge::new(0, 3)));
        }
    }

    #[test]
    fn degree_zero_and_one() {
        let q = star(&[0.0]);

        // vertex 1 has no out-edges
        for k in 0..10 {
            let f = k as f64 / 10.0;
            assert_eq!(q.weighted_adjacent_edge(1, f).unwrap(), None);
            // the single edge is returned even though its weight is zero
            assert_eq!(q.weighted_adjacent_edge(0, f).unwrap(), Some(Edge::new(0, 1)));
        }
        assert_eq!(q.vertex_weight(1).unwrap(), 0.0);
    }

    #[test]
    fn unknown_edge() {
        let q = star(&[1.0]);
        assert!(matches!(
            q.edge_weight(Edge::new(1, 0)),
            Err(Error::UnknownEdge(_))
        ));
    }

    #[test]
    fn invalid_weight_is_rejected() {
        let q = star(&[1.0, -1.0]);
        assert!(matches!(
            q.vertex_mapping(0),
            Err(Error::InvalidWeight { .. })
        ));
        assert_eq!(q.cached_vertices(), 0);
    }

    fn counting_querier(
        threshold: usize,
    ) -> (Arc<AtomicUsize>, WeightedGraphQuerier<impl WeightFunction>) {
        let graph = UndirectedAdjacencyGraph::from_edges(
            5,
            [
                Edge::new(0, 1),
                Edge::new(0, 2),
                Edge::new(0, 3),
                Edge::new(0, 4),
                Edge::new(1, 2),
            ],
        );
        let querier = GraphQuerier::new(Arc::new(graph)).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let wf = WeightFn::new(PolicyName::new("C", "Counting"), move |_: &GraphQuerier, _| {
            counter.fetch_add(1, Ordering::Relaxed);
            Ok(1.0)
        });

        (calls, WeightedGraphQuerier::new(querier, wf, threshold))
    }

    #[test]
    fn weight_function_evaluated_once_per_edge() {
        let (calls, q) = counting_querier(FULLY_BUFFERED);

        for k in 0..50 {
            q.weighted_adjacent_edge(0, k as f64 / 50.0).unwrap();
            q.vertex_weight(0).unwrap();
        }
        assert_eq!(calls.load(Ordering::Relaxed), 4);

        q.weighted_adjacent_edge(1, 0.3).unwrap();
        q.edge_weight(Edge::new(1, 2)).unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), 6);
        assert_eq!(q.cached_vertices(), 2);
        assert_eq!(q.mappings_built(), 2);
    }

    #[test]
    fn high_degree_vertices_use_single_slot() {
        // vertex 0 has degree 4 and is not persisted, vertex 1 has degree 2 and is
        let (calls, q) = counting_querier(3);

        q.vertex_weight(0).unwrap();
        q.vertex_weight(0).unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), 4);
        assert_eq!(q.cached_vertices(), 0);

        q.vertex_weight(1).unwrap();
        assert_eq!(q.cached_vertices(), 1);
        // still in the last-vertex slot, since vertex 1 went to the persistent map
        q.vertex_weight(0).unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), 6);

        q.vertex_weight(3).unwrap();
        q.vertex_weight(4).unwrap();
        assert_eq!(q.cached_vertices(), 3);
        assert_eq!(q.mappings_built(), 4);
    }

    #[test]
    fn unbuffered_keeps_only_last_vertex() {
        let (calls, q) = counting_querier(UNBUFFERED);

        q.vertex_weight(1).unwrap();
        q.vertex_weight(1).unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), 2);

        q.vertex_weight(2).unwrap();
        q.vertex_weight(1).unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), 6);
        assert_eq!(q.cached_vertices(), 0);
    }

    #[test]
    fn failing_weight_function_publishes_nothing() {
        let graph = UndirectedAdjacencyGraph::from_edges(3, [Edge::new(0, 1), Edge::new(1, 2)]);
        let querier = GraphQuerier::new(Arc::new(graph)).unwrap();
        let wf = WeightFn::new(PolicyName::new("F", "Failing"), |_: &GraphQuerier, e: Edge| {
            if e.target == 2 {
                Err(Error::WeightFunction {
                    edge: e,
                    reason: "unavailable".to_string(),
                })
            } else {
                Ok(1.0)
            }
        });
        let q = WeightedGraphQuerier::fully_buffered(querier, wf);

        assert!(q.weighted_adjacent_edge(1, 0.5).is_err());
        assert!(q.weighted_adjacent_edge(1, 0.5).is_err());
        assert_eq!(q.cached_vertices(), 0);

        assert_eq!(q.weighted_adjacent_edge(0, 0.5).unwrap(), Some(Edge::new(0, 1)));
        assert_eq!(q.cached_vertices(), 1);
        assert_eq!(q.mappings_built(), 1);
    }

    #[test]
    fn panicking_weight_function_leaves_cache_usable() {
        let graph = UndirectedAdjacencyGraph::from_edges(3, [Edge::new(0, 1), Edge::new(1, 2)]);
        let querier = GraphQuerier::new(Arc::new(graph)).unwrap();
        let wf = WeightFn::new(PolicyName::new("P", "Panicking"), |_: &GraphQuerier, e: Edge| {
            assert!(e.target != 2, "boom");
            Ok(1.0)
        });
        let q = WeightedGraphQuerier::fully_buffered(querier, wf);

        let result = catch_unwind(AssertUnwindSafe(|| q.vertex_weight(2)));
        assert!(result.is_err());
        assert_eq!(q.cached_vertices(), 0);

        assert_eq!(q.vertex_weight(0).unwrap(), 1.0);
        assert_eq!(q.cached_vertices(), 1);
    }

    #[test]
    fn concurrent_queries_build_each_vertex_once() {
        let n = 200;
        let edges = (0..n).flat_map(|u| [Edge::new(u, (u + 1) % n), Edge::new(u, (u + 7) % n)]);
        let graph = UndirectedAdjacencyGraph::from_edges(n, edges);
        let querier = GraphQuerier::new(Arc::new(graph)).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let wf = WeightFn::new(PolicyName::new("C", "Counting"), move |_: &GraphQuerier, e: Edge| {
            counter.fetch_add(1, Ordering::Relaxed);
            Ok((e.source + e.target) as f64)
        });
        let q = Arc::new(WeightedGraphQuerier::fully_buffered(querier, wf));

        let handles: Vec<_> = (0..8)
            .map(|rank| {
                let q = q.clone();
                thread::spawn(move || {
                    for round in 0..5 {
                        for v in 0..n {
                            let f = ((v * 31 + rank * 7 + round) % 97) as f64 / 97.0;
                            let e = q.weighted_adjacent_edge(v, f).unwrap().unwrap();
                            assert!(e.source == v || e.target == v);
                        }
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        // every vertex has degree 4 and each table is built exactly once
        assert_eq!(q.mappings_built(), n);
        assert_eq!(q.cached_vertices(), n);
        assert_eq!(calls.load(Ordering::Relaxed), 4 * n);
    }

    #[test]
    fn uniform_weights_follow_querier_order() {
        let graph =
            AdjacencyGraph::from_edges(4, [Edge::new(0, 3), Edge::new(0, 1), Edge::new(0, 2)]);
        let querier = GraphQuerier::new(Arc::new(graph)).unwrap();
        let q = WeightedGraphQuerier::fully_buffered(querier, UniformWeight);

        assert_eq!(q.weighted_adjacent_edge(0, 0.0).unwrap(), Some(Edge::new(0, 3)));
        assert_eq!(q.weighted_adjacent_edge(0, 0.4).unwrap(), Some(Edge::new(0, 1)));
        assert_eq!(q.weighted_adjacent_edge(0, 0.9).unwrap(), Some(Edge::new(0, 2)));
        assert_eq!(q.policy_name().short, "WRW");
    }

    proptest! {
        #[test]
        fn every_fraction_lands_in_its_bucket(
            weights in prop::collection::vec(0u32..20, 1..12),
            samples in prop::collection::vec(0.0f64..1.0, 1..64),
        ) {
            let weights: Vec<f64> = weights.into_iter().map(f64::from).collect();
            let q = star(&weights);
            let m = q.vertex_mapping(0).unwrap();
            let total = m.vertex_weight();

            for f in samples {
                let e = q.weighted_adjacent_edge(0, f).unwrap().unwrap();
                let i = e.target - 1;

                if weights.len() == 1 {
                    prop_assert_eq!(i, 0);
                    continue;
                }

                let lower = m.cumulative()[i];
                let upper = m.cumulative().get(i + 1).copied().unwrap_or(total);
                let target = f * total;
                prop_assert!(lower <= target, "lower {} target {}", lower, target);
                prop_assert!(
                    target < upper || i + 1 == weights.len(),
                    "upper {} target {}",
                    upper,
                    target
                );
            }
        }
    }
}

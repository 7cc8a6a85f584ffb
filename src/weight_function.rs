//! Edge weight functions biasing the weighted random walks.

use super::{Edge, Node};
use crate::error::Result;
use crate::querier::{GraphQuerier, PolicyName};
use fxhash::FxHashSet;

const NUM_PRECOMPUTED: usize = 100;

/// Maps an edge to a finite non-negative weight.
///
/// Implementations must be deterministic for a fixed graph and edge, since
/// [`WeightedGraphQuerier`](crate::querier::WeightedGraphQuerier) evaluates
/// every edge only once and caches the result.
pub trait WeightFunction: Send + Sync {
    fn weight(&self, graph: &GraphQuerier, edge: Edge) -> Result<f64>;

    fn name(&self) -> PolicyName {
        PolicyName::new("CWRW", "Custom Weighted Random Walk")
    }
}

impl<F> WeightFunction for F
where
    F: Fn(&GraphQuerier, Edge) -> Result<f64> + Send + Sync,
{
    fn weight(&self, graph: &GraphQuerier, edge: Edge) -> Result<f64> {
        self(graph, edge)
    }
}

/// Closure weight function carrying its own policy name.
pub struct WeightFn<F> {
    name: PolicyName,
    function: F,
}

impl<F> WeightFn<F>
where
    F: Fn(&GraphQuerier, Edge) -> Result<f64> + Send + Sync,
{
    pub fn new(name: PolicyName, function: F) -> Self {
        Self { name, function }
    }
}

impl<F> WeightFunction for WeightFn<F>
where
    F: Fn(&GraphQuerier, Edge) -> Result<f64> + Send + Sync,
{
    fn weight(&self, graph: &GraphQuerier, edge: Edge) -> Result<f64> {
        (self.function)(graph, edge)
    }

    fn name(&self) -> PolicyName {
        self.name.clone()
    }
}

/// Every edge weighs 1, so the weighted walk behaves like a simple one.
#[derive(Clone, Copy, Debug, Default)]
pub struct UniformWeight;

impl WeightFunction for UniformWeight {
    fn weight(&self, _graph: &GraphQuerier, _edge: Edge) -> Result<f64> {
        Ok(1.0)
    }

    fn name(&self) -> PolicyName {
        PolicyName::new("WRW", "Weighted Random Walk")
    }
}

/// Implements the function `f(d) = d**exponent + offset` with pre-computation of the first few
/// values.
///
/// # Example
/// ```
/// use biased_sampling::weight_function::DegreePower;
/// let dp = DegreePower::new(2.0, 5.0);
///
/// let computed = dp.get(3);
/// let expected = 3.0 * 3.0 + 5.0;
///
/// assert!( (computed - expected).abs() < 1e-6 );
/// ```
#[derive(Clone, Debug)]
pub struct DegreePower {
    exponent: f64,
    offset: f64,
    precomputed: [f64; NUM_PRECOMPUTED],
}

impl DegreePower {
    pub fn new(exponent: f64, offset: f64) -> Self {
        let mut precomputed = [0.0; NUM_PRECOMPUTED];

        for (degree, weight) in precomputed.iter_mut().enumerate() {
            *weight = Self::compute(exponent, offset, degree);
        }

        Self {
            exponent,
            offset,
            precomputed,
        }
    }

    pub fn get(&self, degree: Node) -> f64 {
        match self.precomputed.get(degree) {
            Some(&weight) => weight,
            None => Self::compute(self.exponent, self.offset, degree),
        }
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn exponent(&self) -> f64 {
        self.exponent
    }

    #[inline]
    fn compute(exponent: f64, offset: f64, degree: Node) -> f64 {
        (degree as f64).powf(exponent) + offset
    }
}

/// Biases towards high degree regions: `w(s, t) = (deg(s) * deg(t))^beta`.
#[derive(Clone, Debug)]
pub struct DegreeBias {
    power: DegreePower,
}

impl DegreeBias {
    pub fn new(beta: f64) -> Self {
        Self {
            power: DegreePower::new(beta, 0.0),
        }
    }

    pub fn optimized() -> Self {
        Self::new(2.0 / 3.0)
    }

    pub fn general() -> Self {
        Self::new(0.5)
    }

    pub fn beta(&self) -> f64 {
        self.power.exponent()
    }
}

impl WeightFunction for DegreeBias {
    fn weight(&self, graph: &GraphQuerier, edge: Edge) -> Result<f64> {
        // (a * b)^beta = a^beta * b^beta keeps both factors in the table
        Ok(self.power.get(graph.adjacent_degree(edge.source))
            * self.power.get(graph.adjacent_degree(edge.target)))
    }

    fn name(&self) -> PolicyName {
        PolicyName::owned(
            format!("DBRW{}", self.beta()),
            format!("Degree Biased Random Walk (beta = {})", self.beta()),
        )
    }
}

/// `w(s, t) = 1/deg(s) + 1/deg(t)`; endpoints without adjacent edges contribute nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct VertexReciprocal;

impl WeightFunction for VertexReciprocal {
    fn weight(&self, graph: &GraphQuerier, edge: Edge) -> Result<f64> {
        let reciprocal = |v| match graph.adjacent_degree(v) {
            0 => 0.0,
            d => 1.0 / d as f64,
        };
        Ok(reciprocal(edge.source) + reciprocal(edge.target))
    }

    fn name(&self) -> PolicyName {
        PolicyName::new("VRW", "Vertex Random Walk")
    }
}

/// `w(s, t) = 1 + number of triangles the edge closes`; self-loops weigh 1.
#[derive(Clone, Copy, Debug, Default)]
pub struct TriangleWeight;

impl TriangleWeight {
    fn neighbours(
        graph: &GraphQuerier,
        edge: Edge,
        vertex: Node,
    ) -> impl Iterator<Item = Node> + '_ {
        let edges = graph.adjacent_edges(vertex).into_owned();
        edges
            .into_iter()
            .filter(move |e| *e != edge && !e.is_self_loop())
            .map(move |e| e.other_endpoint(vertex))
    }
}

impl WeightFunction for TriangleWeight {
    fn weight(&self, graph: &GraphQuerier, edge: Edge) -> Result<f64> {
        if edge.is_self_loop() {
            return Ok(1.0);
        }

        let at_source: FxHashSet<Node> = Self::neighbours(graph, edge, edge.source).collect();
        let triangles = Self::neighbours(graph, edge, edge.target)
            .filter(|v| at_source.contains(v))
            .count();

        Ok(1.0 + triangles as f64)
    }

    fn name(&self) -> PolicyName {
        PolicyName::new("TRW", "Triangle Random Walk")
    }
}

/// Adds `bias` for every endpoint among the first `partition_size` vertices.
#[derive(Clone, Copy, Debug)]
pub struct HiddenPartition {
    pub bias: f64,
    pub partition_size: usize,
}

impl HiddenPartition {
    pub fn new(bias: f64, partition_size: usize) -> Self {
        Self {
            bias,
            partition_size,
        }
    }
}

impl WeightFunction for HiddenPartition {
    fn weight(&self, _graph: &GraphQuerier, edge: Edge) -> Result<f64> {
        let term = |v: Node| if v < self.partition_size { self.bias } else { 0.0 };
        Ok(1.0 + term(edge.source) + term(edge.target))
    }

    fn name(&self) -> PolicyName {
        PolicyName::new("HPRW", "Hidden Partition Random Walk")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graph::UndirectedAdjacencyGraph;
    use std::sync::Arc;

    fn validate(dp: DegreePower, reference: impl Fn(Node) -> f64) {
        for d in 0..2 * NUM_PRECOMPUTED {
            let w = dp.get(d);
            let r = reference(d);

            let rel_err = ((w - r) / r).abs();

            assert!(
                w == r || rel_err < 1e-6,
                "dp: {} ref: {} rel_err: {}      exp: {} offset: {} degree: {}",
                w,
                r,
                rel_err,
                dp.exponent,
                dp.offset,
                d
            );
        }
    }

    #[test]
    fn cross_constant() {
        validate(DegreePower::new(0.0, 0.0), |_| 1.0);
        validate(DegreePower::new(0.0, 1.0), |_| 2.0);
    }

    #[test]
    fn cross_sqrt() {
        validate(DegreePower::new(0.5, 0.0), |d| (d as f64).sqrt());
        validate(DegreePower::new(0.5, 2.0), |d| (d as f64).sqrt() + 2.0);
    }

    #[test]
    fn cross_two_thirds() {
        validate(DegreePower::new(2.0 / 3.0, 0.0), |d| (d as f64).cbrt().powi(2));
    }

    /// Triangle 0-1-2 with a pendant vertex 3 at 2 and a self-loop at 3.
    fn querier() -> GraphQuerier {
        let graph = UndirectedAdjacencyGraph::from_edges(
            4,
            [
                Edge::new(0, 1),
                Edge::new(1, 2),
                Edge::new(2, 0),
                Edge::new(2, 3),
                Edge::new(3, 3),
            ],
        );
        GraphQuerier::new(Arc::new(graph)).unwrap()
    }

    #[test]
    fn degree_bias() {
        let q = querier();
        for wf in [DegreeBias::general(), DegreeBias::optimized(), DegreeBias::new(1.3)] {
            for e in [Edge::new(0, 1), Edge::new(2, 3), Edge::new(1, 2)] {
                let d = (q.adjacent_degree(e.source) * q.adjacent_degree(e.target)) as f64;
                let w = wf.weight(&q, e).unwrap();
                assert!((w - d.powf(wf.beta())).abs() < 1e-9, "{} {}", e, w);
            }
        }
    }

    #[test]
    fn vertex_reciprocal() {
        let q = querier();
        let w = VertexReciprocal.weight(&q, Edge::new(1, 2)).unwrap();
        assert!((w - (1.0 / 2.0 + 1.0 / 3.0)).abs() < 1e-12);
    }

    #[test]
    fn triangles() {
        let q = querier();
        assert_eq!(TriangleWeight.weight(&q, Edge::new(0, 1)).unwrap(), 2.0);
        assert_eq!(TriangleWeight.weight(&q, Edge::new(2, 0)).unwrap(), 2.0);
        assert_eq!(TriangleWeight.weight(&q, Edge::new(2, 3)).unwrap(), 1.0);
        assert_eq!(TriangleWeight.weight(&q, Edge::new(3, 3)).unwrap(), 1.0);
    }

    #[test]
    fn hidden_partition() {
        let q = querier();
        let wf = HiddenPartition::new(0.5, 2);
        assert_eq!(wf.weight(&q, Edge::new(0, 1)).unwrap(), 2.0);
        assert_eq!(wf.weight(&q, Edge::new(1, 2)).unwrap(), 1.5);
        assert_eq!(wf.weight(&q, Edge::new(2, 3)).unwrap(), 1.0);
    }

    #[test]
    fn closures_are_weight_functions() {
        let q = querier();
        let wf = |_: &GraphQuerier, e: Edge| -> Result<f64> { Ok(e.target as f64) };
        assert_eq!(wf.weight(&q, Edge::new(0, 3)).unwrap(), 3.0);
        assert_eq!(wf.name().short, "CWRW");
    }
}

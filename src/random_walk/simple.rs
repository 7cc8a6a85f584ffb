use super::{RandomWalk, StepPolicy};
use crate::error::Result;
use crate::querier::{GraphQuerier, PolicyName, SIMPLE_RANDOM_WALK};
use crate::{Edge, Node};
use rand::Rng;
use std::sync::Arc;

/// Moves along a uniformly chosen adjacent edge.
#[derive(Clone, Debug)]
pub struct SimplePolicy {
    querier: Arc<GraphQuerier>,
}

impl SimplePolicy {
    pub fn new(querier: Arc<GraphQuerier>) -> Self {
        Self { querier }
    }

    pub fn querier(&self) -> &GraphQuerier {
        &self.querier
    }

    pub fn degree(&self, state: Node) -> usize {
        self.querier.adjacent_degree(state)
    }
}

impl StepPolicy for SimplePolicy {
    fn name(&self) -> PolicyName {
        SIMPLE_RANDOM_WALK
    }

    fn choose_next(&self, current: Node, rng: &mut impl Rng) -> Result<Option<Edge>> {
        Ok(match self.querier.adjacent_degree(current) {
            0 => None,
            degree => Some(self.querier.adjacent_edge(current, rng.gen_range(0..degree))),
        })
    }

    fn adjacent_transition_count(&self, state: Node) -> usize {
        self.querier.adjacent_degree(state)
    }

    fn adjacent_transition(&self, state: Node, index: usize) -> Option<Edge> {
        Some(self.querier.adjacent_edge(state, index))
    }

    fn state_weight(&self, state: Node) -> Result<f64> {
        Ok(self.querier.adjacent_degree(state) as f64)
    }

    fn transition_weight(&self, _from: Node, _transition: Option<Edge>) -> Result<f64> {
        Ok(1.0)
    }
}

impl<R: Rng> RandomWalk<SimplePolicy, R> {
    pub fn simple(initial_state: Node, querier: Arc<GraphQuerier>, rng: R) -> Self {
        Self::new(initial_state, SimplePolicy::new(querier), rng)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graph::UndirectedAdjacencyGraph;
    use crate::random_walk::Walk;
    use pcg_rand::Pcg64;
    use rand::SeedableRng;

    #[test]
    fn uniform_over_adjacent_edges() {
        let graph = UndirectedAdjacencyGraph::from_edges(
            5,
            (1..5).map(|v| Edge::new(0, v)),
        );
        let querier = Arc::new(GraphQuerier::new(Arc::new(graph)).unwrap());
        let mut walk = RandomWalk::simple(0, querier, Pcg64::seed_from_u64(11));

        let mut counts = [0usize; 5];
        let rounds = 40_000;
        for _ in 0..rounds {
            counts[walk.next_sample().unwrap()] += 1;
            // back to the center of the star
            walk.next_sample().unwrap();
        }

        assert_eq!(counts[0], 0);
        for &c in &counts[1..] {
            let freq = c as f64 / rounds as f64;
            assert!((freq - 0.25).abs() < 0.02, "{:?}", counts);
        }
    }

    #[test]
    fn weights() {
        let graph = UndirectedAdjacencyGraph::from_edges(3, [Edge::new(0, 1), Edge::new(0, 2)]);
        let querier = Arc::new(GraphQuerier::new(Arc::new(graph)).unwrap());
        let policy = SimplePolicy::new(querier);

        assert_eq!(policy.state_weight(0).unwrap(), 2.0);
        assert_eq!(policy.adjacent_transition_count(2), 1);
        assert_eq!(policy.adjacent_transition(0, 1), Some(Edge::new(0, 2)));
        assert_eq!(policy.transition_weight(0, Some(Edge::new(0, 1))).unwrap(), 1.0);
    }
}

use super::{RandomWalk, SimplePolicy, StepPolicy};
use crate::error::Result;
use crate::querier::{GraphQuerier, PolicyName};
use crate::{Edge, Node};
use rand::Rng;
use std::sync::Arc;

pub const METROPOLIS_HASTINGS: PolicyName =
    PolicyName::new("MHRW", "Metropolis Hastings Random Walk");

/// Proposes a uniform adjacent edge and accepts it with probability
/// `min(1, deg(current) / deg(proposed))`, which makes the stationary
/// distribution uniform over the vertices.
#[derive(Clone, Debug)]
pub struct MetropolisPolicy {
    proposal: SimplePolicy,
}

impl MetropolisPolicy {
    pub fn new(querier: Arc<GraphQuerier>) -> Self {
        Self {
            proposal: SimplePolicy::new(querier),
        }
    }

    fn reciprocal_degree(&self, state: Node) -> f64 {
        match self.proposal.degree(state) {
            0 => f64::INFINITY,
            d => 1.0 / d as f64,
        }
    }
}

impl StepPolicy for MetropolisPolicy {
    fn name(&self) -> PolicyName {
        METROPOLIS_HASTINGS
    }

    fn choose_next(&self, current: Node, rng: &mut impl Rng) -> Result<Option<Edge>> {
        let Some(proposed) = self.proposal.choose_next(current, rng)? else {
            return Ok(None);
        };

        let target_degree = self.proposal.degree(proposed.other_endpoint(current));
        if target_degree == 0 {
            // sink of a directed graph, the ratio is unbounded
            return Ok(Some(proposed));
        }

        let ratio = self.proposal.degree(current) as f64 / target_degree as f64;
        let u: f64 = rng.gen();
        Ok((u <= ratio).then_some(proposed))
    }

    fn adjacent_transition_count(&self, state: Node) -> usize {
        self.proposal.adjacent_transition_count(state)
    }

    fn adjacent_transition(&self, state: Node, index: usize) -> Option<Edge> {
        self.proposal.adjacent_transition(state, index)
    }

    fn state_weight(&self, _state: Node) -> Result<f64> {
        Ok(1.0)
    }

    fn transition_weight(&self, from: Node, transition: Option<Edge>) -> Result<f64> {
        Ok(match transition {
            Some(edge) => self
                .reciprocal_degree(edge.source)
                .min(self.reciprocal_degree(edge.target)),
            None => match self.proposal.degree(from) {
                0 => 1.0,
                d => 1.0 - 1.0 / d as f64,
            },
        })
    }
}

impl<R: Rng> RandomWalk<MetropolisPolicy, R> {
    pub fn metropolis(initial_state: Node, querier: Arc<GraphQuerier>, rng: R) -> Self {
        Self::new(initial_state, MetropolisPolicy::new(querier), rng)
    }
}

use super::{RandomWalk, StepPolicy};
use crate::error::{Error, Result};
use crate::querier::{PolicyName, WeightedGraphQuerier};
use crate::weight_function::WeightFunction;
use crate::{Edge, Node};
use rand::Rng;
use std::sync::Arc;

/// Moves along an adjacent edge chosen proportionally to its weight.
pub struct WeightedPolicy<W> {
    querier: Arc<WeightedGraphQuerier<W>>,
}

impl<W> Clone for WeightedPolicy<W> {
    fn clone(&self) -> Self {
        Self {
            querier: self.querier.clone(),
        }
    }
}

impl<W: WeightFunction> WeightedPolicy<W> {
    pub fn new(querier: Arc<WeightedGraphQuerier<W>>) -> Self {
        Self { querier }
    }

    pub fn querier(&self) -> &WeightedGraphQuerier<W> {
        &self.querier
    }
}

impl<W: WeightFunction> StepPolicy for WeightedPolicy<W> {
    fn name(&self) -> PolicyName {
        self.querier.policy_name().clone()
    }

    fn choose_next(&self, current: Node, rng: &mut impl Rng) -> Result<Option<Edge>> {
        let fraction: f64 = rng.gen();
        self.querier.weighted_adjacent_edge(current, fraction)
    }

    fn adjacent_transition_count(&self, state: Node) -> usize {
        self.querier.querier().adjacent_degree(state)
    }

    fn adjacent_transition(&self, state: Node, index: usize) -> Option<Edge> {
        Some(self.querier.querier().adjacent_edge(state, index))
    }

    fn state_weight(&self, state: Node) -> Result<f64> {
        self.querier.vertex_weight(state)
    }

    fn transition_weight(&self, from: Node, transition: Option<Edge>) -> Result<f64> {
        let Some(edge) = transition else {
            return Ok(0.0);
        };

        // the table of `from` also holds in-edges of bidirectional graphs
        self.querier
            .vertex_mapping(from)?
            .edge_weight(&edge)
            .ok_or(Error::UnknownEdge(edge))
    }
}

impl<W: WeightFunction, R: Rng> RandomWalk<WeightedPolicy<W>, R> {
    pub fn weighted(initial_state: Node, querier: Arc<WeightedGraphQuerier<W>>, rng: R) -> Self {
        Self::new(initial_state, WeightedPolicy::new(querier), rng)
    }
}

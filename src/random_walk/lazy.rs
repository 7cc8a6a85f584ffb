use super::{RandomWalk, SimplePolicy, StepPolicy, WeightedPolicy};
use crate::error::Result;
use crate::querier::{GraphQuerier, PolicyName, WeightedGraphQuerier};
use crate::weight_function::WeightFunction;
use crate::{Edge, Node};
use rand::Rng;
use std::sync::Arc;

const STAY_PROBABILITY: f64 = 0.5;

/// Stays in place with probability one half, otherwise defers to the wrapped policy.
///
/// Staying counts as an additional virtual self-loop transition, which is
/// reported as the last adjacent transition (`None`).
#[derive(Clone, Debug)]
pub struct LazyPolicy<P> {
    inner: P,
}

impl<P: StepPolicy> LazyPolicy<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: StepPolicy> StepPolicy for LazyPolicy<P> {
    fn name(&self) -> PolicyName {
        let inner = self.inner.name();
        PolicyName::owned(format!("L{}", inner.short), format!("Lazy {}", inner.long))
    }

    fn choose_next(&self, current: Node, rng: &mut impl Rng) -> Result<Option<Edge>> {
        if rng.gen_bool(STAY_PROBABILITY) {
            Ok(None)
        } else {
            self.inner.choose_next(current, rng)
        }
    }

    fn time_increment(&self, current: Node, rng: &mut impl Rng) -> Result<f64> {
        self.inner.time_increment(current, rng)
    }

    fn adjacent_transition_count(&self, state: Node) -> usize {
        self.inner.adjacent_transition_count(state) + 1
    }

    fn adjacent_transition(&self, state: Node, index: usize) -> Option<Edge> {
        if index == self.inner.adjacent_transition_count(state) {
            None
        } else {
            self.inner.adjacent_transition(state, index)
        }
    }

    fn state_weight(&self, state: Node) -> Result<f64> {
        self.inner.state_weight(state)
    }

    /// Probability of the transition: one half for staying, otherwise half the inner probability.
    fn transition_weight(&self, from: Node, transition: Option<Edge>) -> Result<f64> {
        if transition.is_none() {
            // an isolated state has no other way out
            return Ok(match self.inner.adjacent_transition_count(from) {
                0 => 1.0,
                _ => STAY_PROBABILITY,
            });
        }

        let state_weight = self.inner.state_weight(from)?;
        if state_weight <= 0.0 {
            return Ok(0.0);
        }

        let weight = self.inner.transition_weight(from, transition)?;
        Ok((1.0 - STAY_PROBABILITY) * weight / state_weight)
    }
}

impl<R: Rng> RandomWalk<LazyPolicy<SimplePolicy>, R> {
    pub fn lazy_simple(initial_state: Node, querier: Arc<GraphQuerier>, rng: R) -> Self {
        Self::new(initial_state, LazyPolicy::new(SimplePolicy::new(querier)), rng)
    }
}

impl<W: WeightFunction, R: Rng> RandomWalk<LazyPolicy<WeightedPolicy<W>>, R> {
    pub fn lazy_weighted(
        initial_state: Node,
        querier: Arc<WeightedGraphQuerier<W>>,
        rng: R,
    ) -> Self {
        Self::new(initial_state, LazyPolicy::new(WeightedPolicy::new(querier)), rng)
    }
}

use super::{RandomWalk, SimplePolicy, StepPolicy};
use crate::error::Result;
use crate::querier::{GraphQuerier, PolicyName, SIMPLE_RANDOM_WALK};
use crate::{Edge, Node};
use rand::Rng;
use rand_distr::Exp1;
use std::sync::Arc;

/// Time a continuous time walk spends in a state of degree `d` before leaving it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HoldingTime {
    /// `1 / d`
    Reciprocal,
    /// `1 / d`, reported under its own name.
    DistributionalIncrement,
    /// `Exp(1) / d`, the holding time of a continuous time Markov chain with exit rate `d`.
    NegativeExponential,
}

impl HoldingTime {
    fn name(self) -> PolicyName {
        match self {
            HoldingTime::Reciprocal => {
                PolicyName::new("CTSRW", "Continuous Time Simple Random Walk")
            }
            HoldingTime::DistributionalIncrement => {
                PolicyName::new("DIRW", "Random Walk with Distributional Increments")
            }
            HoldingTime::NegativeExponential => {
                PolicyName::new("CTRW", "Continuous Time Random Walk")
            }
        }
    }

    /// A state without transitions holds for one time unit.
    pub fn sample(self, degree: usize, rng: &mut impl Rng) -> f64 {
        if degree == 0 {
            return 1.0;
        }

        let degree = degree as f64;
        match self {
            HoldingTime::Reciprocal | HoldingTime::DistributionalIncrement => 1.0 / degree,
            HoldingTime::NegativeExponential => rng.sample::<f64, _>(Exp1) / degree,
        }
    }
}

/// Takes the steps of the wrapped policy but advances the clock by a holding time.
#[derive(Clone, Debug)]
pub struct ContinuousTimePolicy<P> {
    inner: P,
    holding_time: HoldingTime,
}

impl<P: StepPolicy> ContinuousTimePolicy<P> {
    pub fn new(inner: P, holding_time: HoldingTime) -> Self {
        Self {
            inner,
            holding_time,
        }
    }

    pub fn holding_time(&self) -> HoldingTime {
        self.holding_time
    }
}

impl<P: StepPolicy> StepPolicy for ContinuousTimePolicy<P> {
    fn name(&self) -> PolicyName {
        let inner = self.inner.name();
        if inner == SIMPLE_RANDOM_WALK {
            self.holding_time.name()
        } else {
            let own = self.holding_time.name();
            PolicyName::owned(
                format!("{}-{}", own.short, inner.short),
                format!("{} over {}", own.long, inner.long),
            )
        }
    }

    fn choose_next(&self, current: Node, rng: &mut impl Rng) -> Result<Option<Edge>> {
        self.inner.choose_next(current, rng)
    }

    fn time_increment(&self, current: Node, rng: &mut impl Rng) -> Result<f64> {
        let degree = self.inner.adjacent_transition_count(current);
        Ok(self.holding_time.sample(degree, rng))
    }

    fn adjacent_transition_count(&self, state: Node) -> usize {
        self.inner.adjacent_transition_count(state)
    }

    fn adjacent_transition(&self, state: Node, index: usize) -> Option<Edge> {
        self.inner.adjacent_transition(state, index)
    }

    fn state_weight(&self, state: Node) -> Result<f64> {
        self.inner.state_weight(state)
    }

    fn transition_weight(&self, from: Node, transition: Option<Edge>) -> Result<f64> {
        self.inner.transition_weight(from, transition)
    }
}

impl<R: Rng> RandomWalk<ContinuousTimePolicy<SimplePolicy>, R> {
    pub fn continuous_time(initial_state: Node, querier: Arc<GraphQuerier>, rng: R) -> Self {
        Self::with_holding_time(initial_state, querier, HoldingTime::Reciprocal, rng)
    }

    pub fn distributional_increments(
        initial_state: Node,
        querier: Arc<GraphQuerier>,
        rng: R,
    ) -> Self {
        Self::with_holding_time(
            initial_state,
            querier,
            HoldingTime::DistributionalIncrement,
            rng,
        )
    }

    pub fn negative_exponential(initial_state: Node, querier: Arc<GraphQuerier>, rng: R) -> Self {
        Self::with_holding_time(initial_state, querier, HoldingTime::NegativeExponential, rng)
    }

    pub fn with_holding_time(
        initial_state: Node,
        querier: Arc<GraphQuerier>,
        holding_time: HoldingTime,
        rng: R,
    ) -> Self {
        let policy = ContinuousTimePolicy::new(SimplePolicy::new(querier), holding_time);
        Self::new(initial_state, policy, rng)
    }
}

//! Random walk state machine.
//!
//! A [`RandomWalk`] holds the walk state and delegates the choice of the next
//! transition to a [`StepPolicy`]. Policies compose: [`LazyPolicy`] and
//! [`ContinuousTimePolicy`] wrap any other policy.

pub mod continuous;
pub mod lazy;
pub mod metropolis;
pub mod simple;
pub mod weighted;

pub use continuous::{ContinuousTimePolicy, HoldingTime};
pub use lazy::LazyPolicy;
pub use metropolis::MetropolisPolicy;
pub use simple::SimplePolicy;
pub use weighted::WeightedPolicy;

use crate::error::Result;
use crate::querier::PolicyName;
use crate::{Edge, Node};
use rand::Rng;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::warn;

/// Decides where a walk goes next and how its transitions are weighted.
pub trait StepPolicy: Send {
    fn name(&self) -> PolicyName;

    /// Returns the transition to take from `current`, `None` to stay.
    fn choose_next(&self, current: Node, rng: &mut impl Rng) -> Result<Option<Edge>>;

    /// Simulated time spent in `current` before the step is taken.
    fn time_increment(&self, _current: Node, _rng: &mut impl Rng) -> Result<f64> {
        Ok(1.0)
    }

    fn adjacent_transition_count(&self, state: Node) -> usize;

    /// # Panics
    /// If `index` is not below [`Self::adjacent_transition_count`].
    fn adjacent_transition(&self, state: Node, index: usize) -> Option<Edge>;

    fn state_weight(&self, state: Node) -> Result<f64>;

    /// Weight of taking `transition` from `from`; `None` stands for staying at `from`.
    fn transition_weight(&self, from: Node, transition: Option<Edge>) -> Result<f64>;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepEvent {
    /// State the transition was taken from.
    pub previous: Node,
    pub current: Node,
    pub transition: Option<Edge>,
    pub weight: f64,
    pub discreet_steps: u64,
    pub total_steps: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WalkSummary {
    pub name: PolicyName,
    pub initial_state: Node,
    pub current_state: Node,
    pub discreet_steps: u64,
    pub total_steps: f64,
}

pub type StepCallback = Box<dyn FnMut(&StepEvent) + Send>;
pub type TerminatedCallback = Box<dyn FnMut(&WalkSummary) + Send>;

/// Object safe surface of a random walk as used by the samplers.
pub trait Walk: Send {
    fn name(&self) -> PolicyName;

    /// Resets the counters and moves the walk back to its initial state.
    fn initialize(&mut self);

    /// Simulates one step. On error the walk state is left unchanged.
    fn step(&mut self) -> Result<StepEvent>;

    fn next_sample(&mut self) -> Result<Node> {
        Ok(self.step()?.current)
    }

    /// Raises the terminated event once; it does not prevent further steps.
    fn terminate(&mut self);

    fn is_terminated(&self) -> bool;

    fn current_state(&self) -> Node;
    fn previous_state(&self) -> Node;
    fn initial_state(&self) -> Node;
    fn discreet_steps(&self) -> u64;
    fn total_steps(&self) -> f64;

    fn adjacent_transition_count(&self, state: Node) -> usize;
    fn adjacent_transition(&self, state: Node, index: usize) -> Option<Edge>;
    fn state_weight(&self, state: Node) -> Result<f64>;
    fn transition_weight(&self, from: Node, transition: Option<Edge>) -> Result<f64>;

    /// Registers a callback run synchronously after every step, in registration order.
    fn on_step(&mut self, callback: StepCallback);
    fn on_terminated(&mut self, callback: TerminatedCallback);

    fn summary(&self) -> WalkSummary;
}

pub struct RandomWalk<P, R> {
    policy: P,
    rng: R,
    name: PolicyName,

    initial_state: Node,
    current_state: Node,
    previous_state: Node,
    discreet_steps: u64,
    total_steps: f64,
    terminated: bool,

    step_callbacks: Vec<StepCallback>,
    terminated_callbacks: Vec<TerminatedCallback>,
}

impl<P: StepPolicy, R: Rng> RandomWalk<P, R> {
    pub fn new(initial_state: Node, policy: P, rng: R) -> Self {
        let name = policy.name();
        Self {
            policy,
            rng,
            name,
            initial_state,
            current_state: initial_state,
            previous_state: initial_state,
            discreet_steps: 0,
            total_steps: 0.0,
            terminated: false,
            step_callbacks: Vec::new(),
            terminated_callbacks: Vec::new(),
        }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }
}

/// Runs every callback under `catch_unwind` and detaches those that panic.
fn notify<T, F: ?Sized + FnMut(&T)>(
    callbacks: &mut Vec<Box<F>>,
    arg: &T,
    walk: &PolicyName,
    kind: &str,
) {
    callbacks.retain_mut(|callback| {
        let outcome = catch_unwind(AssertUnwindSafe(|| callback(arg)));
        if outcome.is_err() {
            warn!(walk = %walk, kind, "callback panicked and was detached");
        }
        outcome.is_ok()
    });
}

impl<P: StepPolicy, R: Rng + Send> Walk for RandomWalk<P, R> {
    fn name(&self) -> PolicyName {
        self.name.clone()
    }

    fn initialize(&mut self) {
        self.current_state = self.initial_state;
        self.previous_state = self.initial_state;
        self.discreet_steps = 0;
        self.total_steps = 0.0;
        self.terminated = false;
    }

    fn step(&mut self) -> Result<StepEvent> {
        let from = self.current_state;

        let next = self.policy.choose_next(from, &mut self.rng)?;
        let increment = self.policy.time_increment(from, &mut self.rng)?;
        let weight = self.policy.transition_weight(from, next)?;
        debug_assert!(increment >= 0.0);

        self.total_steps += increment;
        self.discreet_steps += 1;
        self.previous_state = from;
        if let Some(edge) = next {
            self.current_state = edge.other_endpoint(from);
        }

        let event = StepEvent {
            previous: from,
            current: self.current_state,
            transition: next,
            weight,
            discreet_steps: self.discreet_steps,
            total_steps: self.total_steps,
        };

        notify(&mut self.step_callbacks, &event, &self.name, "step");

        Ok(event)
    }

    fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;

        let summary = self.summary();
        notify(&mut self.terminated_callbacks, &summary, &self.name, "terminated");
    }

    fn is_terminated(&self) -> bool {
        self.terminated
    }

    fn current_state(&self) -> Node {
        self.current_state
    }

    fn previous_state(&self) -> Node {
        self.previous_state
    }

    fn initial_state(&self) -> Node {
        self.initial_state
    }

    fn discreet_steps(&self) -> u64 {
        self.discreet_steps
    }

    fn total_steps(&self) -> f64 {
        self.total_steps
    }

    fn adjacent_transition_count(&self, state: Node) -> usize {
        self.policy.adjacent_transition_count(state)
    }

    fn adjacent_transition(&self, state: Node, index: usize) -> Option<Edge> {
        self.policy.adjacent_transition(state, index)
    }

    fn state_weight(&self, state: Node) -> Result<f64> {
        self.policy.state_weight(state)
    }

    fn transition_weight(&self, from: Node, transition: Option<Edge>) -> Result<f64> {
        self.policy.transition_weight(from, transition)
    }

    fn on_step(&mut self, callback: StepCallback) {
        self.step_callbacks.push(callback);
    }

    fn on_terminated(&mut self, callback: TerminatedCallback) {
        self.terminated_callbacks.push(callback);
    }

    fn summary(&self) -> WalkSummary {
        WalkSummary {
            name: self.name.clone(),
            initial_state: self.initial_state,
            current_state: self.current_state,
            discreet_steps: self.discreet_steps,
            total_steps: self.total_steps,
        }
    }
}

//! Conditions deciding when a sampler stops driving its walk.
//!
//! A condition sees every step event through [`TerminationCondition::observe`]
//! and is queried after each step.

use crate::random_walk::{StepEvent, Walk};
use crate::Node;
use fxhash::{FxHashMap, FxHashSet};

pub trait TerminationCondition: Send {
    fn observe(&mut self, _event: &StepEvent) {}

    fn is_met(&self, walk: &dyn Walk) -> bool;
}

/// Stops after a number of discrete steps.
#[derive(Clone, Debug)]
pub struct StepsCondition {
    target: f64,
}

impl StepsCondition {
    pub fn new(steps: u64) -> Self {
        Self {
            target: steps as f64,
        }
    }

    /// The `i`-th of `loops` conditions, spreading targets linearly up to `max_steps`.
    pub fn incremental(loops: usize, max_steps: u64, i: usize) -> Self {
        Self {
            target: (i + 1) as f64 / loops as f64 * max_steps as f64,
        }
    }

    /// The `i`-th of `loops` conditions with targets `n^e` for exponents spread over
    /// `(min_exp, max_exp]`.
    pub fn sublinear(
        vertex_count: usize,
        loops: usize,
        min_exp: f64,
        max_exp: f64,
        i: usize,
    ) -> Self {
        let step = (max_exp - min_exp) / loops as f64;
        Self {
            target: (vertex_count as f64).powf(min_exp + (i + 1) as f64 * step),
        }
    }

    pub fn target(&self) -> f64 {
        self.target
    }
}

impl TerminationCondition for StepsCondition {
    fn is_met(&self, walk: &dyn Walk) -> bool {
        walk.discreet_steps() as f64 >= self.target
    }
}

/// Stops once the simulated time reaches the target; for discrete walks the same as steps.
#[derive(Clone, Debug)]
pub struct TimeCondition {
    target: f64,
}

impl TimeCondition {
    pub fn new(time: f64) -> Self {
        Self { target: time }
    }
}

impl TerminationCondition for TimeCondition {
    fn is_met(&self, walk: &dyn Walk) -> bool {
        walk.total_steps() >= self.target
    }
}

/// Stops once a fraction of all vertices has been visited.
#[derive(Clone, Debug)]
pub struct CoverageCondition {
    visited: FxHashSet<Node>,
    vertex_count: usize,
    fraction: f64,
}

impl CoverageCondition {
    pub fn new(vertex_count: usize, fraction: f64) -> Self {
        Self {
            visited: FxHashSet::default(),
            vertex_count,
            fraction,
        }
    }

    pub fn coverage(&self) -> f64 {
        if self.vertex_count == 0 {
            return 1.0;
        }
        self.visited.len() as f64 / self.vertex_count as f64
    }
}

impl TerminationCondition for CoverageCondition {
    fn observe(&mut self, event: &StepEvent) {
        self.visited.insert(event.previous);
        self.visited.insert(event.current);
    }

    fn is_met(&self, _walk: &dyn Walk) -> bool {
        self.coverage() >= self.fraction
    }
}

/// Stops once some vertex has been hit `target` times.
#[derive(Clone, Debug)]
pub struct RehitsCondition {
    hits: FxHashMap<Node, usize>,
    max_hits: usize,
    target: usize,
}

impl RehitsCondition {
    pub fn new(target: usize) -> Self {
        Self {
            hits: FxHashMap::default(),
            max_hits: 0,
            target,
        }
    }

    /// The `i`-th of `loops` conditions, spreading targets linearly from `initial` to `max`.
    pub fn incremental(initial: usize, max: usize, loops: usize, i: usize) -> Self {
        let span = max.saturating_sub(initial) as f64;
        Self::new(initial + ((i + 1) as f64 / loops as f64 * span) as usize)
    }

    pub fn max_hits(&self) -> usize {
        self.max_hits
    }
}

impl TerminationCondition for RehitsCondition {
    fn observe(&mut self, event: &StepEvent) {
        let hits = self.hits.entry(event.current).or_insert(0);
        *hits += 1;
        self.max_hits = self.max_hits.max(*hits);
    }

    fn is_met(&self, _walk: &dyn Walk) -> bool {
        self.max_hits >= self.target
    }
}

/// Met as soon as any of its conditions is.
#[derive(Default)]
pub struct AnyCondition {
    conditions: Vec<Box<dyn TerminationCondition>>,
}

impl AnyCondition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, condition: impl TerminationCondition + 'static) -> Self {
        self.conditions.push(Box::new(condition));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl TerminationCondition for AnyCondition {
    fn observe(&mut self, event: &StepEvent) {
        for condition in &mut self.conditions {
            condition.observe(event);
        }
    }

    fn is_met(&self, walk: &dyn Walk) -> bool {
        self.conditions.iter().any(|c| c.is_met(walk))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graph::{Edge, UndirectedAdjacencyGraph};
    use crate::querier::GraphQuerier;
    use crate::random_walk::RandomWalk;
    use pcg_rand::Pcg64;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn run(condition: &mut dyn TerminationCondition, walk: &mut dyn Walk) {
        loop {
            let event = walk.step().unwrap();
            condition.observe(&event);
            if condition.is_met(walk) {
                break;
            }
        }
    }

    fn cycle_walk(n: usize, seed: u64) -> impl Walk {
        let graph =
            UndirectedAdjacencyGraph::from_edges(n, (0..n).map(|u| Edge::new(u, (u + 1) % n)));
        let querier = Arc::new(GraphQuerier::new(Arc::new(graph)).unwrap());
        RandomWalk::simple(0, querier, Pcg64::seed_from_u64(seed))
    }

    #[test]
    fn steps() {
        let mut walk = cycle_walk(10, 1);
        run(&mut StepsCondition::new(37), &mut walk);
        assert_eq!(walk.discreet_steps(), 37);
    }

    #[test]
    fn incremental_and_sublinear_targets() {
        let targets: Vec<f64> = (0..4)
            .map(|i| StepsCondition::incremental(4, 100, i).target())
            .collect();
        assert_eq!(targets, vec![25.0, 50.0, 75.0, 100.0]);

        let last = StepsCondition::sublinear(100, 2, 0.5, 1.5, 1).target();
        assert!((last - 1000.0).abs() < 1e-6);

        assert_eq!(RehitsCondition::incremental(2, 10, 4, 3).target, 10);
        assert_eq!(RehitsCondition::incremental(2, 10, 4, 0).target, 4);
    }

    #[test]
    fn coverage() {
        let mut walk = cycle_walk(8, 2);
        let mut condition = CoverageCondition::new(8, 1.0);
        run(&mut condition, &mut walk);
        assert_eq!(condition.coverage(), 1.0);
        assert!(walk.discreet_steps() >= 7);
    }

    #[test]
    fn rehits() {
        let mut walk = cycle_walk(3, 3);
        let mut condition = RehitsCondition::new(5);
        run(&mut condition, &mut walk);
        assert_eq!(condition.max_hits(), 5);
    }

    #[test]
    fn any_stops_at_the_first() {
        let mut walk = cycle_walk(1000, 4);
        let mut condition = AnyCondition::new()
            .with(CoverageCondition::new(1000, 1.0))
            .with(TimeCondition::new(12.0))
            .with(StepsCondition::new(500));
        run(&mut condition, &mut walk);
        assert_eq!(walk.discreet_steps(), 12);
    }
}

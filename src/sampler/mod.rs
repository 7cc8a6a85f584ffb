//! Drives walks until their termination condition holds.

pub mod multi;
pub mod observers;
pub mod termination;

pub use multi::MultiSampler;
pub use observers::{StepLogger, VisitStatistics, WalkObserver};
pub use termination::TerminationCondition;

use crate::error::Result;
use crate::random_walk::{Walk, WalkSummary};
use std::time::{Duration, Instant};

pub struct Sampler {
    job_id: usize,
    walk: Box<dyn Walk>,
    condition: Box<dyn TerminationCondition>,
    observers: Vec<Box<dyn WalkObserver>>,
    visits: Option<VisitStatistics>,
}

#[derive(Clone, Debug)]
pub struct SamplingReport {
    pub job_id: usize,
    pub summary: WalkSummary,
    pub runtime: Duration,
    pub visits: Option<VisitStatistics>,
}

impl Sampler {
    pub fn new(
        job_id: usize,
        walk: Box<dyn Walk>,
        condition: impl TerminationCondition + 'static,
    ) -> Self {
        Self {
            job_id,
            walk,
            condition: Box::new(condition),
            observers: Vec::new(),
            visits: None,
        }
    }

    pub fn with_observer(mut self, observer: impl WalkObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Collects [`VisitStatistics`] into the report.
    pub fn with_visit_statistics(mut self) -> Self {
        self.visits = Some(VisitStatistics::new());
        self
    }

    pub fn job_id(&self) -> usize {
        self.job_id
    }

    pub fn walk(&self) -> &dyn Walk {
        self.walk.as_ref()
    }

    /// Steps the walk until the condition is met, at least once, then terminates it.
    pub fn run(mut self) -> Result<SamplingReport> {
        let start = Instant::now();

        loop {
            let event = self.walk.step()?;

            self.condition.observe(&event);
            if let Some(visits) = self.visits.as_mut() {
                visits.on_step(&event);
            }
            for observer in &mut self.observers {
                observer.on_step(&event);
            }

            if self.condition.is_met(self.walk.as_ref()) {
                break;
            }
        }

        self.walk.terminate();
        for observer in &mut self.observers {
            observer.finish()?;
        }

        Ok(SamplingReport {
            job_id: self.job_id,
            summary: self.walk.summary(),
            runtime: start.elapsed(),
            visits: self.visits,
        })
    }
}

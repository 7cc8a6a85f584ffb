use super::{Sampler, SamplingReport};
use crate::error::Result;
use atomic_float::AtomicF64;
use crossbeam::atomic::AtomicCell;
use crossbeam::channel;
use hurdles::Barrier;
use itertools::Itertools;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use tracing::info;

/// Runs samplers on a fixed number of worker threads.
///
/// Workers pull samplers from a shared queue until it is drained; all of them
/// are released together once every worker has been spawned.
pub struct MultiSampler {
    num_threads: usize,
    simulated_time: Arc<AtomicF64>,
}

impl MultiSampler {
    pub fn new(num_threads: usize) -> Self {
        assert!(num_threads > 0);
        Self {
            num_threads,
            simulated_time: Arc::new(AtomicF64::new(0.0)),
        }
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Sum of the simulated time of all walks finished so far.
    pub fn simulated_time(&self) -> f64 {
        self.simulated_time.load(Ordering::Acquire)
    }

    /// Returns the reports ordered by job id, or the first error once all workers finished.
    pub fn run(&self, samplers: Vec<Sampler>) -> Result<Vec<SamplingReport>> {
        let num_jobs = samplers.len();
        let num_threads = self.num_threads.min(num_jobs.max(1));

        let (job_sender, job_receiver) = channel::unbounded();
        for sampler in samplers {
            // the receiver is alive, sending cannot fail
            let _ = job_sender.send(sampler);
        }
        drop(job_sender);

        let (report_sender, report_receiver) = channel::unbounded();
        let barrier = Barrier::new(num_threads);
        let finished = Arc::new(AtomicCell::new(0usize));

        info!(num_jobs, num_threads, "starting samplers");

        let handles = (0..num_threads)
            .map(|rank| {
                let jobs: channel::Receiver<Sampler> = job_receiver.clone();
                let reports = report_sender.clone();
                let mut barrier = barrier.clone();
                let finished = finished.clone();
                let simulated_time = self.simulated_time.clone();

                thread::spawn(move || {
                    barrier.wait();

                    for sampler in jobs.iter() {
                        let job_id = sampler.job_id();
                        let result = sampler.run();

                        if let Ok(report) = &result {
                            simulated_time.fetch_add(report.summary.total_steps, Ordering::AcqRel);
                        }

                        let done = finished.fetch_add(1) + 1;
                        info!(
                            rank,
                            job_id,
                            finished = done,
                            pending = num_jobs - done,
                            "sampler finished"
                        );

                        if reports.send(result).is_err() {
                            break;
                        }
                    }
                })
            })
            .collect_vec();
        drop(report_sender);

        for handle in handles {
            if let Err(payload) = handle.join() {
                std::panic::resume_unwind(payload);
            }
        }

        let mut reports = report_receiver.iter().collect::<Result<Vec<_>>>()?;
        reports.sort_unstable_by_key(|r| r.job_id);
        Ok(reports)
    }
}

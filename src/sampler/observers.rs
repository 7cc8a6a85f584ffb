use crate::error::Result;
use crate::random_walk::StepEvent;
use crate::Node;
use fxhash::FxHashMap;
use itertools::Itertools;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Receives the step events of one walk, on the thread driving that walk.
pub trait WalkObserver: Send {
    fn on_step(&mut self, event: &StepEvent);

    /// Called once after the walk terminated.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitRecord {
    pub first_hit: f64,
    pub last_hit: f64,
    pub hits: usize,
}

/// Per-vertex hit counts and hitting times, measured in simulated time.
#[derive(Clone, Debug, Default)]
pub struct VisitStatistics {
    records: FxHashMap<Node, HitRecord>,
    total_hits: usize,
}

impl VisitStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hit(&mut self, vertex: Node, time: f64) {
        self.total_hits += 1;
        self.records
            .entry(vertex)
            .and_modify(|r| {
                r.hits += 1;
                r.last_hit = time;
            })
            .or_insert(HitRecord {
                first_hit: time,
                last_hit: time,
                hits: 1,
            });
    }

    pub fn record(&self, vertex: Node) -> Option<&HitRecord> {
        self.records.get(&vertex)
    }

    pub fn hits(&self, vertex: Node) -> usize {
        self.records.get(&vertex).map_or(0, |r| r.hits)
    }

    pub fn distinct_vertices(&self) -> usize {
        self.records.len()
    }

    pub fn total_hits(&self) -> usize {
        self.total_hits
    }

    pub fn max_hits(&self) -> usize {
        self.records.values().map(|r| r.hits).max().unwrap_or(0)
    }

    /// Sorted `(hits, number of vertices hit that often)` pairs.
    pub fn hit_distribution(&self) -> Vec<(usize, usize)> {
        let mut counts = self.records.values().map(|r| r.hits).counts().into_iter().collect_vec();
        counts.sort_unstable();
        counts
    }

    /// Merges the visits of another walk; hitting times are taken as the earliest and latest of
    /// both.
    pub fn merge(&mut self, other: &VisitStatistics) {
        self.total_hits += other.total_hits;
        for (&v, o) in &other.records {
            self.records
                .entry(v)
                .and_modify(|r| {
                    r.hits += o.hits;
                    r.first_hit = r.first_hit.min(o.first_hit);
                    r.last_hit = r.last_hit.max(o.last_hit);
                })
                .or_insert(*o);
        }
    }

    /// Writes `vertex,first_hit,last_hit,hits` lines ordered by vertex.
    pub fn write_csv(&self, writer: &mut impl Write) -> std::io::Result<()> {
        writeln!(writer, "vertex,first_hit,last_hit,hits")?;
        for (v, r) in self.records.iter().sorted_unstable_by_key(|&(&v, _)| v) {
            writeln!(writer, "{},{},{},{}", v, r.first_hit, r.last_hit, r.hits)?;
        }
        Ok(())
    }
}

impl WalkObserver for VisitStatistics {
    fn on_step(&mut self, event: &StepEvent) {
        self.hit(event.current, event.total_steps);
    }
}

/// Logs every step as a `total_steps,previous,current,weight` line.
pub struct StepLogger<W: Write> {
    writer: W,
    error: Option<std::io::Error>,
}

impl<W: Write + Send> StepLogger<W> {
    pub fn new(mut writer: W) -> Result<Self> {
        writeln!(writer, "total_steps,previous,current,weight")?;
        Ok(Self {
            writer,
            error: None,
        })
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl StepLogger<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write + Send> WalkObserver for StepLogger<W> {
    fn on_step(&mut self, event: &StepEvent) {
        if self.error.is_some() {
            return;
        }

        // the first failure is kept and reported by `finish`
        if let Err(e) = writeln!(
            self.writer,
            "{},{},{},{}",
            event.total_steps, event.previous, event.current, event.weight
        ) {
            self.error = Some(e);
        }
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(e) = self.error.take() {
            return Err(e.into());
        }
        self.writer.flush()?;
        Ok(())
    }
}

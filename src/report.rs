use crate::sampler::{SamplingReport, VisitStatistics};
use itertools::Itertools;
use std::io::Write;

/// Visits of all walks merged; `None` if no report collected visit statistics.
pub fn merged_visits(reports: &[SamplingReport]) -> Option<VisitStatistics> {
    reports
        .iter()
        .filter_map(|r| r.visits.as_ref())
        .fold(None, |merged, visits| {
            let mut merged = merged.unwrap_or_default();
            merged.merge(visits);
            Some(merged)
        })
}

pub fn report_distribution(
    visit_distr: &[(usize, usize)],
    writer: &mut impl Write,
) -> std::io::Result<()> {
    writer.write_all(
        visit_distr
            .iter()
            .map(|&(hits, n)| format!("#VD {:>10}, {:>10}\n", hits, n))
            .join("")
            .as_bytes(),
    )?;
    Ok(())
}

/// One `key:value` line per walk.
pub fn report_walks(reports: &[SamplingReport], writer: &mut impl Write) -> std::io::Result<()> {
    for r in reports {
        let s = &r.summary;
        writeln!(
            writer,
            "walk:{} policy:{} initial:{} current:{} discreet_steps:{} total_steps:{} runtime_s:{}",
            r.job_id,
            s.name.short,
            s.initial_state,
            s.current_state,
            s.discreet_steps,
            s.total_steps,
            r.runtime.as_secs_f64()
        )?;
    }
    Ok(())
}

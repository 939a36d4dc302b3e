//! Bounded-concurrency barrier verifier.

use std::collections::BTreeMap;

use syncprobe_constants::scoring::BARRIER_FULL_RAW;
use syncprobe_core::Ledger;
use syncprobe_core::LogicalTime;
use syncprobe_core::ScenarioDescription;

use crate::report::VerificationReport;
use crate::workers::collect_workers;
use crate::workers::missing_threads;

/// Check the concurrency bound and that the waiter finishes in a full group.
///
/// A thread counts as running at every logical time in its closed interval.
///
/// # Scoring
///
/// One point each for: all declared threads completed, no time unit with more
/// than `max_concurrent` running threads, exactly `max_concurrent` threads
/// running at the waiter's end time. A raw total of `BARRIER_FULL_RAW` is
/// normalized to the maximum.
///
/// Only the first time unit that exceeds the bound is reported.
pub fn check_thread_barrier(scenario: &ScenarioDescription, ledger: &Ledger) -> VerificationReport {
    let cfg = &scenario.barrier;
    let p = cfg.process;
    let mut report = VerificationReport::new();

    let threads = match collect_workers(ledger, p, cfg.thread_count) {
        Ok(threads) => threads,
        Err(msg) => return report.abort(msg),
    };
    if let Some(missing) = missing_threads(&threads, cfg.thread_count) {
        return report.abort(format!("missing thread(s) {missing} in process {p}"));
    }
    report.award(1);

    let mut running: BTreeMap<LogicalTime, Vec<i32>> = BTreeMap::new();
    for (&t, record) in &threads {
        if let Some((start, end)) = record.interval() {
            for time in start..=end {
                running.entry(time).or_default().push(t);
            }
        }
    }

    let bound = usize::try_from(cfg.max_concurrent).unwrap_or(0);
    match running.values().find(|group| group.len() > bound) {
        Some(group) => report.error(format!("the following threads are running at the same time: {}", join(group))),
        None => report.award(1),
    }

    let Some(waiter_end) = threads.get(&cfg.waiter).and_then(|r| r.time_end) else {
        return report.abort(format!("waiter thread {} is not declared in process {p}", cfg.waiter));
    };
    let group: Vec<i32> = threads.iter().filter(|(_, r)| r.covers(waiter_end)).map(|(&t, _)| t).collect();
    if group.len() == bound {
        report.award(1);
    } else {
        report.error(format!(
            "the following threads are running while ending thread T{p}.{}: {}",
            cfg.waiter,
            join(&group)
        ));
    }

    report.normalize(BARRIER_FULL_RAW)
}

fn join(threads: &[i32]) -> String {
    threads.iter().map(i32::to_string).collect::<Vec<_>>().join(" ")
}

//! Same-process thread nesting verifier.

use syncprobe_constants::scoring::SAME_PROCESS_FULL_RAW;
use syncprobe_core::Ledger;
use syncprobe_core::ScenarioDescription;

use crate::report::VerificationReport;
use crate::workers::collect_workers;
use crate::workers::missing_threads;

/// Check that the outer thread's interval strictly contains the inner one's.
///
/// # Scoring
///
/// One point each for: at least one declared thread completed, all declared
/// threads completed, outer starts before inner, outer ends after inner.
/// A raw total of `SAME_PROCESS_FULL_RAW` is normalized to the maximum.
pub fn check_same_process_threads(scenario: &ScenarioDescription, ledger: &Ledger) -> VerificationReport {
    let cfg = &scenario.same_process;
    let p = cfg.process;
    let mut report = VerificationReport::new();

    let threads = match collect_workers(ledger, p, cfg.thread_count) {
        Ok(threads) => threads,
        Err(msg) => return report.abort(msg),
    };
    if !threads.is_empty() {
        report.award(1);
    }
    if let Some(missing) = missing_threads(&threads, cfg.thread_count) {
        return report.abort(format!("missing threads {missing} in process {p}"));
    }
    report.award(1);

    let (Some(outer), Some(inner)) = (threads.get(&cfg.outer), threads.get(&cfg.inner)) else {
        return report.abort(format!("outer thread {} or inner thread {} is not declared in process {p}", cfg.outer, cfg.inner));
    };

    if outer.time_start < inner.time_start {
        report.award(1);
    } else {
        report.error(format!("thread T{p}.{} starts after T{p}.{}", cfg.outer, cfg.inner));
    }
    if outer.time_end > inner.time_end {
        report.award(1);
    } else {
        report.error(format!("thread T{p}.{} ends before T{p}.{}", cfg.outer, cfg.inner));
    }

    report.normalize(SAME_PROCESS_FULL_RAW)
}

//! Cross-process ordering verifier.

use syncprobe_constants::scoring::CROSS_PROCESS_FULL_RAW;
use syncprobe_core::Ledger;
use syncprobe_core::ScenarioDescription;

use crate::report::VerificationReport;
use crate::workers::collect_workers;
use crate::workers::missing_threads;

/// Check that the sandwiched thread runs strictly after `before` ended and
/// strictly before `after` started, both threads living in another process.
///
/// # Scoring
///
/// One point each for: all declared threads of the bracketing process
/// completed, sandwiched thread starts after `before` ends, sandwiched thread
/// ends before `after` starts. A raw total of `CROSS_PROCESS_FULL_RAW` is
/// normalized to the maximum.
pub fn check_cross_process_ordering(scenario: &ScenarioDescription, ledger: &Ledger) -> VerificationReport {
    let cfg = &scenario.cross_process;
    let p = cfg.process;
    let mut report = VerificationReport::new();

    let threads = match collect_workers(ledger, p, cfg.thread_count) {
        Ok(threads) => threads,
        Err(msg) => return report.abort(msg),
    };
    if let Some(missing) = missing_threads(&threads, cfg.thread_count) {
        return report.abort(format!("missing threads {missing} in process {p}"));
    }
    report.award(1);

    let key = cfg.sandwiched_key();
    let Some(sandwiched) = ledger.record(&key) else {
        return report.abort(format!("thread {} is missing from process {}", key.thread, key.process));
    };
    let Some(sandwiched_end) = sandwiched.time_end else {
        return report.abort(format!("missing END for thread {} in process {}", key.thread, key.process));
    };
    let (Some(before), Some(after)) = (threads.get(&cfg.before), threads.get(&cfg.after)) else {
        return report.abort(format!("before thread {} or after thread {} is not declared in process {p}", cfg.before, cfg.after));
    };

    if before.time_end.is_some_and(|end| sandwiched.time_start > end) {
        report.award(1);
    } else {
        report.error(format!("thread {key} starts before T{p}.{} ended", cfg.before));
    }
    if sandwiched_end < after.time_start {
        report.award(1);
    } else {
        report.error(format!("thread {key} ends after T{p}.{} started", cfg.after));
    }

    report.normalize(CROSS_PROCESS_FULL_RAW)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::fixtures::ledger;
    use crate::workers::fixtures::scenario;

    /// Process 3 runs threads 1..=3 in order; T2.3 is placed by `middle`.
    fn cross_ledger(middle: &[(bool, i32, i32, i32)], before_end_last: bool) -> Ledger {
        let mut events = vec![(true, 2, 0, 1), (true, 3, 0, 1), (true, 3, 1, 0)];
        if !before_end_last {
            events.push((false, 3, 1, 0));
        }
        events.extend_from_slice(middle);
        if before_end_last {
            events.push((false, 3, 1, 0));
        }
        events.extend_from_slice(&[
            (true, 3, 2, 0),
            (false, 3, 2, 0),
            (true, 3, 3, 0),
            (false, 3, 3, 0),
            (false, 3, 0, 1),
            (false, 2, 0, 1),
        ]);
        ledger(&events)
    }

    #[test]
    fn test_sandwiched_thread_scores_full() {
        let ledger = cross_ledger(&[(true, 2, 3, 0), (false, 2, 3, 0)], false);
        let report = check_cross_process_ordering(&scenario(), &ledger);
        assert!(report.errors.is_empty(), "{:?}", report.errors);
        assert_eq!(report.score, 5);
    }

    #[test]
    fn test_starts_before_bracket_ends() {
        let ledger = cross_ledger(&[(true, 2, 3, 0), (false, 2, 3, 0)], true);
        let report = check_cross_process_ordering(&scenario(), &ledger);
        assert_eq!(report.errors, vec!["thread T2.3 starts before T3.1 ended".to_string()]);
        assert_eq!(report.score, 2);
    }

    #[test]
    fn test_ends_after_bracket_starts() {
        let ledger = ledger(&[
            (true, 2, 0, 1),
            (true, 3, 0, 1),
            (true, 3, 1, 0),
            (false, 3, 1, 0),
            (true, 2, 3, 0),
            (true, 3, 2, 0),
            (false, 2, 3, 0),
            (false, 3, 2, 0),
            (true, 3, 3, 0),
            (false, 3, 3, 0),
        ]);
        let report = check_cross_process_ordering(&scenario(), &ledger);
        assert_eq!(report.errors, vec!["thread T2.3 ends after T3.2 started".to_string()]);
        assert_eq!(report.score, 2);
    }

    #[test]
    fn test_missing_sandwiched_thread() {
        let ledger = cross_ledger(&[], false);
        let report = check_cross_process_ordering(&scenario(), &ledger);
        assert_eq!(report.errors, vec!["thread 3 is missing from process 2".to_string()]);
        assert_eq!(report.score, 1);
    }

    #[test]
    fn test_unfinished_sandwiched_thread() {
        let ledger = cross_ledger(&[(true, 2, 3, 0)], false);
        let report = check_cross_process_ordering(&scenario(), &ledger);
        assert_eq!(report.errors, vec!["missing END for thread 3 in process 2".to_string()]);
        assert_eq!(report.score, 1);
    }

    #[test]
    fn test_bracketing_process_missing() {
        let ledger = ledger(&[(true, 2, 0, 1), (true, 2, 3, 0), (false, 2, 3, 0)]);
        let report = check_cross_process_ordering(&scenario(), &ledger);
        assert_eq!(report.errors, vec!["main thread is missing for process 3".to_string()]);
        assert_eq!(report.score, 0);
    }
}

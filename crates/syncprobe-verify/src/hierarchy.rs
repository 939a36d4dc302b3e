//! Process hierarchy verifier.

use std::collections::BTreeMap;

use syncprobe_constants::scoring::HIERARCHY_NESTING_POINTS;
use syncprobe_constants::scoring::HIERARCHY_PRESENCE_POINTS;
use syncprobe_core::Ledger;
use syncprobe_core::LifecycleRecord;
use syncprobe_core::ScenarioDescription;

use crate::report::VerificationReport;

/// Check that every declared process ran, with the declared parent, inside
/// its parent's interval.
///
/// # Scoring
///
/// - `HIERARCHY_PRESENCE_POINTS` once every main thread `1..=N` began and
///   ended and no undeclared process reported
/// - `HIERARCHY_NESTING_POINTS` if every non-root process has the parent's OS
///   pid as its ppid, starts no earlier and ends no later than the parent
///
/// Nesting violations are reported per offending process without aborting.
pub fn check_process_hierarchy(scenario: &ScenarioDescription, ledger: &Ledger) -> VerificationReport {
    let mut report = VerificationReport::new();
    let n = scenario.process_count;

    let mut mains: BTreeMap<i32, &LifecycleRecord> = BTreeMap::new();
    for record in ledger.records_by_arrival().into_iter().filter(|r| r.key.is_main()) {
        let p = record.key.process;
        if !(1..=n).contains(&p) {
            return report.abort(format!("found unrequired process {p}"));
        }
        if !record.is_complete() {
            return report.abort(format!("missing END for main thread of process {p}"));
        }
        mains.insert(p, record);
    }

    let missing: Vec<String> = (1..=n).filter(|p| !mains.contains_key(p)).map(|p| p.to_string()).collect();
    if !missing.is_empty() {
        return report.abort(format!("missing main thread for processes: {}", missing.join(" ")));
    }

    report.award(HIERARCHY_PRESENCE_POINTS);

    for (&p, record) in mains.iter().filter(|(p, _)| **p != 1) {
        let Some(parent) = scenario.parent_of(p) else {
            report.error(format!("no parent declared for process {p}"));
            continue;
        };
        let Some(parent_record) = mains.get(&parent) else {
            report.error(format!("the parent for process {p} is not {parent}"));
            continue;
        };
        if record.ppid != parent_record.pid {
            report.error(format!("the parent for process {p} is not {parent}"));
        }
        if record.time_start < parent_record.time_start {
            report.error(format!("process {p} starts before its parent {parent}"));
        }
        if record.time_end > parent_record.time_end {
            report.error(format!("process {p} ends after its parent {parent}"));
        }
    }

    if report.errors.is_empty() {
        report.award(HIERARCHY_NESTING_POINTS);
    }
    report
}

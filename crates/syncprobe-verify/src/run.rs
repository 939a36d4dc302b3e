//! Per-run verification.

use serde::Serialize;
use syncprobe_constants::scoring::CHECK_COUNT;
use syncprobe_constants::scoring::CHECK_MAX_SCORE;
use syncprobe_core::Ledger;
use syncprobe_core::ScenarioDescription;
use tracing::debug;

use crate::report::Check;
use crate::report::VerificationReport;

/// Result of one check in one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    /// Which check produced the report.
    pub check: Check,
    /// Findings and score.
    pub report: VerificationReport,
}

/// How a run ended, from the verifiers' point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunVerdict {
    /// The subject exceeded the time limit and was killed. Every check scores 0.
    TimedOut,
    /// The ledger recorded protocol errors. Every check is skipped and scores 0.
    ProtocolErrors {
        /// Errors in the order they were recorded.
        errors: Vec<String>,
    },
    /// All checks were evaluated.
    Checked {
        /// One entry per check, in [`Check::ALL`] order.
        results: Vec<CheckResult>,
    },
}

/// Verification outcome of one scheduled run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Run number, starting at 1.
    pub run: u32,
    /// Outcome.
    pub verdict: RunVerdict,
}

impl RunReport {
    /// Report for a run whose subject was killed at the time limit.
    ///
    /// The partial ledger of a killed subject is deliberately not consulted.
    pub fn timed_out(run: u32) -> Self {
        Self {
            run,
            verdict: RunVerdict::TimedOut,
        }
    }

    /// Score per check, in [`Check::ALL`] order.
    ///
    /// Timed-out and protocol-error runs score 0 on every check.
    pub fn check_scores(&self) -> [u32; 4] {
        let mut scores = [0; 4];
        if let RunVerdict::Checked { results } = &self.verdict {
            for (slot, result) in scores.iter_mut().zip(results) {
                *slot = result.report.score;
            }
        }
        scores
    }

    /// Sum of all check scores.
    pub fn score(&self) -> u32 {
        self.check_scores().iter().sum()
    }

    /// Maximum achievable score for one run.
    pub fn max_score(&self) -> u32 {
        CHECK_COUNT * CHECK_MAX_SCORE
    }
}

/// Verify a finished ledger.
///
/// A ledger carrying protocol errors is not checked at all: structural
/// corruption makes the temporal invariants meaningless.
pub fn verify_ledger(run: u32, scenario: &ScenarioDescription, ledger: &Ledger) -> RunReport {
    if ledger.has_errors() {
        debug!(run, errors = ledger.errors().len(), "skipping checks after protocol errors");
        return RunReport {
            run,
            verdict: RunVerdict::ProtocolErrors {
                errors: ledger.errors().to_vec(),
            },
        };
    }

    let results = Check::ALL
        .into_iter()
        .map(|check| {
            let report = check.run(scenario, ledger);
            debug!(run, check = check.name(), score = report.score, findings = report.errors.len(), "check evaluated");
            CheckResult { check, report }
        })
        .collect();

    RunReport {
        run,
        verdict: RunVerdict::Checked { results },
    }
}

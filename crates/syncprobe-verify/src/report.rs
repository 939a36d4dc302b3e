//! Verifier output types.

use std::fmt;

use serde::Serialize;
use syncprobe_constants::scoring::CHECK_MAX_SCORE;
use syncprobe_core::Ledger;
use syncprobe_core::ScenarioDescription;

use crate::barrier::check_thread_barrier;
use crate::cross_process::check_cross_process_ordering;
use crate::hierarchy::check_process_hierarchy;
use crate::same_process::check_same_process_threads;

/// Errors and partial score produced by one verifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    /// Human-readable findings, in the order they were detected.
    pub errors: Vec<String>,
    /// Score in `0..=CHECK_MAX_SCORE`.
    pub score: u32,
}

impl VerificationReport {
    /// Start an empty report with score 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finding.
    pub fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Add points for a satisfied invariant.
    pub fn award(&mut self, points: u32) {
        self.score = self.score.saturating_add(points).min(CHECK_MAX_SCORE);
    }

    /// Append a finding and hand back the report as it stands.
    ///
    /// Used by the short-circuit paths: later invariants are not evaluated.
    #[must_use]
    pub fn abort(mut self, msg: impl Into<String>) -> Self {
        self.error(msg);
        self
    }

    /// Raise the score to the maximum if the raw total equals `full_raw`.
    #[must_use]
    pub fn normalize(mut self, full_raw: u32) -> Self {
        if self.score == full_raw {
            self.score = CHECK_MAX_SCORE;
        }
        self
    }

    /// Verdict label for this score.
    pub fn verdict(&self) -> Verdict {
        Verdict::from_score(self.score)
    }
}

/// Human-facing classification of a check score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Maximum score.
    Correct,
    /// Some but not all points.
    Partial,
    /// No points.
    Fail,
}

impl Verdict {
    /// Classify a score.
    pub fn from_score(score: u32) -> Self {
        if score >= CHECK_MAX_SCORE {
            Self::Correct
        } else if score > 0 {
            Self::Partial
        } else {
            Self::Fail
        }
    }

    /// Console label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Correct => "CORRECT",
            Self::Partial => "PARTIAL CORRECT",
            Self::Fail => "FAIL",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The four checks evaluated on every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    /// Process tree nesting.
    ProcessHierarchy,
    /// Same-process outer/inner nesting.
    SameProcessThreads,
    /// Bounded concurrency barrier.
    ThreadBarrier,
    /// Cross-process sandwich ordering.
    CrossProcessOrdering,
}

impl Check {
    /// All checks in evaluation order.
    pub const ALL: [Self; 4] = [
        Self::ProcessHierarchy,
        Self::SameProcessThreads,
        Self::ThreadBarrier,
        Self::CrossProcessOrdering,
    ];

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::ProcessHierarchy => "process hierarchy",
            Self::SameProcessThreads => "threads from the same process",
            Self::ThreadBarrier => "threads barrier",
            Self::CrossProcessOrdering => "threads from different processes",
        }
    }

    /// Run this check against a finished ledger.
    pub fn run(self, scenario: &ScenarioDescription, ledger: &Ledger) -> VerificationReport {
        match self {
            Self::ProcessHierarchy => check_process_hierarchy(scenario, ledger),
            Self::SameProcessThreads => check_same_process_threads(scenario, ledger),
            Self::ThreadBarrier => check_thread_barrier(scenario, ledger),
            Self::CrossProcessOrdering => check_cross_process_ordering(scenario, ledger),
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

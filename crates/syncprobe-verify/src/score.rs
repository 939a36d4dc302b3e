//! Aggregate grading across runs.

use serde::Serialize;
use syncprobe_core::BuildOutcome;

use crate::run::RunReport;

/// Final grade of a subject.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Grade {
    /// Sum of all check scores over all runs.
    pub raw: u32,
    /// Maximum achievable raw score over all runs.
    pub max: u32,
    /// Build outcome the penalty was derived from.
    pub build: BuildOutcome,
    /// Final grade in `0.0..=100.0`, after the build penalty.
    pub percent: f64,
}

impl Grade {
    /// Whether the build penalty reduced the grade.
    pub fn penalized(&self) -> bool {
        matches!(self.build, BuildOutcome::BuildableWithWarnings)
    }
}

/// Aggregate run reports into a final grade.
///
/// The raw total is normalized to 0..=100 and multiplied by the share the
/// build outcome retains. A subject that did not build scores 0 regardless of
/// `runs`.
pub fn grade(runs: &[RunReport], build: BuildOutcome) -> Grade {
    let raw: u32 = runs.iter().map(RunReport::score).sum();
    let max: u32 = runs.iter().map(RunReport::max_score).sum();

    let percent = if max == 0 || !build.is_buildable() {
        0.0
    } else {
        100.0 * f64::from(raw) / f64::from(max) * f64::from(build.retained_percent()) / 100.0
    };

    Grade {
        raw,
        max,
        build,
        percent,
    }
}

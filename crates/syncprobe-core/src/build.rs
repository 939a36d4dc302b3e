//! Outcome of the external build step.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use syncprobe_constants::scoring::WARNING_PENALTY_PERCENT;

/// Result of building the subject program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildOutcome {
    /// No runnable artifact was produced; no run is attempted.
    NotBuildable,
    /// The artifact was produced but the compiler emitted warnings.
    BuildableWithWarnings,
    /// Clean build.
    Buildable,
}

impl BuildOutcome {
    /// Classify a build from whether the artifact exists and the build log.
    ///
    /// Any occurrence of `warning` in the log counts as a warning.
    pub fn classify(artifact_exists: bool, log: &str) -> Self {
        if !artifact_exists {
            Self::NotBuildable
        } else if log.contains("warning") {
            Self::BuildableWithWarnings
        } else {
            Self::Buildable
        }
    }

    /// Whether the scenarios should be run at all.
    #[inline]
    pub fn is_buildable(self) -> bool {
        !matches!(self, Self::NotBuildable)
    }

    /// Percentage of the raw grade that is retained.
    #[inline]
    pub fn retained_percent(self) -> u32 {
        match self {
            Self::NotBuildable => 0,
            Self::BuildableWithWarnings => WARNING_PENALTY_PERCENT,
            Self::Buildable => 100,
        }
    }
}

impl fmt::Display for BuildOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotBuildable => "not buildable",
            Self::BuildableWithWarnings => "buildable with warnings",
            Self::Buildable => "buildable",
        };
        f.write_str(s)
    }
}

//! Scoring rubric constants.

/// Maximum score of a single check in a single run.
pub const CHECK_MAX_SCORE: u32 = 5;

/// Number of checks evaluated per run.
pub const CHECK_COUNT: u32 = 4;

/// Points awarded once every hierarchy participant is present.
pub const HIERARCHY_PRESENCE_POINTS: u32 = 2;

/// Points awarded when every process nests inside its parent.
pub const HIERARCHY_NESTING_POINTS: u32 = 3;

/// Raw score at which the same-process check is normalized to the maximum.
pub const SAME_PROCESS_FULL_RAW: u32 = 4;

/// Raw score at which the barrier check is normalized to the maximum.
pub const BARRIER_FULL_RAW: u32 = 3;

/// Raw score at which the cross-process check is normalized to the maximum.
pub const CROSS_PROCESS_FULL_RAW: u32 = 3;

/// Percentage retained when the subject built with warnings.
pub const WARNING_PENALTY_PERCENT: u32 = 90;

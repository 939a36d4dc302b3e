//! Run scheduling and delay injection constants.
//!
//! Delay magnitudes are in microseconds. Where a constant is a "step" it is
//! multiplied by the run number, so later runs widen the race window.

use std::time::Duration;

/// Number of scheduled runs, numbered `1..=RUN_COUNT`.
pub const RUN_COUNT: u32 = 5;

/// Default wall-clock limit for one run of the subject (3 seconds).
pub const DEFAULT_TIME_LIMIT_MS: u64 = 3_000;

/// Grace period between SIGTERM and SIGKILL when a run times out.
pub const KILL_GRACE_PERIOD: Duration = Duration::from_millis(100);

/// Poll interval while waiting out the kill grace period.
pub const KILL_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Per-run step for delaying the main thread of leaf processes.
pub const LEAF_PROCESS_DELAY_STEP_US: u32 = 40_000;

/// Per-run step for delaying the inner thread of the same-process pair.
pub const INNER_THREAD_DELAY_STEP_US: u32 = 100_000;

/// Per-run step for delaying the "before" thread of the cross-process scenario.
pub const CROSS_BEFORE_DELAY_STEP_US: u32 = 50_000;

/// Per-run step for delaying the same-process thread that must be sandwiched.
pub const CROSS_SANDWICHED_DELAY_STEP_US: u32 = 70_000;

/// Fixed delay for the barrier waiter in the waiter-first run.
pub const BARRIER_WAITER_DELAY_US: u32 = 250_000;

/// Fixed delay for every non-waiter barrier thread in the peers-first run.
pub const BARRIER_PEER_DELAY_US: u32 = 10_000;

/// Runs that delay leaf processes.
pub const LEAF_DELAY_RUNS: [u32; 3] = [2, 3, 4];

/// Runs that delay the inner thread of the same-process pair.
pub const INNER_DELAY_RUNS: [u32; 2] = [2, 4];

/// Runs that delay the cross-process participants.
pub const CROSS_DELAY_RUNS: [u32; 2] = [3, 4];

/// Run that delays the barrier waiter.
pub const BARRIER_WAITER_RUN: u32 = 2;

/// Run that delays every barrier thread except the waiter.
pub const BARRIER_PEERS_RUN: u32 = 3;

/// Run that spreads delays evenly across all barrier threads.
pub const BARRIER_SPREAD_RUN: u32 = 5;

/// Multiplier applied to the time limit when spreading barrier delays.
///
/// The combined delay exceeds the time limit unless the threads overlap.
pub const BARRIER_SPREAD_FACTOR: u64 = 2;

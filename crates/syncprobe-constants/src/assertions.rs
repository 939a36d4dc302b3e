//! Compile-time constant assertions.

use super::schedule::*;
use super::scoring::*;
use super::wire::*;

// ============================================================================
// Wire Format
// ============================================================================

const _: () = assert!(MESSAGE_SIZE == MESSAGE_FIELDS * core::mem::size_of::<i32>());
const _: () = assert!(REPLY_SIZE == core::mem::size_of::<i32>());
const _: () = assert!(KIND_BEGIN != KIND_END);
const _: () = assert!(LISTENER_BACKLOG > 0);

// ============================================================================
// Scheduling
// ============================================================================

const _: () = assert!(RUN_COUNT > 0);
const _: () = assert!(DEFAULT_TIME_LIMIT_MS > 0);
const _: () = assert!(BARRIER_WAITER_RUN <= RUN_COUNT);
const _: () = assert!(BARRIER_PEERS_RUN <= RUN_COUNT);
const _: () = assert!(BARRIER_SPREAD_RUN <= RUN_COUNT);
const _: () = assert!(BARRIER_WAITER_RUN != BARRIER_PEERS_RUN);

// The sandwiched thread is held longer than the thread it waits on.
const _: () = assert!(CROSS_SANDWICHED_DELAY_STEP_US > CROSS_BEFORE_DELAY_STEP_US);

// Peers arrive before the delayed waiter.
const _: () = assert!(BARRIER_PEER_DELAY_US < BARRIER_WAITER_DELAY_US);

// ============================================================================
// Scoring
// ============================================================================

const _: () = assert!(HIERARCHY_PRESENCE_POINTS + HIERARCHY_NESTING_POINTS == CHECK_MAX_SCORE);
const _: () = assert!(SAME_PROCESS_FULL_RAW < CHECK_MAX_SCORE);
const _: () = assert!(BARRIER_FULL_RAW < CHECK_MAX_SCORE);
const _: () = assert!(CROSS_PROCESS_FULL_RAW < CHECK_MAX_SCORE);
const _: () = assert!(WARNING_PENALTY_PERCENT <= 100);

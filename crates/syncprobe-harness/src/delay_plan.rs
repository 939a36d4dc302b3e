//! Per-run delay design.
//!
//! Each run biases timing toward one class of synchronization bug:
//!
//! | Run | Leaf mains | Inner thread | Cross-process pair | Barrier           |
//! |-----|------------|--------------|--------------------|-------------------|
//! | 1   |            |              |                    |                   |
//! | 2   | 80 ms      | 200 ms       |                    | waiter 250 ms     |
//! | 3   | 120 ms     |              | 150 ms / 210 ms    | peers 10 ms each  |
//! | 4   | 160 ms     | 400 ms       | 200 ms / 280 ms    |                   |
//! | 5   |            |              |                    | spread over limit |
//!
//! Run 1 is undelayed. Run 5 gives every barrier thread
//! `2 * time_limit / thread_count`, so the run only finishes in time if the
//! threads genuinely overlap.
//!
//! Entries are inserted in a fixed order (leaves, inner, cross-process,
//! barrier); a later entry for the same participant overrides an earlier one.

use std::time::Duration;

use syncprobe_constants::schedule::BARRIER_PEER_DELAY_US;
use syncprobe_constants::schedule::BARRIER_PEERS_RUN;
use syncprobe_constants::schedule::BARRIER_SPREAD_FACTOR;
use syncprobe_constants::schedule::BARRIER_SPREAD_RUN;
use syncprobe_constants::schedule::BARRIER_WAITER_DELAY_US;
use syncprobe_constants::schedule::BARRIER_WAITER_RUN;
use syncprobe_constants::schedule::CROSS_BEFORE_DELAY_STEP_US;
use syncprobe_constants::schedule::CROSS_DELAY_RUNS;
use syncprobe_constants::schedule::CROSS_SANDWICHED_DELAY_STEP_US;
use syncprobe_constants::schedule::INNER_DELAY_RUNS;
use syncprobe_constants::schedule::INNER_THREAD_DELAY_STEP_US;
use syncprobe_constants::schedule::LEAF_DELAY_RUNS;
use syncprobe_constants::schedule::LEAF_PROCESS_DELAY_STEP_US;
use syncprobe_core::DelaySchedule;
use syncprobe_core::ParticipantKey;
use syncprobe_core::ScenarioDescription;

/// Build the delay schedule for `run` (1-based).
///
/// Runs outside `1..=RUN_COUNT` get an empty schedule.
pub fn build_delay_schedule(run: u32, scenario: &ScenarioDescription, time_limit: Duration) -> DelaySchedule {
    let mut schedule = DelaySchedule::new();

    if LEAF_DELAY_RUNS.contains(&run) {
        let delay_us = LEAF_PROCESS_DELAY_STEP_US.saturating_mul(run);
        for process in scenario.leaf_processes() {
            schedule.insert(ParticipantKey::main(process), delay_us);
        }
    }

    if INNER_DELAY_RUNS.contains(&run) {
        let same = &scenario.same_process;
        schedule.insert(ParticipantKey::new(same.process, same.inner), INNER_THREAD_DELAY_STEP_US.saturating_mul(run));
    }

    if CROSS_DELAY_RUNS.contains(&run) {
        let cross = &scenario.cross_process;
        schedule.insert(ParticipantKey::new(cross.process, cross.before), CROSS_BEFORE_DELAY_STEP_US.saturating_mul(run));
        schedule.insert(cross.sandwiched_key(), CROSS_SANDWICHED_DELAY_STEP_US.saturating_mul(run));
    }

    let barrier = &scenario.barrier;
    let barrier_threads = 1..=barrier.thread_count;
    match run {
        BARRIER_WAITER_RUN => {
            schedule.insert(ParticipantKey::new(barrier.process, barrier.waiter), BARRIER_WAITER_DELAY_US);
        }
        BARRIER_PEERS_RUN => {
            for thread in barrier_threads.filter(|&t| t != barrier.waiter) {
                schedule.insert(ParticipantKey::new(barrier.process, thread), BARRIER_PEER_DELAY_US);
            }
        }
        BARRIER_SPREAD_RUN => {
            let delay_us = spread_delay_us(time_limit, barrier.thread_count);
            for thread in barrier_threads {
                schedule.insert(ParticipantKey::new(barrier.process, thread), delay_us);
            }
        }
        _ => {}
    }

    schedule
}

/// `BARRIER_SPREAD_FACTOR * time_limit / thread_count` in microseconds, saturated to `u32`.
fn spread_delay_us(time_limit: Duration, thread_count: i32) -> u32 {
    let Ok(count) = u64::try_from(thread_count) else {
        return 0;
    };
    if count == 0 {
        return 0;
    }
    let limit_us = u64::try_from(time_limit.as_micros()).unwrap_or(u64::MAX);
    let delay_us = limit_us.saturating_mul(BARRIER_SPREAD_FACTOR) / count;
    u32::try_from(delay_us).unwrap_or(u32::MAX)
}

//! Event ledger: lifecycle records, logical clock and error log for one run.
//!
//! The ledger is a plain owned state machine. It is mutated by exactly one
//! execution context (the listener's accept loop), which is what gives the
//! logical clock a total order without locking.
//!
//! # Protocol
//!
//! | Event | Ledger state for key         | Result                                  |
//! |-------|------------------------------|-----------------------------------------|
//! | BEGIN | absent                       | record opened, clock + 1, delay returned |
//! | BEGIN | present                      | `more than one BEGIN`                   |
//! | END   | absent                       | `END before BEGIN`                      |
//! | END   | present, already ended       | `more than one END`                     |
//! | END   | present, pid or tid differs  | `different PIDs/TIDs`                   |
//! | END   | present, open, same identity | record closed, clock + 1, 0 returned    |
//! | other | any                          | `unknown message type`                  |
//!
//! Every rejected event is appended to the error log and leaves records and
//! clock untouched. A non-empty error log disables verification for the run.

use std::collections::BTreeMap;

use snafu::Snafu;

use crate::delay::DelaySchedule;
use crate::key::LogicalTime;
use crate::key::ParticipantKey;
use crate::record::LifecycleRecord;
use crate::wire::EventKind;
use crate::wire::LifecycleMessage;
use crate::wire::WireError;

/// Protocol violations detected while applying a lifecycle message.
///
/// The `Display` output is the exact text recorded in the error log.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum LedgerError {
    /// The message kind is neither BEGIN nor END.
    #[snafu(display("unknown message type {kind} for process {}, thread {}", key.process, key.thread))]
    UnknownKind {
        /// Raw kind received.
        kind: i32,
        /// Reporting participant.
        key: ParticipantKey,
    },

    /// BEGIN for a participant that already began.
    #[snafu(display("more than one BEGIN for process {}, thread {}", key.process, key.thread))]
    DuplicateBegin {
        /// Reporting participant.
        key: ParticipantKey,
    },

    /// END for a participant that never began.
    #[snafu(display("END before BEGIN for process {}, thread {}", key.process, key.thread))]
    EndBeforeBegin {
        /// Reporting participant.
        key: ParticipantKey,
    },

    /// END for a participant that already ended.
    #[snafu(display("more than one END for process {}, thread {}", key.process, key.thread))]
    DuplicateEnd {
        /// Reporting participant.
        key: ParticipantKey,
    },

    /// END reported from a different OS process than BEGIN.
    #[snafu(display("different PIDs for BEGIN and END of process {}, thread {}", key.process, key.thread))]
    PidMismatch {
        /// Reporting participant.
        key: ParticipantKey,
    },

    /// END reported from a different OS thread than BEGIN.
    #[snafu(display("different TIDs for BEGIN and END of process {}, thread {}", key.process, key.thread))]
    TidMismatch {
        /// Reporting participant.
        key: ParticipantKey,
    },
}

/// Record map, logical clock and error log of one run.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    records: BTreeMap<ParticipantKey, LifecycleRecord>,
    clock: LogicalTime,
    errors: Vec<String>,
    delays: DelaySchedule,
}

impl Ledger {
    /// Create an empty ledger with no delays.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty ledger that hands out `delays` on BEGIN.
    pub fn with_schedule(delays: DelaySchedule) -> Self {
        Self {
            delays,
            ..Self::default()
        }
    }

    /// Clear all records, zero the clock, empty the error log and install
    /// `delays` for the next run.
    ///
    /// Idempotent: the result does not depend on anything that happened before.
    pub fn reset(&mut self, delays: DelaySchedule) {
        *self = Self::with_schedule(delays);
    }

    /// Apply one lifecycle message.
    ///
    /// On success returns the delay in microseconds the reporter must honor
    /// (non-zero only for a scheduled BEGIN). On a protocol violation the
    /// error is appended to the log, no state changes, and the error is
    /// returned; the caller must then answer the reporter with 0.
    pub fn apply(&mut self, msg: &LifecycleMessage) -> Result<u32, LedgerError> {
        let result = self.admit(msg);
        if let Err(ref err) = result {
            self.errors.push(err.to_string());
        }
        result
    }

    fn admit(&mut self, msg: &LifecycleMessage) -> Result<u32, LedgerError> {
        let key = msg.key();
        let Some(kind) = msg.event_kind() else {
            return UnknownKindSnafu { kind: msg.kind, key }.fail();
        };

        match kind {
            EventKind::Begin => {
                if self.records.contains_key(&key) {
                    return DuplicateBeginSnafu { key }.fail();
                }
                let time = self.tick();
                self.records.insert(key, LifecycleRecord::open(msg, time));
                Ok(self.delays.delay_for(&key))
            }
            EventKind::End => {
                let Some(record) = self.records.get(&key) else {
                    return EndBeforeBeginSnafu { key }.fail();
                };
                if record.is_complete() {
                    return DuplicateEndSnafu { key }.fail();
                }
                if record.pid != msg.pid {
                    return PidMismatchSnafu { key }.fail();
                }
                if record.tid != msg.tid {
                    return TidMismatchSnafu { key }.fail();
                }
                let time = self.tick();
                if let Some(record) = self.records.get_mut(&key) {
                    record.time_end = Some(time);
                }
                Ok(0)
            }
        }
    }

    /// Record a message that could not be decoded. Records and clock are untouched.
    pub fn record_malformed(&mut self, err: &WireError) {
        self.errors.push(err.to_string());
    }

    #[inline]
    fn tick(&mut self) -> LogicalTime {
        self.clock = self.clock.saturating_add(1);
        self.clock
    }

    /// All records in key order.
    pub fn records(&self) -> &BTreeMap<ParticipantKey, LifecycleRecord> {
        &self.records
    }

    /// All records in the order their BEGIN was accepted.
    pub fn records_by_arrival(&self) -> Vec<&LifecycleRecord> {
        let mut records: Vec<&LifecycleRecord> = self.records.values().collect();
        records.sort_unstable_by_key(|record| record.time_start);
        records
    }

    /// Record for `key`, if BEGIN was accepted for it.
    pub fn record(&self, key: &ParticipantKey) -> Option<&LifecycleRecord> {
        self.records.get(key)
    }

    /// Current logical clock (last assigned time, 0 if none).
    pub fn clock(&self) -> LogicalTime {
        self.clock
    }

    /// Protocol errors recorded during this run, in arrival order.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Whether any protocol error was recorded.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Delay schedule installed for this run.
    pub fn delays(&self) -> &DelaySchedule {
        &self.delays
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn begin(p: i32, t: i32) -> LifecycleMessage {
        LifecycleMessage::begin(ParticipantKey::new(p, t), 100 + p, 99 + p, 1000 + p * 10 + t)
    }

    fn end(p: i32, t: i32) -> LifecycleMessage {
        LifecycleMessage::end(ParticipantKey::new(p, t), 100 + p, 99 + p, 1000 + p * 10 + t)
    }

    // ========================================================================
    // Accepted Events
    // ========================================================================

    #[test]
    fn test_begin_then_end_assigns_consecutive_times() {
        let mut ledger = Ledger::new();
        assert_eq!(ledger.apply(&begin(1, 0)), Ok(0));
        assert_eq!(ledger.apply(&end(1, 0)), Ok(0));

        let record = ledger.record(&ParticipantKey::main(1)).unwrap();
        assert_eq!(record.interval(), Some((1, 2)));
        assert_eq!(ledger.clock(), 2);
        assert!(!ledger.has_errors());
    }

    #[test]
    fn test_records_by_arrival_follow_begin_order() {
        let mut ledger = Ledger::new();
        ledger.apply(&begin(3, 0)).unwrap();
        ledger.apply(&begin(1, 2)).unwrap();
        ledger.apply(&begin(1, 0)).unwrap();
        ledger.apply(&end(3, 0)).unwrap();

        let order: Vec<ParticipantKey> = ledger.records_by_arrival().iter().map(|r| r.key).collect();
        assert_eq!(order, vec![ParticipantKey::main(3), ParticipantKey::new(1, 2), ParticipantKey::main(1)]);
    }

    #[test]
    fn test_begin_returns_scheduled_delay() {
        let schedule = DelaySchedule::new().with(ParticipantKey::new(2, 1), 40_000);
        let mut ledger = Ledger::with_schedule(schedule);
        assert_eq!(ledger.apply(&begin(2, 1)), Ok(40_000));
        assert_eq!(ledger.apply(&begin(2, 2)), Ok(0));
    }

    #[test]
    fn test_end_never_returns_delay() {
        let schedule = DelaySchedule::new().with(ParticipantKey::new(2, 1), 40_000);
        let mut ledger = Ledger::with_schedule(schedule);
        ledger.apply(&begin(2, 1)).unwrap();
        assert_eq!(ledger.apply(&end(2, 1)), Ok(0));
    }

    // ========================================================================
    // Protocol Violations
    // ========================================================================

    #[test]
    fn test_unknown_kind_rejected_without_state_change() {
        let mut ledger = Ledger::new();
        let mut msg = begin(1, 0);
        msg.kind = 7;
        let err = ledger.apply(&msg).unwrap_err();
        assert!(matches!(err, LedgerError::UnknownKind { kind: 7, .. }));
        assert!(ledger.records().is_empty());
        assert_eq!(ledger.clock(), 0);
        assert_eq!(ledger.errors(), ["unknown message type 7 for process 1, thread 0"]);
    }

    #[test]
    fn test_duplicate_begin_leaves_record_unchanged() {
        let mut ledger = Ledger::new();
        ledger.apply(&begin(1, 0)).unwrap();
        let before = *ledger.record(&ParticipantKey::main(1)).unwrap();

        let mut again = begin(1, 0);
        again.pid = 555;
        assert!(matches!(ledger.apply(&again), Err(LedgerError::DuplicateBegin { .. })));
        assert_eq!(*ledger.record(&ParticipantKey::main(1)).unwrap(), before);
        assert_eq!(ledger.clock(), 1);
        assert_eq!(ledger.errors(), ["more than one BEGIN for process 1, thread 0"]);
    }

    #[test]
    fn test_end_before_begin_creates_nothing() {
        let mut ledger = Ledger::new();
        assert!(matches!(ledger.apply(&end(3, 2)), Err(LedgerError::EndBeforeBegin { .. })));
        assert!(ledger.record(&ParticipantKey::new(3, 2)).is_none());
        assert_eq!(ledger.clock(), 0);
        assert_eq!(ledger.errors(), ["END before BEGIN for process 3, thread 2"]);
    }

    #[test]
    fn test_duplicate_end() {
        let mut ledger = Ledger::new();
        ledger.apply(&begin(1, 0)).unwrap();
        ledger.apply(&end(1, 0)).unwrap();
        assert!(matches!(ledger.apply(&end(1, 0)), Err(LedgerError::DuplicateEnd { .. })));
        assert_eq!(ledger.record(&ParticipantKey::main(1)).unwrap().time_end, Some(2));
        assert_eq!(ledger.clock(), 2);
    }

    #[test]
    fn test_pid_mismatch() {
        let mut ledger = Ledger::new();
        ledger.apply(&begin(1, 0)).unwrap();
        let mut msg = end(1, 0);
        msg.pid += 1;
        assert!(matches!(ledger.apply(&msg), Err(LedgerError::PidMismatch { .. })));
        assert!(!ledger.record(&ParticipantKey::main(1)).unwrap().is_complete());
        assert_eq!(ledger.errors(), ["different PIDs for BEGIN and END of process 1, thread 0"]);
    }

    #[test]
    fn test_tid_mismatch() {
        let mut ledger = Ledger::new();
        ledger.apply(&begin(1, 2)).unwrap();
        let mut msg = end(1, 2);
        msg.tid += 1;
        assert!(matches!(ledger.apply(&msg), Err(LedgerError::TidMismatch { .. })));
        assert_eq!(ledger.clock(), 1);
    }

    #[test]
    fn test_malformed_is_logged_only() {
        let mut ledger = Ledger::new();
        ledger.record_malformed(&WireError::Truncated {
            received: 8,
            expected: 24,
        });
        assert!(ledger.has_errors());
        assert!(ledger.records().is_empty());
        assert_eq!(ledger.clock(), 0);
    }

    // ========================================================================
    // Reset
    // ========================================================================

    #[test]
    fn test_reset_clears_everything() {
        let mut ledger = Ledger::new();
        ledger.apply(&begin(1, 0)).unwrap();
        ledger.apply(&end(2, 0)).unwrap_err();

        let schedule = DelaySchedule::new().with(ParticipantKey::main(2), 5);
        ledger.reset(schedule.clone());
        assert!(ledger.records().is_empty());
        assert_eq!(ledger.clock(), 0);
        assert!(ledger.errors().is_empty());
        assert_eq!(ledger.delays(), &schedule);

        // A second reset from a different state lands in the same place.
        ledger.apply(&begin(5, 5)).unwrap();
        ledger.reset(schedule.clone());
        assert!(ledger.records().is_empty());
        assert_eq!(ledger.clock(), 0);
        assert!(ledger.errors().is_empty());
    }

    // ========================================================================
    // Properties
    // ========================================================================

    fn arb_message() -> impl Strategy<Value = LifecycleMessage> {
        (0i32..4, 1i32..4, 0i32..3, 0i32..2, 0i32..2).prop_map(|(kind, p, t, pid_bump, tid_bump)| LifecycleMessage {
            kind,
            process: p,
            thread: t,
            pid: 100 + p + pid_bump,
            ppid: 99 + p,
            tid: 1000 + p * 10 + t + tid_bump,
        })
    }

    proptest! {
        #[test]
        fn prop_accepted_times_strictly_increase(msgs in prop::collection::vec(arb_message(), 0..64)) {
            let mut ledger = Ledger::new();
            let mut last = 0;
            let mut accepted = 0u64;
            for msg in &msgs {
                let before = ledger.clock();
                match ledger.apply(msg) {
                    Ok(_) => {
                        accepted += 1;
                        prop_assert_eq!(ledger.clock(), before + 1);
                        prop_assert!(ledger.clock() > last);
                        last = ledger.clock();
                    }
                    Err(_) => {
                        prop_assert_eq!(ledger.clock(), before);
                    }
                }
            }
            prop_assert_eq!(ledger.clock(), accepted);
        }

        #[test]
        fn prop_completed_records_start_before_end(msgs in prop::collection::vec(arb_message(), 0..64)) {
            let mut ledger = Ledger::new();
            for msg in &msgs {
                let _ = ledger.apply(msg);
            }
            let mut seen = std::collections::BTreeSet::new();
            for record in ledger.records().values() {
                prop_assert!(seen.insert(record.time_start));
                if let Some(end) = record.time_end {
                    prop_assert!(record.time_start < end);
                    prop_assert!(seen.insert(end));
                }
            }
        }
    }
}

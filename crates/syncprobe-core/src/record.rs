//! Lifecycle record for one participant.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::key::LogicalTime;
use crate::key::ParticipantKey;
use crate::wire::LifecycleMessage;

/// What the ledger knows about one participant.
///
/// Created on the first accepted BEGIN and mutated exactly once more when the
/// matching END is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleRecord {
    /// Participant identity.
    pub key: ParticipantKey,
    /// OS process id reported on BEGIN.
    pub pid: i32,
    /// OS parent process id reported on BEGIN.
    pub ppid: i32,
    /// OS thread id reported on BEGIN.
    pub tid: i32,
    /// Logical time at which BEGIN was accepted.
    pub time_start: LogicalTime,
    /// Logical time at which END was accepted, if it has been.
    pub time_end: Option<LogicalTime>,
}

impl LifecycleRecord {
    /// Open a record from an accepted BEGIN message.
    pub fn open(msg: &LifecycleMessage, time_start: LogicalTime) -> Self {
        Self {
            key: msg.key(),
            pid: msg.pid,
            ppid: msg.ppid,
            tid: msg.tid,
            time_start,
            time_end: None,
        }
    }

    /// Whether END has been accepted for this participant.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.time_end.is_some()
    }

    /// Closed interval `[start, end]` of a completed participant.
    #[inline]
    pub fn interval(&self) -> Option<(LogicalTime, LogicalTime)> {
        self.time_end.map(|end| (self.time_start, end))
    }

    /// Whether the participant was running at logical time `t`.
    ///
    /// Both endpoints count as running. Incomplete records cover nothing.
    #[inline]
    pub fn covers(&self, t: LogicalTime) -> bool {
        self.interval().is_some_and(|(start, end)| start <= t && t <= end)
    }
}

impl fmt::Display for LifecycleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "P{} T{} pid={} ppid={} tid={} [{} - {}]",
            self.key.process,
            self.key.thread,
            self.pid,
            self.ppid,
            self.tid,
            self.time_start,
            self.time_end.unwrap_or(0)
        )
    }
}

//! Per-run delay table.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::key::ParticipantKey;

/// Mapping from participant to a BEGIN delay in microseconds.
///
/// Built by the scheduler before a run and handed to the ledger on reset.
/// The ledger only reads it, so a schedule is effectively immutable for the
/// lifetime of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelaySchedule {
    delays: BTreeMap<ParticipantKey, u32>,
}

impl DelaySchedule {
    /// Create an empty schedule (every participant gets 0).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delay for `key`, replacing any previous value.
    pub fn insert(&mut self, key: ParticipantKey, delay_us: u32) {
        self.delays.insert(key, delay_us);
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, key: ParticipantKey, delay_us: u32) -> Self {
        self.insert(key, delay_us);
        self
    }

    /// Delay owed to `key` on BEGIN; 0 when unscheduled.
    #[inline]
    pub fn delay_for(&self, key: &ParticipantKey) -> u32 {
        self.delays.get(key).copied().unwrap_or(0)
    }

    /// Number of scheduled participants.
    pub fn len(&self) -> usize {
        self.delays.len()
    }

    /// Whether no participant is delayed.
    pub fn is_empty(&self) -> bool {
        self.delays.is_empty()
    }

    /// Iterate over scheduled participants in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantKey, &u32)> {
        self.delays.iter()
    }
}

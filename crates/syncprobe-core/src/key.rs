//! Participant identity and logical time.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Value of the harness logical clock.
///
/// Logical times start at 1; the clock value 0 means "no event accepted yet".
pub type LogicalTime = u64;

/// Identity of one instrumented thread of execution.
///
/// `thread == 0` denotes the main thread of `process`. Ordering is by process
/// first, then thread, which keeps ledger iteration deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticipantKey {
    /// Process index as declared by the scenario (1..=N).
    pub process: i32,
    /// Thread index within the process; 0 for the main thread.
    pub thread: i32,
}

impl ParticipantKey {
    /// Thread index reserved for the main thread of a process.
    pub const MAIN_THREAD: i32 = 0;

    /// Create a key for `thread` of `process`.
    #[inline]
    pub const fn new(process: i32, thread: i32) -> Self {
        Self { process, thread }
    }

    /// Key of the main thread of `process`.
    #[inline]
    pub const fn main(process: i32) -> Self {
        Self::new(process, Self::MAIN_THREAD)
    }

    /// Whether this key names a main thread.
    #[inline]
    pub const fn is_main(&self) -> bool {
        self.thread == Self::MAIN_THREAD
    }
}

impl fmt::Display for ParticipantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}.{}", self.process, self.thread)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_key() {
        let key = ParticipantKey::main(3);
        assert!(key.is_main());
        assert_eq!(key, ParticipantKey::new(3, 0));
        assert!(!ParticipantKey::new(3, 1).is_main());
    }

    #[test]
    fn test_ordering_is_process_major() {
        assert!(ParticipantKey::new(1, 9) < ParticipantKey::new(2, 0));
        assert!(ParticipantKey::new(2, 0) < ParticipantKey::new(2, 1));
    }

    #[test]
    fn test_display() {
        assert_eq!(ParticipantKey::new(7, 2).to_string(), "T7.2");
    }
}

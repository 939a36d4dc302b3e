//! Lifecycle message wire codec.
//!
//! ## Wire Format
//!
//! ```text
//! +------+---------+--------+-----+------+-----+
//! | kind | process | thread | pid | ppid | tid |   six native-endian i32 (24 bytes)
//! +------+---------+--------+-----+------+-----+
//! ```
//!
//! The listener answers every connection with one native-endian `i32`: the
//! delay in microseconds the reporting thread must honor, or 0.
//!
//! Native byte order matches the subject, which writes its `int` fields
//! straight from memory over a loopback connection.

use snafu::Snafu;
use syncprobe_constants::wire::KIND_BEGIN;
use syncprobe_constants::wire::KIND_END;
use syncprobe_constants::wire::MESSAGE_FIELDS;
use syncprobe_constants::wire::MESSAGE_SIZE;
use syncprobe_constants::wire::REPLY_SIZE;

use crate::key::ParticipantKey;

/// Errors produced while decoding wire data.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum WireError {
    /// The peer closed the connection before a full message arrived.
    #[snafu(display("malformed message: received {received} of {expected} bytes"))]
    Truncated {
        /// Bytes actually received.
        received: usize,
        /// Bytes required for a full message.
        expected: usize,
    },

    /// The peer did not deliver a full message within the read timeout.
    #[snafu(display("malformed message: timed out after {received} of {expected} bytes"))]
    Stalled {
        /// Bytes received before the timeout.
        received: usize,
        /// Bytes required for a full message.
        expected: usize,
    },
}

/// Kind of a lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A thread (or process main thread) started.
    Begin,
    /// A thread (or process main thread) finished.
    End,
}

impl EventKind {
    /// Map a wire value to an event kind. Unknown values yield `None`.
    #[inline]
    pub const fn from_wire(value: i32) -> Option<Self> {
        match value {
            KIND_BEGIN => Some(Self::Begin),
            KIND_END => Some(Self::End),
            _ => None,
        }
    }

    /// Wire value of this kind.
    #[inline]
    pub const fn to_wire(self) -> i32 {
        match self {
            Self::Begin => KIND_BEGIN,
            Self::End => KIND_END,
        }
    }
}

/// One lifecycle report, exactly as it travels on the wire.
///
/// `kind` is kept raw so the ledger can reject unknown kinds with a
/// protocol error instead of the codec silently dropping them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleMessage {
    /// Raw event kind (`1` = BEGIN, `2` = END).
    pub kind: i32,
    /// Declared process index.
    pub process: i32,
    /// Declared thread index (0 for the main thread).
    pub thread: i32,
    /// OS process id of the reporter.
    pub pid: i32,
    /// OS parent process id of the reporter.
    pub ppid: i32,
    /// OS thread id of the reporter.
    pub tid: i32,
}

impl LifecycleMessage {
    /// Build a BEGIN message.
    pub const fn begin(key: ParticipantKey, pid: i32, ppid: i32, tid: i32) -> Self {
        Self {
            kind: EventKind::Begin.to_wire(),
            process: key.process,
            thread: key.thread,
            pid,
            ppid,
            tid,
        }
    }

    /// Build an END message.
    pub const fn end(key: ParticipantKey, pid: i32, ppid: i32, tid: i32) -> Self {
        Self {
            kind: EventKind::End.to_wire(),
            process: key.process,
            thread: key.thread,
            pid,
            ppid,
            tid,
        }
    }

    /// Participant this message reports on.
    #[inline]
    pub const fn key(&self) -> ParticipantKey {
        ParticipantKey::new(self.process, self.thread)
    }

    /// Decoded event kind, if the raw kind is known.
    #[inline]
    pub const fn event_kind(&self) -> Option<EventKind> {
        EventKind::from_wire(self.kind)
    }

    /// Decode a message from exactly [`MESSAGE_SIZE`] bytes.
    ///
    /// Shorter input is reported as [`WireError::Truncated`]; bytes past the
    /// first message are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.len() < MESSAGE_SIZE {
            return TruncatedSnafu {
                received: bytes.len(),
                expected: MESSAGE_SIZE,
            }
            .fail();
        }

        let mut fields = [0i32; MESSAGE_FIELDS];
        for (field, chunk) in fields.iter_mut().zip(bytes[..MESSAGE_SIZE].chunks_exact(4)) {
            *field = i32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        let [kind, process, thread, pid, ppid, tid] = fields;

        Ok(Self {
            kind,
            process,
            thread,
            pid,
            ppid,
            tid,
        })
    }

    /// Encode this message into its 24-byte wire form.
    pub fn encode(&self) -> [u8; MESSAGE_SIZE] {
        let fields = [self.kind, self.process, self.thread, self.pid, self.ppid, self.tid];
        let mut out = [0u8; MESSAGE_SIZE];
        for (chunk, field) in out.chunks_exact_mut(4).zip(fields) {
            chunk.copy_from_slice(&field.to_ne_bytes());
        }
        out
    }
}

/// Encode a listener reply carrying `delay_us`.
///
/// Delays beyond `i32::MAX` microseconds saturate.
#[inline]
pub fn encode_reply(delay_us: u32) -> [u8; REPLY_SIZE] {
    i32::try_from(delay_us).unwrap_or(i32::MAX).to_ne_bytes()
}

/// Decode a listener reply.
#[inline]
pub fn decode_reply(bytes: [u8; REPLY_SIZE]) -> i32 {
    i32::from_ne_bytes(bytes)
}

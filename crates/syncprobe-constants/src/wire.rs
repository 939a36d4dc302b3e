//! Lifecycle wire format constants.
//!
//! A lifecycle message is six native-endian `i32` fields:
//! `kind, process_index, thread_index, pid, ppid, tid`.
//! The reply is a single native-endian `i32`.

use std::time::Duration;

/// Number of `i32` fields in a lifecycle message.
pub const MESSAGE_FIELDS: usize = 6;

/// Size of one lifecycle message in bytes (24 bytes).
pub const MESSAGE_SIZE: usize = MESSAGE_FIELDS * 4;

/// Size of the listener reply in bytes.
pub const REPLY_SIZE: usize = 4;

/// Wire value for a BEGIN event.
pub const KIND_BEGIN: i32 = 1;

/// Wire value for an END event.
pub const KIND_END: i32 = 2;

/// Well-known port shared by the harness and the subject program.
pub const DEFAULT_LISTENER_PORT: u16 = 1988;

/// Pending connection backlog for the listening socket.
pub const LISTENER_BACKLOG: u32 = 5;

/// Upper bound on how long a single connection may take to deliver its message.
///
/// Tiger Style: A stalled peer cannot hold the serialized accept loop forever.
/// Reaching the bound is treated the same as a short message.
pub const MESSAGE_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Environment variable through which the subject learns the listener port.
pub const LISTENER_PORT_ENV: &str = "SYNCPROBE_LISTENER_PORT";

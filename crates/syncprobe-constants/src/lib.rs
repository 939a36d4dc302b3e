//! Centralized constants for the syncprobe harness.
//!
//! Constants are grouped by the component that consumes them so that the
//! wire format, the delay plan and the scoring rubric can be read in one place.
//!
//! Tiger Style: Constants are fixed and immutable, enforced at compile time.
//! Relationships between constants are checked in `assertions`.
//!
//! # Modules
//!
//! - [`wire`]: Lifecycle message layout and listener defaults
//! - [`schedule`]: Run count, time limit and delay magnitudes
//! - [`scoring`]: Per-check maximum and build penalty

mod assertions;
pub mod schedule;
pub mod scoring;
pub mod wire;


//! syncprobe: grades a concurrent subject program by observing it.
//!
//! The subject reports the start and end of every process and thread to an
//! event listener, which stamps each report with a logical time and may
//! answer with a delay to force a particular interleaving. After each of the
//! scheduled runs the resulting ledger is checked against the scenario's
//! temporal rules and scored.
//!
//! # Crates
//!
//! - `syncprobe-constants`: fixed limits and tuning values
//! - `syncprobe-core`: ledger, wire codec, scenario description
//! - `syncprobe-verify`: the four verifiers and the scorer
//! - `syncprobe-harness`: listener, scheduler, supervisor, build step
//!
//! This crate adds configuration, the console report and the session that
//! ties them together.

pub mod config;
pub mod report;
pub mod session;

pub use config::ConfigError;
pub use config::ConfigOverrides;
pub use config::HarnessConfig;
pub use session::OutputFormat;
pub use session::run_session;

//! Temporal invariant verifiers for finished syncprobe ledgers.
//!
//! Every verifier is a pure function `(&ScenarioDescription, &Ledger) ->
//! VerificationReport`. Verifiers never fail: structural problems and
//! invariant violations are reported as human-readable strings next to a
//! partial score in `0..=CHECK_MAX_SCORE`.
//!
//! # Checks
//!
//! - [`check_process_hierarchy`]: every process nests inside its parent
//! - [`check_same_process_threads`]: outer thread contains the inner one
//! - [`check_thread_barrier`]: concurrency bound and full-group waiter
//! - [`check_cross_process_ordering`]: a thread sandwiched between two
//!   threads of another process
//!
//! # Scoring
//!
//! Points accumulate per satisfied invariant. A verifier whose raw total hits
//! its check-specific "all invariants held" threshold is normalized to the
//! common maximum; otherwise the raw total stands.

mod barrier;
mod cross_process;
mod hierarchy;
mod report;
mod run;
mod same_process;
mod score;
mod workers;

pub use barrier::check_thread_barrier;
pub use cross_process::check_cross_process_ordering;
pub use hierarchy::check_process_hierarchy;
pub use report::Check;
pub use report::VerificationReport;
pub use report::Verdict;
pub use run::CheckResult;
pub use run::RunReport;
pub use run::RunVerdict;
pub use run::verify_ledger;
pub use same_process::check_same_process_threads;
pub use score::Grade;
pub use score::grade;

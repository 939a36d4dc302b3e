//! Runtime half of the syncprobe harness.
//!
//! This crate owns everything that touches sockets, processes or the wall
//! clock. The pure ledger and verifiers live in `syncprobe-core` and
//! `syncprobe-verify`; this crate drives them.
//!
//! # Main Components
//!
//! - [`EventListener`] / [`ListenerHandle`]: serialized accept loop that feeds
//!   lifecycle reports into the ledger and answers with injected delays
//! - [`build_delay_schedule`]: per-run delay design
//! - [`run_subject`]: launch the subject under a deadline, kill it on expiry
//! - [`ScenarioScheduler`]: the five scheduled runs, end to end
//! - [`build_subject`]: optional external build step
//!
//! # Concurrency Model
//!
//! The listener task is the only code that mutates the ledger. The scheduler
//! talks to it through a command channel, and only resets or snapshots the
//! ledger while no subject is running, so ordering comes from sequencing
//! rather than locks.

pub mod compile;
pub mod delay_plan;
pub mod error;
pub mod listener;
pub mod scheduler;
pub mod supervisor;

pub use compile::BuildSpec;
pub use compile::build_subject;
pub use delay_plan::build_delay_schedule;
pub use error::BuildError;
pub use error::ListenerError;
pub use error::SchedulerError;
pub use error::SupervisorError;
pub use listener::EventListener;
pub use listener::ListenerHandle;
pub use scheduler::ScenarioScheduler;
pub use scheduler::SchedulerConfig;
pub use supervisor::SubjectCommand;
pub use supervisor::SubjectOutcome;
pub use supervisor::run_subject;

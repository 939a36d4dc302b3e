//! Pure data model for the syncprobe harness.
//!
//! This crate is the functional core of the harness: it holds no sockets,
//! spawns nothing and never reads the clock. Everything here is
//! deterministic and can be exercised directly from unit tests.
//!
//! # Main Components
//!
//! - [`ParticipantKey`]: `(process, thread)` identity of one instrumented thread
//! - [`LifecycleMessage`]: the fixed 24-byte report sent by the subject
//! - [`Ledger`]: record map, logical clock and error log for one run
//! - [`DelaySchedule`]: per-run delay table consulted on BEGIN
//! - [`ScenarioDescription`]: the static description the verifiers check against
//! - [`BuildOutcome`]: result of the external build step
//!
//! # Tiger Style
//!
//! - The logical clock only advances on accepted events
//! - Records are created only on the BEGIN path
//! - No panics in non-test code

pub mod build;
pub mod delay;
pub mod key;
pub mod ledger;
pub mod record;
pub mod scenario;
pub mod wire;

pub use build::BuildOutcome;
pub use delay::DelaySchedule;
pub use key::LogicalTime;
pub use key::ParticipantKey;
pub use ledger::Ledger;
pub use ledger::LedgerError;
pub use record::LifecycleRecord;
pub use scenario::BarrierScenario;
pub use scenario::CrossProcessScenario;
pub use scenario::SameProcessScenario;
pub use scenario::ScenarioDescription;
pub use scenario::ScenarioError;
pub use wire::EventKind;
pub use wire::LifecycleMessage;
pub use wire::WireError;

//! Error types for the harness runtime.

use std::net::SocketAddr;
use std::path::PathBuf;

use snafu::Snafu;

/// Errors from the event listener.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ListenerError {
    /// Failed to create, configure or bind the listening socket.
    #[snafu(display("failed to bind event listener on {addr}: {source}"))]
    Bind {
        /// Requested address.
        addr: SocketAddr,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The listener task is no longer running.
    #[snafu(display("event listener is stopped"))]
    Stopped,

    /// The listener task panicked or was aborted.
    #[snafu(display("event listener task failed: {source}"))]
    Join {
        /// Underlying join error.
        source: tokio::task::JoinError,
    },
}

/// Errors from launching or waiting on the subject process.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SupervisorError {
    /// The subject command line is empty.
    #[snafu(display("subject command is empty"))]
    EmptyCommand,

    /// The subject could not be spawned.
    #[snafu(display("failed to spawn subject '{program}': {source}"))]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Waiting on the subject failed.
    #[snafu(display("failed to wait for subject '{program}': {source}"))]
    Wait {
        /// Program being waited on.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors from the external build step.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum BuildError {
    /// The build command line is empty.
    #[snafu(display("build command is empty"))]
    EmptyBuildCommand,

    /// The build command could not be run.
    #[snafu(display("failed to run build command '{program}': {source}"))]
    RunBuild {
        /// Program that failed to start.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The stale artifact could not be removed before building.
    #[snafu(display("failed to remove stale artifact {}: {source}", path.display()))]
    RemoveArtifact {
        /// Artifact path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The build log could not be written.
    #[snafu(display("failed to write build log {}: {source}", path.display()))]
    WriteLog {
        /// Log path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors that abort a scheduled run.
///
/// Subject misbehavior never produces one of these; it is scored instead.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SchedulerError {
    /// The listener could not be reset or queried.
    #[snafu(display("run {run}: {source}"))]
    Listener {
        /// Run number.
        run: u32,
        /// Underlying listener error.
        source: ListenerError,
    },

    /// The subject could not be launched or reaped.
    #[snafu(display("run {run}: {source}"))]
    Supervisor {
        /// Run number.
        run: u32,
        /// Underlying supervisor error.
        source: SupervisorError,
    },
}

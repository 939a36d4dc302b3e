//! Optional external build step.
//!
//! Runs a configured build command, stores its combined output in the build
//! log and classifies the result from the artifact's presence and the log.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;

use snafu::ResultExt;
use syncprobe_core::BuildOutcome;
use tokio::process::Command;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::error::BuildError;
use crate::error::RemoveArtifactSnafu;
use crate::error::RunBuildSnafu;
use crate::error::WriteLogSnafu;

/// How to build the subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    /// Build command line; the first element is the program.
    pub command: Vec<String>,
    /// Artifact the build must produce.
    pub artifact: PathBuf,
    /// Delete `artifact` before building. Only set when the artifact is
    /// declared as the build's output; anything else is left untouched.
    pub remove_stale: bool,
    /// Where the build's stdout and stderr are written.
    pub log_path: PathBuf,
}

/// Run the build and classify the result.
///
/// With `remove_stale` the previous artifact is removed first, so a failed
/// build can never be graded against an older binary. A build command that
/// exits non-zero is `NotBuildable` even if it left an artifact behind.
pub async fn build_subject(spec: &BuildSpec) -> Result<BuildOutcome, BuildError> {
    let Some((program, args)) = spec.command.split_first() else {
        return Err(BuildError::EmptyBuildCommand);
    };

    if spec.remove_stale {
        match tokio::fs::remove_file(&spec.artifact).await {
            Ok(()) => debug!(artifact = %spec.artifact.display(), "removed stale artifact"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).context(RemoveArtifactSnafu {
                    path: spec.artifact.clone(),
                });
            }
        }
    }

    info!(program = %program, artifact = %spec.artifact.display(), "building subject");
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .context(RunBuildSnafu {
            program: program.clone(),
        })?;

    let mut log = String::from_utf8_lossy(&output.stdout).into_owned();
    log.push_str(&String::from_utf8_lossy(&output.stderr));
    tokio::fs::write(&spec.log_path, &log).await.context(WriteLogSnafu {
        path: spec.log_path.clone(),
    })?;

    let artifact_exists = tokio::fs::try_exists(&spec.artifact).await.unwrap_or(false);
    let outcome = BuildOutcome::classify(output.status.success() && artifact_exists, &log);
    if outcome.is_buildable() {
        info!(%outcome, "build finished");
    } else {
        warn!(code = ?output.status.code(), artifact_exists, "build failed");
    }
    Ok(outcome)
}

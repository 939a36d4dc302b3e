//! Subject process supervision.
//!
//! Launches the subject in its own process group and races its exit against
//! the run's wall-clock limit. On expiry the whole group is terminated
//! (SIGTERM, a short grace period, then SIGKILL) and reaped before the
//! timeout is reported. When the subject exits on its own, members of its
//! group that are still running are killed with SIGKILL.

use std::process::Stdio;
use std::time::Duration;
use std::time::Instant;

use command_group::AsyncCommandGroup;
use command_group::AsyncGroupChild;
use snafu::ResultExt;
use syncprobe_constants::schedule::KILL_GRACE_PERIOD;
use tokio::process::Command;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::error::SpawnSnafu;
use crate::error::SupervisorError;
use crate::error::WaitSnafu;

/// How to launch the subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectCommand {
    /// Executable to run.
    pub program: String,
    /// Arguments passed to the executable.
    pub args: Vec<String>,
    /// Extra environment variables, added to the inherited environment.
    pub env: Vec<(String, String)>,
    /// Inherit the harness's stdout/stderr instead of discarding the output.
    pub forward_output: bool,
}

impl SubjectCommand {
    /// Build a command from an argv-style list. The first element is the program.
    pub fn from_argv<I, S>(argv: I) -> Result<Self, SupervisorError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = argv.into_iter().map(Into::into);
        let program = argv.next().ok_or(SupervisorError::EmptyCommand)?;
        if program.is_empty() {
            return Err(SupervisorError::EmptyCommand);
        }
        Ok(Self {
            program,
            args: argv.collect(),
            env: Vec::new(),
            forward_output: false,
        })
    }

    /// Add an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Inherit stdout/stderr when `forward` is true.
    pub fn forward_output(mut self, forward: bool) -> Self {
        self.forward_output = forward;
        self
    }
}

/// How a supervised run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectOutcome {
    /// The subject exited on its own within the limit.
    Exited {
        /// Exit code, or `None` when killed by a signal.
        code: Option<i32>,
        /// Wall-clock time the subject ran.
        elapsed: Duration,
    },
    /// The limit elapsed; the subject's process group was killed and reaped.
    TimedOut {
        /// The limit that was exceeded.
        limit: Duration,
    },
}

impl SubjectOutcome {
    /// Whether the run exceeded its limit.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

/// Run the subject to completion or until `time_limit` elapses.
///
/// Returns only after the subject has been reaped and every other member of
/// its process group has been sent SIGKILL.
pub async fn run_subject(subject: &SubjectCommand, time_limit: Duration) -> Result<SubjectOutcome, SupervisorError> {
    let mut cmd = Command::new(&subject.program);
    cmd.args(&subject.args).stdin(Stdio::null()).kill_on_drop(true);
    if !subject.forward_output {
        cmd.stdout(Stdio::null()).stderr(Stdio::null());
    }
    for (key, value) in &subject.env {
        cmd.env(key, value);
    }

    let start = Instant::now();
    // Process group so forked subject processes are terminated together.
    let mut child: AsyncGroupChild = cmd.group_spawn().context(SpawnSnafu {
        program: subject.program.clone(),
    })?;
    let pid = child.inner().id();
    debug!(program = %subject.program, pid = ?pid, "subject started");

    enum ExitReason {
        Completed(std::io::Result<std::process::ExitStatus>),
        Timeout,
    }

    let exit_reason = tokio::select! {
        wait_result = child.wait() => ExitReason::Completed(wait_result),
        _ = tokio::time::sleep(time_limit) => ExitReason::Timeout,
    };

    match exit_reason {
        ExitReason::Completed(wait_result) => {
            let status = wait_result.context(WaitSnafu {
                program: subject.program.clone(),
            })?;
            let elapsed = start.elapsed();
            if let Some(pid) = pid {
                kill_leftover_group(pid);
            }
            info!(
                program = %subject.program,
                code = ?status.code(),
                elapsed_ms = elapsed.as_millis() as u64,
                "subject exited"
            );
            Ok(SubjectOutcome::Exited {
                code: status.code(),
                elapsed,
            })
        }
        ExitReason::Timeout => {
            warn!(
                program = %subject.program,
                limit_ms = time_limit.as_millis() as u64,
                "subject exceeded time limit"
            );
            terminate_process_group(&mut child, KILL_GRACE_PERIOD).await;
            Ok(SubjectOutcome::TimedOut { limit: time_limit })
        }
    }
}

/// Terminate a process group.
///
/// On Unix:
/// 1. Send SIGTERM to the process group
/// 2. Wait for the grace period
/// 3. Send SIGKILL if still running
/// 4. Reap the process
#[cfg(unix)]
async fn terminate_process_group(child: &mut AsyncGroupChild, grace: Duration) {
    use nix::errno::Errno;
    use nix::sys::signal::Signal;
    use nix::sys::signal::{self};
    use nix::unistd::Pid;
    use syncprobe_constants::schedule::KILL_POLL_INTERVAL;

    let Some(pid) = child.inner().id() else {
        return;
    };
    let pgid = Pid::from_raw(-(pid as i32));

    if let Err(e) = signal::kill(pgid, Signal::SIGTERM)
        && e != Errno::ESRCH
    {
        warn!(pid, error = ?e, "SIGTERM to subject process group failed");
    }

    let deadline = tokio::time::Instant::now() + grace;
    let mut exited = false;
    while tokio::time::Instant::now() < deadline {
        if child.inner().try_wait().ok().flatten().is_some() {
            exited = true;
            break;
        }
        tokio::time::sleep(KILL_POLL_INTERVAL).await;
    }

    // The leader may be gone while forked members still run.
    if let Err(e) = signal::kill(pgid, Signal::SIGKILL)
        && e != Errno::ESRCH
    {
        warn!(pid, error = ?e, "SIGKILL to subject process group failed");
    }

    if !exited && let Err(e) = child.wait().await {
        warn!(pid, error = %e, "failed to reap subject");
    }
}

/// SIGKILL whatever is left of the group led by the reaped process `pid`.
#[cfg(unix)]
fn kill_leftover_group(pid: u32) {
    use nix::errno::Errno;
    use nix::sys::signal::Signal;
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        Ok(()) => debug!(pid, "killed processes left behind by the subject"),
        Err(Errno::ESRCH) => {}
        Err(e) => warn!(pid, error = ?e, "SIGKILL to leftover subject processes failed"),
    }
}

#[cfg(not(unix))]
fn kill_leftover_group(_pid: u32) {}

#[cfg(not(unix))]
async fn terminate_process_group(child: &mut AsyncGroupChild, _grace: Duration) {
    let _ = child.kill().await;
    let _ = child.wait().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_argv_splits_program() {
        let cmd = SubjectCommand::from_argv(["./subject", "-v", "x"]).unwrap();
        assert_eq!(cmd.program, "./subject");
        assert_eq!(cmd.args, vec!["-v", "x"]);
        assert!(cmd.env.is_empty());
        assert!(!cmd.forward_output);
    }

    #[test]
    fn test_from_argv_rejects_empty() {
        assert!(matches!(SubjectCommand::from_argv(Vec::<String>::new()), Err(SupervisorError::EmptyCommand)));
        assert!(matches!(SubjectCommand::from_argv([""]), Err(SupervisorError::EmptyCommand)));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let cmd = SubjectCommand::from_argv(["/nonexistent/syncprobe-subject"]).unwrap();
        let err = run_subject(&cmd, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, SupervisorError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_code_reported() {
        let cmd = SubjectCommand::from_argv(["sh", "-c", "exit 3"]).unwrap();
        let outcome = run_subject(&cmd, Duration::from_secs(10)).await.unwrap();
        assert!(matches!(outcome, SubjectOutcome::Exited { code: Some(3), .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_subject() {
        let cmd = SubjectCommand::from_argv(["sleep", "30"]).unwrap();
        let start = Instant::now();
        let outcome = run_subject(&cmd, Duration::from_millis(200)).await.unwrap();
        assert!(outcome.is_timeout());
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_forked_children() {
        // The shell traps SIGTERM, so only the group SIGKILL ends it and its child.
        let cmd = SubjectCommand::from_argv(["sh", "-c", "trap '' TERM; sleep 30 & wait"]).unwrap();
        let start = Instant::now();
        let outcome = run_subject(&cmd, Duration::from_millis(200)).await.unwrap();
        assert!(outcome.is_timeout());
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_normal_exit_kills_forked_children() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("late");
        let script = format!("(sleep 1; touch {}) & exit 0", marker.display());
        let cmd = SubjectCommand::from_argv(["sh", "-c", &script]).unwrap();

        let outcome = run_subject(&cmd, Duration::from_secs(10)).await.unwrap();
        assert!(matches!(outcome, SubjectOutcome::Exited { code: Some(0), .. }));
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_env_passed_to_subject() {
        let cmd = SubjectCommand::from_argv(["sh", "-c", "test \"$SYNCPROBE_TEST_VALUE\" = 42"])
            .unwrap()
            .with_env("SYNCPROBE_TEST_VALUE", "42");
        let outcome = run_subject(&cmd, Duration::from_secs(10)).await.unwrap();
        assert!(matches!(outcome, SubjectOutcome::Exited { code: Some(0), .. }));
    }
}

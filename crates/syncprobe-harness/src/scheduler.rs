//! Scenario scheduler: drives the scheduled runs end to end.
//!
//! One run is strictly sequenced:
//!
//! 1. reset the ledger and install the run's delay schedule
//! 2. launch the subject, pointing it at the listener's port
//! 3. wait for exit or kill it at the time limit
//! 4. snapshot the ledger (only after the subject is gone) and verify it
//!
//! The ledger is never read while a subject can still write to it.

use std::time::Duration;

use snafu::ResultExt;
use syncprobe_constants::schedule::DEFAULT_TIME_LIMIT_MS;
use syncprobe_constants::schedule::RUN_COUNT;
use syncprobe_constants::wire::LISTENER_PORT_ENV;
use syncprobe_core::ScenarioDescription;
use syncprobe_verify::RunReport;
use syncprobe_verify::verify_ledger;
use tracing::debug;
use tracing::info;

use crate::delay_plan::build_delay_schedule;
use crate::error::ListenerSnafu;
use crate::error::SchedulerError;
use crate::error::SupervisorSnafu;
use crate::listener::ListenerHandle;
use crate::supervisor::SubjectCommand;
use crate::supervisor::SubjectOutcome;
use crate::supervisor::run_subject;

/// Scheduler settings.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Subject to launch on every run.
    pub subject: SubjectCommand,
    /// Wall-clock limit per run.
    pub time_limit: Duration,
    /// Number of runs, numbered `1..=run_count`.
    pub run_count: u32,
}

impl SchedulerConfig {
    /// Default limit and run count for `subject`.
    pub fn new(subject: SubjectCommand) -> Self {
        Self {
            subject,
            time_limit: Duration::from_millis(DEFAULT_TIME_LIMIT_MS),
            run_count: RUN_COUNT,
        }
    }
}

/// Executes scheduled runs against a running listener.
pub struct ScenarioScheduler<'a> {
    listener: &'a ListenerHandle,
    scenario: &'a ScenarioDescription,
    config: SchedulerConfig,
}

impl<'a> ScenarioScheduler<'a> {
    /// Create a scheduler sharing `listener` across all runs.
    pub fn new(listener: &'a ListenerHandle, scenario: &'a ScenarioDescription, config: SchedulerConfig) -> Self {
        Self {
            listener,
            scenario,
            config,
        }
    }

    /// Run numbers this scheduler executes.
    pub fn runs(&self) -> impl Iterator<Item = u32> + use<> {
        1..=self.config.run_count
    }

    /// Execute one run and verify its ledger.
    pub async fn execute_run(&self, run: u32) -> Result<RunReport, SchedulerError> {
        let schedule = build_delay_schedule(run, self.scenario, self.config.time_limit);
        info!(run, delayed = schedule.len(), "starting run");
        self.listener.reset(schedule).await.context(ListenerSnafu { run })?;

        let subject = self
            .config
            .subject
            .clone()
            .with_env(LISTENER_PORT_ENV, self.listener.local_addr().port().to_string());
        let outcome = run_subject(&subject, self.config.time_limit).await.context(SupervisorSnafu { run })?;

        if let SubjectOutcome::TimedOut { limit } = outcome {
            info!(run, limit_ms = limit.as_millis() as u64, "run timed out");
            return Ok(RunReport::timed_out(run));
        }

        let ledger = self.listener.snapshot().await.context(ListenerSnafu { run })?;
        for record in ledger.records().values() {
            debug!(run, %record, "ledger record");
        }
        let report = verify_ledger(run, self.scenario, &ledger);
        info!(run, score = report.score(), max = report.max_score(), events = ledger.clock(), "run verified");
        Ok(report)
    }

    /// Execute every run in order.
    pub async fn execute_all(&self) -> Result<Vec<RunReport>, SchedulerError> {
        let mut reports = Vec::with_capacity(self.config.run_count as usize);
        for run in self.runs() {
            reports.push(self.execute_run(run).await?);
        }
        Ok(reports)
    }
}

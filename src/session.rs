//! One grading session: build, five scheduled runs, grade.

use std::io::Write;

use anyhow::Context;
use anyhow::Result;
use syncprobe_core::BuildOutcome;
use syncprobe_harness::EventListener;
use syncprobe_harness::ListenerHandle;
use syncprobe_harness::ScenarioScheduler;
use syncprobe_harness::SchedulerConfig;
use syncprobe_harness::build_subject;
use syncprobe_verify::Grade;
use syncprobe_verify::RunReport;
use syncprobe_verify::grade;
use tracing::info;

use crate::config::HarnessConfig;
use crate::report::SessionSummary;
use crate::report::write_compilation_error;
use crate::report::write_grade;
use crate::report::write_run_header;
use crate::report::write_run_report;

/// How results are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Line-oriented console report, written as runs complete.
    #[default]
    Text,
    /// One JSON document at the end of the session.
    Json,
}

/// Build the subject, execute every scheduled run and grade the results.
///
/// The listener is bound once and shared by all runs. It is stopped before
/// returning, also when a run fails.
pub async fn run_session(config: &HarnessConfig, format: OutputFormat, out: &mut impl Write) -> Result<Grade> {
    config.validate()?;

    let build = match config.build_spec() {
        Some(spec) => build_subject(&spec).await.context("build step failed")?,
        None => BuildOutcome::Buildable,
    };

    if !build.is_buildable() {
        let grade = grade(&[], build);
        match format {
            OutputFormat::Text => write_compilation_error(out)?,
            OutputFormat::Json => write_json(out, &[], grade)?,
        }
        return Ok(grade);
    }

    let scenario = config.load_scenario()?;
    let listener = EventListener::bind(config.listen_addr)?.spawn();
    info!(listen_addr = %listener.local_addr(), time_limit_ms = config.time_limit_ms, "grading session started");

    let scheduler_config = SchedulerConfig {
        time_limit: config.time_limit(),
        ..SchedulerConfig::new(config.subject()?)
    };
    let scheduler = ScenarioScheduler::new(&listener, &scenario, scheduler_config);
    let result = execute_runs(&scheduler, format, out).await;
    stop(listener).await?;
    let runs = result?;

    let grade = grade(&runs, build);
    match format {
        OutputFormat::Text => write_grade(out, &grade)?,
        OutputFormat::Json => write_json(out, &runs, grade)?,
    }
    info!(raw = grade.raw, max = grade.max, percent = grade.percent, "grading session finished");
    Ok(grade)
}

async fn execute_runs(
    scheduler: &ScenarioScheduler<'_>,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<Vec<RunReport>> {
    let mut runs = Vec::new();
    for run in scheduler.runs() {
        if format == OutputFormat::Text {
            write_run_header(out, run)?;
            out.flush()?;
        }
        let report = scheduler.execute_run(run).await?;
        if format == OutputFormat::Text {
            write_run_report(out, &report)?;
        }
        runs.push(report);
    }
    Ok(runs)
}

async fn stop(listener: ListenerHandle) -> Result<()> {
    listener.stop().await.context("failed to stop event listener")
}

fn write_json(out: &mut impl Write, runs: &[RunReport], grade: Grade) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, &SessionSummary { runs, grade })?;
    writeln!(out)?;
    Ok(())
}

//! Console report.
//!
//! Results are written to a caller-supplied writer (stdout in the binary);
//! diagnostics go through `tracing` instead.

use std::io;
use std::io::Write;

use serde::Serialize;
use syncprobe_constants::scoring::WARNING_PENALTY_PERCENT;
use syncprobe_verify::Grade;
use syncprobe_verify::RunReport;
use syncprobe_verify::RunVerdict;

/// Machine-readable summary of a grading session.
#[derive(Debug, Serialize)]
pub struct SessionSummary<'a> {
    pub runs: &'a [RunReport],
    pub grade: Grade,
}

/// Announce a run before it starts.
pub fn write_run_header(out: &mut impl Write, run: u32) -> io::Result<()> {
    writeln!(out, "Test {run}...")
}

/// Findings and per-check verdicts of a finished run.
pub fn write_run_report(out: &mut impl Write, report: &RunReport) -> io::Result<()> {
    match &report.verdict {
        RunVerdict::TimedOut => writeln!(out, "\tTIME LIMIT EXCEEDED"),
        RunVerdict::ProtocolErrors { errors } => {
            for err in errors {
                writeln!(out, "\t{err}")?;
            }
            Ok(())
        }
        RunVerdict::Checked { results } => {
            for result in results {
                writeln!(out, "\tChecking {}...", result.check.name())?;
                for err in &result.report.errors {
                    writeln!(out, "\t\t{err}")?;
                }
                writeln!(out, "\t\t{:<15} [{} point(s)]", result.report.verdict().label(), result.report.score)?;
            }
            Ok(())
        }
    }
}

/// Totals and the final grade.
pub fn write_grade(out: &mut impl Write, grade: &Grade) -> io::Result<()> {
    writeln!(out, "Total score: {} / {}", grade.raw, grade.max)?;
    if grade.penalized() {
        writeln!(
            out,
            "There were some compilation warnings. A {}% penalty will be applied.",
            100 - WARNING_PENALTY_PERCENT
        )?;
    }
    writeln!(out, "Assignment grade: {:.2} / 100", grade.percent)
}

/// Printed instead of any run when the subject did not build.
pub fn write_compilation_error(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "COMPILATION ERROR")
}

//! syncprobe command-line entry point.
//!
//! # Usage
//!
//! ```sh
//! syncprobe --scenario a2_data.json --build-command "gcc -Wall a2.c -o a2" -- ./a2
//! ```
//!
//! Every flag can also be set through a `SYNCPROBE_*` environment variable or
//! a TOML file passed with `--config`.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use syncprobe::ConfigOverrides;
use syncprobe::HarnessConfig;
use syncprobe::OutputFormat;
use syncprobe::run_session;

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "syncprobe")]
#[command(about = "Grade a concurrent program by injecting delays and checking its event ordering")]
struct Args {
    /// TOML configuration file.
    #[arg(short, long, env = "SYNCPROBE_CONFIG")]
    config: Option<PathBuf>,

    /// Address the event listener binds to.
    #[arg(long, env = "SYNCPROBE_LISTEN_ADDR")]
    listen_addr: Option<SocketAddr>,

    /// Wall-clock limit per run in milliseconds.
    #[arg(long, env = "SYNCPROBE_TIME_LIMIT_MS")]
    time_limit_ms: Option<u64>,

    /// Scenario document (JSON or base64-encoded JSON).
    #[arg(short, long, env = "SYNCPROBE_SCENARIO")]
    scenario: Option<PathBuf>,

    /// Build command, split on whitespace.
    #[arg(long, env = "SYNCPROBE_BUILD_COMMAND")]
    build_command: Option<String>,

    /// File the build command produces; removed before each build.
    #[arg(long, env = "SYNCPROBE_BUILD_ARTIFACT")]
    build_artifact: Option<PathBuf>,

    /// File receiving the build output.
    #[arg(long, env = "SYNCPROBE_BUILD_LOG")]
    build_log: Option<PathBuf>,

    /// Forward the subject's output and enable debug logging.
    #[arg(short, long, env = "SYNCPROBE_VERBOSE")]
    verbose: bool,

    /// Print one JSON document instead of the console report.
    #[arg(long)]
    json: bool,

    /// Subject command line.
    #[arg(last = true)]
    subject: Vec<String>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            listen_addr: self.listen_addr,
            time_limit_ms: self.time_limit_ms,
            subject_command: (!self.subject.is_empty()).then(|| self.subject.clone()),
            build_command: self
                .build_command
                .as_deref()
                .map(|cmd| cmd.split_whitespace().map(str::to_string).collect()),
            build_artifact: self.build_artifact.clone(),
            build_log: self.build_log.clone(),
            scenario_path: self.scenario.clone(),
            verbose: self.verbose,
        }
    }
}

/// Initialize tracing. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config =
        HarnessConfig::load_with_optional_file(args.config.as_ref()).context("failed to load configuration")?;
    config.apply_overrides(args.overrides());

    let format = if args.json { OutputFormat::Json } else { OutputFormat::Text };
    let mut stdout = std::io::stdout().lock();
    run_session(&config, format, &mut stdout).await?;
    Ok(())
}

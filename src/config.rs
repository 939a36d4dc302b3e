//! Harness configuration.
//!
//! Values come from three layers, later ones winning: built-in defaults, an
//! optional TOML file, then command-line flags and `SYNCPROBE_*` environment
//! variables.

use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use snafu::ResultExt;
use snafu::Snafu;
use syncprobe_core::ScenarioDescription;
use syncprobe_core::ScenarioError;
use syncprobe_harness::BuildSpec;
use syncprobe_harness::SubjectCommand;

/// Default values for configuration
mod defaults {
    use std::net::Ipv4Addr;
    use std::net::SocketAddr;
    use std::path::PathBuf;

    use syncprobe_constants::schedule::DEFAULT_TIME_LIMIT_MS;
    use syncprobe_constants::wire::DEFAULT_LISTENER_PORT;

    pub fn listen_addr() -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_LISTENER_PORT))
    }

    pub fn time_limit_ms() -> u64 {
        DEFAULT_TIME_LIMIT_MS
    }

    pub fn subject_command() -> Vec<String> {
        vec!["./subject".to_string()]
    }

    pub fn build_log() -> PathBuf {
        "compile_log.txt".into()
    }

    pub fn scenario_path() -> PathBuf {
        "scenario_data.json".into()
    }
}

/// Configuration errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// The config file could not be read.
    #[snafu(display("failed to read config file {}: {source}", path.display()))]
    ReadConfig { path: PathBuf, source: std::io::Error },

    /// The config file is not valid TOML for [`HarnessConfig`].
    #[snafu(display("failed to parse config file {}: {source}", path.display()))]
    ParseConfig { path: PathBuf, source: toml::de::Error },

    /// A value is out of range.
    #[snafu(display("invalid configuration for {key}: {reason}"))]
    InvalidValue { key: &'static str, reason: String },

    /// The scenario document could not be read.
    #[snafu(display("failed to read scenario {}: {source}", path.display()))]
    ReadScenario { path: PathBuf, source: std::io::Error },

    /// The scenario document is not a valid scenario.
    #[snafu(display("invalid scenario {}: {source}", path.display()))]
    Scenario { path: PathBuf, source: ScenarioError },
}

/// Complete harness configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    /// Address the event listener binds to.
    #[serde(default = "defaults::listen_addr")]
    pub listen_addr: SocketAddr,
    /// Wall-clock limit for one run, in milliseconds.
    #[serde(default = "defaults::time_limit_ms")]
    pub time_limit_ms: u64,
    /// Subject command line; the first element is the executable.
    #[serde(default = "defaults::subject_command")]
    pub subject_command: Vec<String>,
    /// Build command line. When absent the subject is assumed buildable.
    #[serde(default)]
    pub build_command: Option<Vec<String>>,
    /// File the build command produces. Removed before each build.
    ///
    /// When absent the subject executable must exist after the build, and is
    /// never removed.
    #[serde(default)]
    pub build_artifact: Option<PathBuf>,
    /// Where the build output is written.
    #[serde(default = "defaults::build_log")]
    pub build_log: PathBuf,
    /// Scenario document (JSON or base64-encoded JSON).
    #[serde(default = "defaults::scenario_path")]
    pub scenario_path: PathBuf,
    /// Forward the subject's stdout/stderr instead of discarding it.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            listen_addr: defaults::listen_addr(),
            time_limit_ms: defaults::time_limit_ms(),
            subject_command: defaults::subject_command(),
            build_command: None,
            build_artifact: None,
            build_log: defaults::build_log(),
            scenario_path: defaults::scenario_path(),
            verbose: false,
        }
    }
}

/// Values supplied on the command line or through the environment.
///
/// `None` (or `false`) leaves the file or default value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub listen_addr: Option<SocketAddr>,
    pub time_limit_ms: Option<u64>,
    pub subject_command: Option<Vec<String>>,
    pub build_command: Option<Vec<String>>,
    pub build_artifact: Option<PathBuf>,
    pub build_log: Option<PathBuf>,
    pub scenario_path: Option<PathBuf>,
    pub verbose: bool,
}

impl HarnessConfig {
    /// Load configuration from a TOML file. Missing keys take their defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).context(ReadConfigSnafu { path })?;
        toml::from_str(&contents).context(ParseConfigSnafu { path })
    }

    /// Load from `path` when given, otherwise start from the defaults.
    pub fn load_with_optional_file(path: Option<impl AsRef<Path>>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_toml_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Apply command-line and environment overrides.
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(addr) = overrides.listen_addr {
            self.listen_addr = addr;
        }
        if let Some(ms) = overrides.time_limit_ms {
            self.time_limit_ms = ms;
        }
        if let Some(cmd) = overrides.subject_command {
            self.subject_command = cmd;
        }
        if let Some(cmd) = overrides.build_command {
            self.build_command = Some(cmd);
        }
        if let Some(path) = overrides.build_artifact {
            self.build_artifact = Some(path);
        }
        if let Some(path) = overrides.build_log {
            self.build_log = path;
        }
        if let Some(path) = overrides.scenario_path {
            self.scenario_path = path;
        }
        self.verbose |= overrides.verbose;
    }

    /// Reject configurations the harness cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subject_command.first().is_none_or(|program| program.is_empty()) {
            return InvalidValueSnafu {
                key: "subject_command",
                reason: "must name an executable",
            }
            .fail();
        }
        if self.time_limit_ms == 0 {
            return InvalidValueSnafu {
                key: "time_limit_ms",
                reason: "must be greater than 0",
            }
            .fail();
        }
        if let Some(build) = &self.build_command
            && build.first().is_none_or(|program| program.is_empty())
        {
            return InvalidValueSnafu {
                key: "build_command",
                reason: "must name an executable when set",
            }
            .fail();
        }
        Ok(())
    }

    /// Per-run wall-clock limit.
    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time_limit_ms)
    }

    /// The subject command the scheduler launches.
    pub fn subject(&self) -> Result<SubjectCommand, ConfigError> {
        SubjectCommand::from_argv(self.subject_command.iter().cloned())
            .map(|cmd| cmd.forward_output(self.verbose))
            .map_err(|e| ConfigError::InvalidValue {
                key: "subject_command",
                reason: e.to_string(),
            })
    }

    /// Build step, if one is configured.
    ///
    /// The artifact is `build_artifact`, falling back to the subject
    /// executable, which is only checked for existence.
    pub fn build_spec(&self) -> Option<BuildSpec> {
        let command = self.build_command.clone()?;
        let (artifact, remove_stale) = match &self.build_artifact {
            Some(path) => (path.clone(), true),
            None => (PathBuf::from(self.subject_command.first()?), false),
        };
        Some(BuildSpec {
            command,
            artifact,
            remove_stale,
            log_path: self.build_log.clone(),
        })
    }

    /// Read and decode the scenario document.
    pub fn load_scenario(&self) -> Result<ScenarioDescription, ConfigError> {
        let path = &self.scenario_path;
        let text = std::fs::read_to_string(path).context(ReadScenarioSnafu { path })?;
        ScenarioDescription::from_document(&text).context(ScenarioSnafu { path })
    }
}

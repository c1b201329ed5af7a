// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{LaunchSpec, Readiness, StopSignal};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [supervisor]
/// launch_delay = "2s"
/// state_file = ".procset/state.json"
///
/// [stop]
/// match = ["databend-query", "databend-meta"]
/// grace_period = "5s"
///
/// [[launch]]
/// executable = "./target/release/databend-query"
/// config = "scripts/deploy/config/databend-query-node-1.toml"
/// ```
///
/// All sections are optional at the serde level; [`ConfigFile::try_from`]
/// enforces the semantic rules.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub supervisor: SupervisorSection,

    #[serde(default)]
    pub stop: StopSection,

    /// Launch entries, in launch order.
    #[serde(default)]
    pub launch: Vec<LaunchConfig>,
}

/// `[supervisor]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SupervisorSection {
    /// Readiness delay used by entries without a `ready` table.
    #[serde(default = "default_launch_delay")]
    pub launch_delay: String,

    /// Default timeout for `tcp` and `log_marker` probes.
    #[serde(default = "default_ready_timeout")]
    pub ready_timeout: String,

    /// Default polling interval for probes and stop confirmation.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    /// Stop launching further entries once one fails to spawn or get ready.
    #[serde(default)]
    pub abort_on_failure: bool,

    /// JSON registry of launched processes, used by later `stop` runs.
    #[serde(default)]
    pub state_file: Option<String>,
}

fn default_launch_delay() -> String {
    "2s".to_string()
}

fn default_ready_timeout() -> String {
    "30s".to_string()
}

fn default_poll_interval() -> String {
    "100ms".to_string()
}

impl Default for SupervisorSection {
    fn default() -> Self {
        Self {
            launch_delay: default_launch_delay(),
            ready_timeout: default_ready_timeout(),
            poll_interval: default_poll_interval(),
            abort_on_failure: false,
            state_file: None,
        }
    }
}

/// `[stop]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StopSection {
    /// Command-line substrings used for discovery.
    ///
    /// `None` derives them from the launch executables' file names; an
    /// explicit empty list disables discovery.
    #[serde(default, rename = "match")]
    pub patterns: Option<Vec<String>>,

    #[serde(default)]
    pub signal: StopSignal,

    /// Wait this long for signalled processes to exit.
    #[serde(default)]
    pub grace_period: Option<String>,

    /// SIGKILL whatever survives `grace_period`.
    #[serde(default)]
    pub force: bool,
}

/// `[[launch]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct LaunchConfig {
    /// Defaults to the file stem of `config`.
    #[serde(default)]
    pub name: Option<String>,

    pub executable: String,

    pub config: String,

    #[serde(default)]
    pub log_file: Option<String>,

    #[serde(default)]
    pub ready: Option<ReadyConfig>,
}

/// `ready = { kind = "...", ... }` table of a launch entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReadyConfig {
    Delay {
        #[serde(default)]
        duration: Option<String>,
    },
    Tcp {
        address: String,
        #[serde(default)]
        timeout: Option<String>,
        #[serde(default)]
        interval: Option<String>,
    },
    LogMarker {
        pattern: String,
        #[serde(default)]
        timeout: Option<String>,
        #[serde(default)]
        interval: Option<String>,
    },
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>` or
/// [`ConfigFile::builtin`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub supervisor: SupervisorSettings,
    pub stop: StopSettings,
    pub launch: Vec<LaunchSpec>,
}

#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    pub poll_interval: Duration,
    pub abort_on_failure: bool,
    pub state_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct StopSettings {
    pub patterns: Vec<String>,
    pub signal: StopSignal,
    pub grace_period: Option<Duration>,
    pub force: bool,
}

pub const BUILTIN_EXECUTABLE: &str = "./target/release/databend-query";
pub const BUILTIN_CONFIGS: [&str; 3] = [
    "scripts/deploy/config/databend-query-node-1.toml",
    "scripts/deploy/config/databend-query-node-3.toml",
    "scripts/deploy/config/databend-query-node-2.toml",
];
pub const BUILTIN_MATCH: [&str; 2] = ["databend-query", "databend-meta"];

impl ConfigFile {
    pub(crate) fn new_unchecked(
        supervisor: SupervisorSettings,
        stop: StopSettings,
        launch: Vec<LaunchSpec>,
    ) -> Self {
        Self {
            supervisor,
            stop,
            launch,
        }
    }

    /// The three-node query layout used when no config file is present:
    /// one executable started with three node configs, two seconds apart.
    pub fn builtin() -> Self {
        let launch = BUILTIN_CONFIGS
            .iter()
            .enumerate()
            .map(|(idx, cfg)| LaunchSpec {
                name: format!("query-{}", idx + 1),
                executable: PathBuf::from(BUILTIN_EXECUTABLE),
                config: PathBuf::from(cfg),
                log_file: None,
                readiness: Readiness::Delay(Duration::from_secs(2)),
            })
            .collect();

        Self {
            supervisor: SupervisorSettings {
                poll_interval: Duration::from_millis(100),
                abort_on_failure: false,
                state_file: None,
            },
            stop: StopSettings {
                patterns: BUILTIN_MATCH.iter().map(|s| s.to_string()).collect(),
                signal: StopSignal::Term,
                grace_period: None,
                force: false,
            },
            launch,
        }
    }
}

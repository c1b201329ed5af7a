#![allow(dead_code)]

use std::path::Path;

use procset::config::{ConfigFile, LaunchConfig, RawConfigFile, ReadyConfig};

fn path_string(path: impl AsRef<Path>) -> String {
    path.as_ref().to_string_lossy().into_owned()
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_launch(mut self, launch: LaunchConfig) -> Self {
        self.config.launch.push(launch);
        self
    }

    pub fn launch_delay(mut self, delay: &str) -> Self {
        self.config.supervisor.launch_delay = delay.to_string();
        self
    }

    pub fn ready_timeout(mut self, timeout: &str) -> Self {
        self.config.supervisor.ready_timeout = timeout.to_string();
        self
    }

    pub fn poll_interval(mut self, interval: &str) -> Self {
        self.config.supervisor.poll_interval = interval.to_string();
        self
    }

    pub fn abort_on_failure(mut self, val: bool) -> Self {
        self.config.supervisor.abort_on_failure = val;
        self
    }

    pub fn state_file(mut self, path: impl AsRef<Path>) -> Self {
        self.config.supervisor.state_file = Some(path_string(path));
        self
    }

    /// Set `[stop].match`; an empty slice disables discovery.
    pub fn match_patterns(mut self, patterns: &[&str]) -> Self {
        self.config.stop.patterns = Some(patterns.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn signal(mut self, signal: &str) -> Self {
        self.config.stop.signal = signal.parse().expect("valid signal name");
        self
    }

    pub fn grace_period(mut self, grace: &str) -> Self {
        self.config.stop.grace_period = Some(grace.to_string());
        self
    }

    pub fn force(mut self, val: bool) -> Self {
        self.config.stop.force = val;
        self
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `LaunchConfig`.
pub struct LaunchConfigBuilder {
    launch: LaunchConfig,
}

impl LaunchConfigBuilder {
    pub fn new(executable: impl AsRef<Path>, config: impl AsRef<Path>) -> Self {
        Self {
            launch: LaunchConfig {
                name: None,
                executable: path_string(executable),
                config: path_string(config),
                log_file: None,
                ready: None,
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.launch.name = Some(name.to_string());
        self
    }

    pub fn log_file(mut self, path: impl AsRef<Path>) -> Self {
        self.launch.log_file = Some(path_string(path));
        self
    }

    pub fn ready_delay(mut self, duration: &str) -> Self {
        self.launch.ready = Some(ReadyConfig::Delay {
            duration: Some(duration.to_string()),
        });
        self
    }

    pub fn ready_tcp(mut self, address: &str, timeout: &str) -> Self {
        self.launch.ready = Some(ReadyConfig::Tcp {
            address: address.to_string(),
            timeout: Some(timeout.to_string()),
            interval: Some("50ms".to_string()),
        });
        self
    }

    pub fn ready_log_marker(mut self, pattern: &str, timeout: &str) -> Self {
        self.launch.ready = Some(ReadyConfig::LogMarker {
            pattern: pattern.to_string(),
            timeout: Some(timeout.to_string()),
            interval: Some("50ms".to_string()),
        });
        self
    }

    pub fn build(self) -> LaunchConfig {
        self.launch
    }
}

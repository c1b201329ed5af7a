// src/config/validate.rs

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;

use crate::config::model::{
    ConfigFile, LaunchConfig, RawConfigFile, ReadyConfig, StopSettings, SupervisorSettings,
};
use crate::errors::{ProcsetError, Result};
use crate::types::{parse_duration, LaunchSpec, Readiness};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::ProcsetError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_launches(&raw)?;

        let launch_delay = duration_field("[supervisor].launch_delay", &raw.supervisor.launch_delay)?;
        let ready_timeout =
            duration_field("[supervisor].ready_timeout", &raw.supervisor.ready_timeout)?;
        let poll_interval =
            duration_field("[supervisor].poll_interval", &raw.supervisor.poll_interval)?;
        if poll_interval.is_zero() {
            return Err(config_error("[supervisor].poll_interval must be > 0"));
        }

        let defaults = ReadyDefaults {
            launch_delay,
            ready_timeout,
            poll_interval,
        };

        let mut launch = Vec::with_capacity(raw.launch.len());
        for (idx, entry) in raw.launch.iter().enumerate() {
            launch.push(build_launch_spec(idx, entry, &defaults)?);
        }
        ensure_unique_names(&launch)?;

        let stop = build_stop_settings(&raw, &launch)?;

        let supervisor = SupervisorSettings {
            poll_interval,
            abort_on_failure: raw.supervisor.abort_on_failure,
            state_file: raw.supervisor.state_file.as_ref().map(PathBuf::from),
        };

        Ok(ConfigFile::new_unchecked(supervisor, stop, launch))
    }
}

struct ReadyDefaults {
    launch_delay: Duration,
    ready_timeout: Duration,
    poll_interval: Duration,
}

fn ensure_has_launches(cfg: &RawConfigFile) -> Result<()> {
    if cfg.launch.is_empty() {
        return Err(config_error(
            "config must contain at least one [[launch]] entry",
        ));
    }
    Ok(())
}

fn build_launch_spec(idx: usize, entry: &LaunchConfig, defaults: &ReadyDefaults) -> Result<LaunchSpec> {
    if entry.executable.trim().is_empty() {
        return Err(config_error(format!(
            "launch entry #{} has an empty `executable`",
            idx + 1
        )));
    }
    if entry.config.trim().is_empty() {
        return Err(config_error(format!(
            "launch entry #{} has an empty `config`",
            idx + 1
        )));
    }

    let config = PathBuf::from(&entry.config);
    let name = match &entry.name {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        Some(_) => {
            return Err(config_error(format!(
                "launch entry #{} has an empty `name`",
                idx + 1
            )))
        }
        None => default_name(&config, idx),
    };

    let readiness = build_readiness(&name, entry, defaults)?;

    Ok(LaunchSpec {
        name,
        executable: PathBuf::from(&entry.executable),
        config,
        log_file: entry.log_file.as_ref().map(PathBuf::from),
        readiness,
    })
}

fn default_name(config: &Path, idx: usize) -> String {
    config
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("launch-{}", idx + 1))
}

fn build_readiness(name: &str, entry: &LaunchConfig, defaults: &ReadyDefaults) -> Result<Readiness> {
    let ready = match &entry.ready {
        None => return Ok(Readiness::Delay(defaults.launch_delay)),
        Some(ready) => ready,
    };

    let field = |key: &str| format!("launch '{name}' ready.{key}");

    match ready {
        ReadyConfig::Delay { duration } => {
            let delay = optional_duration(&field("duration"), duration.as_deref())?
                .unwrap_or(defaults.launch_delay);
            Ok(Readiness::Delay(delay))
        }
        ReadyConfig::Tcp {
            address,
            timeout,
            interval,
        } => {
            if address.trim().is_empty() {
                return Err(config_error(format!("{} must not be empty", field("address"))));
            }
            Ok(Readiness::Tcp {
                address: address.trim().to_string(),
                timeout: optional_duration(&field("timeout"), timeout.as_deref())?
                    .unwrap_or(defaults.ready_timeout),
                interval: probe_interval(&field("interval"), interval.as_deref(), defaults)?,
            })
        }
        ReadyConfig::LogMarker {
            pattern,
            timeout,
            interval,
        } => {
            if entry.log_file.is_none() {
                return Err(config_error(format!(
                    "launch '{name}' uses a log_marker readiness probe but has no `log_file`"
                )));
            }
            let pattern = Regex::new(pattern).map_err(|e| {
                config_error(format!("{} is not a valid regex: {e}", field("pattern")))
            })?;
            Ok(Readiness::LogMarker {
                pattern,
                timeout: optional_duration(&field("timeout"), timeout.as_deref())?
                    .unwrap_or(defaults.ready_timeout),
                interval: probe_interval(&field("interval"), interval.as_deref(), defaults)?,
            })
        }
    }
}

fn probe_interval(key: &str, raw: Option<&str>, defaults: &ReadyDefaults) -> Result<Duration> {
    let interval = optional_duration(key, raw)?.unwrap_or(defaults.poll_interval);
    if interval.is_zero() {
        return Err(config_error(format!("{key} must be > 0")));
    }
    Ok(interval)
}

fn ensure_unique_names(launch: &[LaunchSpec]) -> Result<()> {
    let mut seen = HashSet::new();
    for spec in launch {
        if !seen.insert(spec.name.as_str()) {
            return Err(config_error(format!(
                "duplicate launch name '{}'; set `name` explicitly on one of the entries",
                spec.name
            )));
        }
    }
    Ok(())
}

fn build_stop_settings(raw: &RawConfigFile, launch: &[LaunchSpec]) -> Result<StopSettings> {
    let patterns = match &raw.stop.patterns {
        Some(patterns) => {
            if patterns.iter().any(|p| p.trim().is_empty()) {
                return Err(config_error(
                    "[stop].match must not contain empty strings (they would match every process)",
                ));
            }
            patterns.clone()
        }
        None => executable_names(launch),
    };

    let grace_period = optional_duration("[stop].grace_period", raw.stop.grace_period.as_deref())?;
    if raw.stop.force && grace_period.is_none() {
        return Err(config_error("[stop].force requires [stop].grace_period"));
    }

    Ok(StopSettings {
        patterns,
        signal: raw.stop.signal,
        grace_period,
        force: raw.stop.force,
    })
}

/// Distinct executable file names, in launch order.
fn executable_names(launch: &[LaunchSpec]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for spec in launch {
        let name = spec
            .executable
            .file_name()
            .and_then(|s| s.to_str())
            .map(|s| s.to_string());
        if let Some(name) = name {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

fn duration_field(key: &str, raw: &str) -> Result<Duration> {
    parse_duration(raw).map_err(|e| config_error(format!("{key}: {e}")))
}

fn optional_duration(key: &str, raw: Option<&str>) -> Result<Option<Duration>> {
    raw.map(|s| duration_field(key, s)).transpose()
}

fn config_error(msg: impl Into<String>) -> ProcsetError {
    ProcsetError::ConfigError(msg.into())
}

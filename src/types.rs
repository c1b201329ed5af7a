// src/types.rs

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

/// What the supervisor was asked to do.
///
/// Parsing is deliberately lenient about case and whitespace, and anything
/// unrecognised maps to `None` so the caller can treat it as a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Stop,
}

impl Action {
    pub fn parse(mode: &str) -> Option<Action> {
        match mode.trim().to_lowercase().as_str() {
            "start" => Some(Action::Start),
            "stop" => Some(Action::Stop),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Start => f.write_str("start"),
            Action::Stop => f.write_str("stop"),
        }
    }
}

/// One process to launch: `<executable> -c <config>`.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Label used in logs, reports and the state file.
    pub name: String,
    pub executable: PathBuf,
    /// Passed opaquely as the `-c` argument.
    pub config: PathBuf,
    /// When set, stdout and stderr of the child are appended here.
    pub log_file: Option<PathBuf>,
    pub readiness: Readiness,
}

impl LaunchSpec {
    /// The argument vector handed to the executable.
    pub fn args(&self) -> Vec<std::ffi::OsString> {
        vec!["-c".into(), self.config.clone().into_os_string()]
    }
}

/// Barrier applied after each spawn before the next entry is launched.
#[derive(Debug, Clone)]
pub enum Readiness {
    /// Sleep for a fixed duration. Purely time based: the process is not
    /// observed except for an early exit.
    Delay(Duration),

    /// Poll a TCP connect to `address` until it succeeds.
    Tcp {
        address: String,
        timeout: Duration,
        interval: Duration,
    },

    /// Poll the launch's log file until a line written after the spawn
    /// matches `pattern`.
    LogMarker {
        pattern: Regex,
        timeout: Duration,
        interval: Duration,
    },
}

impl Readiness {
    pub fn kind(&self) -> &'static str {
        match self {
            Readiness::Delay(_) => "delay",
            Readiness::Tcp { .. } => "tcp",
            Readiness::LogMarker { .. } => "log_marker",
        }
    }
}

/// Signal sent to stop a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum StopSignal {
    Term,
    Int,
    Hup,
    Quit,
    Kill,
}

impl Default for StopSignal {
    fn default() -> Self {
        StopSignal::Term
    }
}

impl FromStr for StopSignal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        let bare = upper.strip_prefix("SIG").unwrap_or(&upper);
        match bare {
            "TERM" => Ok(StopSignal::Term),
            "INT" => Ok(StopSignal::Int),
            "HUP" => Ok(StopSignal::Hup),
            "QUIT" => Ok(StopSignal::Quit),
            "KILL" => Ok(StopSignal::Kill),
            _ => Err(format!(
                "invalid stop signal: {s} (expected one of SIGTERM, SIGINT, SIGHUP, SIGQUIT, SIGKILL)"
            )),
        }
    }
}

impl TryFrom<String> for StopSignal {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for StopSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StopSignal::Term => "SIGTERM",
            StopSignal::Int => "SIGINT",
            StopSignal::Hup => "SIGHUP",
            StopSignal::Quit => "SIGQUIT",
            StopSignal::Kill => "SIGKILL",
        };
        f.write_str(name)
    }
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' is missing a unit suffix"))?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ))
        }
    };
    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}

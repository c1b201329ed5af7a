// src/supervisor/report.rs

//! Structured per-process outcomes of `start` and `stop`.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{info, warn};

/// Why a spawned process was not considered ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotReadyReason {
    /// The process exited before becoming ready (exit code if any).
    Exited(Option<i32>),
    /// The probe did not succeed within the configured timeout.
    TimedOut(Duration),
    /// The probe itself failed (unreadable log file, ...).
    Probe(String),
}

impl fmt::Display for NotReadyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotReadyReason::Exited(Some(code)) => write!(f, "exited with code {code}"),
            NotReadyReason::Exited(None) => f.write_str("exited (killed by signal)"),
            NotReadyReason::TimedOut(d) => write!(f, "not ready after {d:?}"),
            NotReadyReason::Probe(e) => write!(f, "readiness probe failed: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    Ready { pid: u32, waited: Duration },
    NotReady { pid: u32, reason: NotReadyReason },
    SpawnFailed { error: String },
}

impl LaunchOutcome {
    pub fn pid(&self) -> Option<u32> {
        match self {
            LaunchOutcome::Ready { pid, .. } | LaunchOutcome::NotReady { pid, .. } => Some(*pid),
            LaunchOutcome::SpawnFailed { .. } => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self, LaunchOutcome::Ready { .. })
    }
}

/// Result of launching one entry.
#[derive(Debug, Clone)]
pub struct LaunchEntry {
    pub name: String,
    /// When the spawn call returned; `None` if it failed.
    pub spawned_at: Option<Instant>,
    pub outcome: LaunchOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct StartReport {
    /// One entry per attempted launch, in launch order.
    pub entries: Vec<LaunchEntry>,
    /// Names not attempted because `abort_on_failure` cut the run short.
    pub skipped: Vec<String>,
}

impl StartReport {
    pub fn has_failures(&self) -> bool {
        !self.skipped.is_empty() || self.entries.iter().any(|e| e.outcome.is_failure())
    }

    pub fn pids(&self) -> Vec<u32> {
        self.entries.iter().filter_map(|e| e.outcome.pid()).collect()
    }

    pub fn entry(&self, name: &str) -> Option<&LaunchEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn log_summary(&self) {
        let ready = self
            .entries
            .iter()
            .filter(|e| !e.outcome.is_failure())
            .count();
        if self.has_failures() {
            warn!(
                ready,
                attempted = self.entries.len(),
                skipped = self.skipped.len(),
                "start finished with failures"
            );
        } else {
            info!(ready, "start finished; all processes launched");
        }
    }
}

/// How a stop target was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSource {
    /// Spawned by this supervisor instance.
    Owned,
    /// Listed in the state file by an earlier `start`.
    Recorded,
    /// Matched by command-line substring.
    Discovered,
}

impl fmt::Display for TargetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetSource::Owned => f.write_str("owned"),
            TargetSource::Recorded => f.write_str("recorded"),
            TargetSource::Discovered => f.write_str("discovered"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// Signal delivered; exit not confirmed (no grace period configured).
    Signalled,
    /// Exited within the grace period.
    Terminated,
    /// Survived the grace period and was SIGKILLed.
    Killed,
    /// Still alive after the grace period.
    StillRunning,
    /// Gone before it could be signalled.
    AlreadyExited,
    PermissionDenied,
    Failed(String),
}

impl StopOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            StopOutcome::StillRunning | StopOutcome::PermissionDenied | StopOutcome::Failed(_)
        )
    }
}

impl fmt::Display for StopOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopOutcome::Signalled => f.write_str("signalled"),
            StopOutcome::Terminated => f.write_str("terminated"),
            StopOutcome::Killed => f.write_str("killed"),
            StopOutcome::StillRunning => f.write_str("still running"),
            StopOutcome::AlreadyExited => f.write_str("already exited"),
            StopOutcome::PermissionDenied => f.write_str("permission denied"),
            StopOutcome::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StopEntry {
    pub pid: u32,
    pub label: String,
    pub source: TargetSource,
    pub outcome: StopOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct StopReport {
    pub entries: Vec<StopEntry>,
}

impl StopReport {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_failures(&self) -> bool {
        self.entries.iter().any(|e| e.outcome.is_failure())
    }

    pub fn outcome_of(&self, pid: u32) -> Option<&StopOutcome> {
        self.entries.iter().find(|e| e.pid == pid).map(|e| &e.outcome)
    }

    pub fn pids_from(&self, source: TargetSource) -> Vec<u32> {
        self.entries
            .iter()
            .filter(|e| e.source == source)
            .map(|e| e.pid)
            .collect()
    }

    pub fn log_summary(&self) {
        if self.entries.is_empty() {
            info!("stop finished; no matching processes");
            return;
        }
        for entry in &self.entries {
            if entry.outcome.is_failure() {
                warn!(
                    pid = entry.pid,
                    source = %entry.source,
                    outcome = %entry.outcome,
                    target = %entry.label,
                    "stop target not stopped"
                );
            }
        }
        info!(
            targets = self.entries.len(),
            failures = self.entries.iter().filter(|e| e.outcome.is_failure()).count(),
            "stop finished"
        );
    }
}

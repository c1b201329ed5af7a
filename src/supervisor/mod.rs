// src/supervisor/mod.rs

//! The process supervisor.
//!
//! - [`launcher`] spawns one launch entry detached from the supervisor.
//! - [`readiness`] implements the barrier applied after each spawn.
//! - [`process_table`] abstracts enumeration and signalling of OS processes.
//! - [`registry`] persists launched pids for later `stop` invocations.
//! - [`report`] holds the structured outcomes returned to the caller.
//!
//! `stop` works in three passes: processes this instance spawned, processes
//! listed in the state file, then command-line substring discovery for
//! anything started out-of-band.

pub mod launcher;
pub mod process_table;
pub mod readiness;
pub mod registry;
pub mod report;

use std::collections::HashSet;
use std::time::{Duration, Instant};

use tokio::process::Child;
use tracing::{debug, info, warn};

use crate::config::ConfigFile;
use crate::types::{LaunchSpec, StopSignal};

pub use process_table::{ProcessInfo, ProcessTable, SignalError, SystemProcessTable};
pub use registry::{ProcessRecord, ProcessRegistry};
pub use report::{
    LaunchEntry, LaunchOutcome, NotReadyReason, StartReport, StopEntry, StopOutcome, StopReport,
    TargetSource,
};

/// A process spawned by this supervisor instance.
#[derive(Debug)]
pub struct ManagedProcess {
    pub spec: LaunchSpec,
    pub pid: u32,
    pub spawned_at: Instant,
    child: Child,
}

/// A signalled target awaiting exit confirmation.
struct PendingTarget {
    pid: u32,
    label: String,
    source: TargetSource,
    child: Option<Child>,
    spec: Option<LaunchSpec>,
    outcome: StopOutcome,
}

pub struct Supervisor<T: ProcessTable = SystemProcessTable> {
    config: ConfigFile,
    table: T,
    owned: Vec<ManagedProcess>,
}

impl Supervisor<SystemProcessTable> {
    pub fn new(config: ConfigFile) -> Self {
        Self::with_process_table(config, SystemProcessTable::new())
    }
}

impl<T: ProcessTable> Supervisor<T> {
    pub fn with_process_table(config: ConfigFile, table: T) -> Self {
        Self {
            config,
            table,
            owned: Vec::new(),
        }
    }

    /// Processes spawned by this instance and not yet stopped.
    pub fn managed(&self) -> &[ManagedProcess] {
        &self.owned
    }

    /// Launch every entry in order, applying the readiness barrier after
    /// each spawn. Spawn `i` is never issued before entry `i-1` has been
    /// spawned and its barrier has finished.
    pub async fn start(&mut self) -> StartReport {
        let mut registry = self.open_registry();
        let specs = self.config.launch.clone();
        let mut report = StartReport::default();

        info!(count = specs.len(), "starting processes");

        for (idx, spec) in specs.iter().enumerate() {
            let entry = self.launch_one(spec, registry.as_mut()).await;
            let failed = entry.outcome.is_failure();
            report.entries.push(entry);

            if failed && self.config.supervisor.abort_on_failure {
                report.skipped = specs[idx + 1..].iter().map(|s| s.name.clone()).collect();
                warn!(
                    name = %spec.name,
                    skipped = ?report.skipped,
                    "launch failed and abort_on_failure is set; not launching the rest"
                );
                break;
            }
        }

        report.log_summary();
        report
    }

    async fn launch_one(
        &mut self,
        spec: &LaunchSpec,
        registry: Option<&mut ProcessRegistry>,
    ) -> LaunchEntry {
        let mut spawned = match launcher::spawn_detached(spec) {
            Ok(spawned) => spawned,
            Err(err) => {
                warn!(name = %spec.name, error = %format!("{err:#}"), "spawn failed");
                return LaunchEntry {
                    name: spec.name.clone(),
                    spawned_at: None,
                    outcome: LaunchOutcome::SpawnFailed {
                        error: format!("{err:#}"),
                    },
                };
            }
        };
        let pid = spawned.pid;

        if let Some(registry) = registry {
            let record = ProcessRecord {
                name: spec.name.clone(),
                pid,
                executable: spec.executable.clone(),
                config: spec.config.clone(),
                start_time: self.table.start_time(pid),
            };
            if let Err(e) = registry.register(record) {
                warn!(
                    path = %registry.path().display(),
                    error = %e,
                    "failed to write state file"
                );
            }
        }

        let outcome = match readiness::wait_ready(spec, &mut spawned).await {
            Ok(waited) => {
                info!(name = %spec.name, pid, ?waited, "process ready");
                LaunchOutcome::Ready { pid, waited }
            }
            Err(reason) => {
                warn!(name = %spec.name, pid, reason = %reason, "process not ready");
                LaunchOutcome::NotReady { pid, reason }
            }
        };

        self.owned.push(ManagedProcess {
            spec: spec.clone(),
            pid,
            spawned_at: spawned.spawned_at,
            child: spawned.child,
        });

        LaunchEntry {
            name: spec.name.clone(),
            spawned_at: Some(spawned.spawned_at),
            outcome,
        }
    }

    /// Stop owned, recorded and discovered processes.
    ///
    /// Finding nothing to stop is not an error; the report is just empty.
    pub async fn stop(&mut self) -> StopReport {
        let signal = self.config.stop.signal;
        let mut handled: HashSet<u32> = HashSet::new();
        let mut pending: Vec<PendingTarget> = Vec::new();

        self.signal_owned(signal, &mut handled, &mut pending);

        let mut registry = self.open_registry();
        let mut stale_records: Vec<u32> = Vec::new();
        if let Some(registry) = registry.as_ref() {
            self.signal_recorded(registry, signal, &mut handled, &mut pending, &mut stale_records);
        }

        self.signal_discovered(signal, &mut handled, &mut pending);

        if let Some(grace) = self.config.stop.grace_period {
            self.confirm_exit(&mut pending, grace).await;
        }

        let mut report = StopReport::default();
        let mut gone = stale_records;
        for target in pending {
            if target.outcome.is_failure() {
                // Keep failed owned processes so a later stop can retry.
                if let (Some(child), Some(spec)) = (target.child, target.spec) {
                    self.owned.push(ManagedProcess {
                        spec,
                        pid: target.pid,
                        spawned_at: Instant::now(),
                        child,
                    });
                }
            } else {
                gone.push(target.pid);
            }
            report.entries.push(StopEntry {
                pid: target.pid,
                label: target.label,
                source: target.source,
                outcome: target.outcome,
            });
        }

        if let Some(registry) = registry.as_mut() {
            if let Err(e) = registry.unregister_all(&gone) {
                warn!(
                    path = %registry.path().display(),
                    error = %e,
                    "failed to update state file"
                );
            }
        }

        report.log_summary();
        report
    }

    fn signal_owned(
        &mut self,
        signal: StopSignal,
        handled: &mut HashSet<u32>,
        pending: &mut Vec<PendingTarget>,
    ) {
        for mut proc in std::mem::take(&mut self.owned) {
            handled.insert(proc.pid);

            let outcome = match proc.child.try_wait() {
                Ok(Some(status)) => {
                    debug!(name = %proc.spec.name, pid = proc.pid, ?status, "owned process already exited");
                    StopOutcome::AlreadyExited
                }
                _ => self.send(proc.pid, signal),
            };

            pending.push(PendingTarget {
                pid: proc.pid,
                label: proc.spec.name.clone(),
                source: TargetSource::Owned,
                child: Some(proc.child),
                spec: Some(proc.spec),
                outcome,
            });
        }
    }

    fn signal_recorded(
        &mut self,
        registry: &ProcessRegistry,
        signal: StopSignal,
        handled: &mut HashSet<u32>,
        pending: &mut Vec<PendingTarget>,
        stale: &mut Vec<u32>,
    ) {
        for record in registry.records() {
            if handled.contains(&record.pid) {
                continue;
            }

            match (self.table.start_time(record.pid), record.start_time) {
                (None, _) => {
                    debug!(name = %record.name, pid = record.pid, "recorded process is gone");
                    handled.insert(record.pid);
                    pending.push(PendingTarget {
                        pid: record.pid,
                        label: record.name.clone(),
                        source: TargetSource::Recorded,
                        child: None,
                        spec: None,
                        outcome: StopOutcome::AlreadyExited,
                    });
                }
                (Some(now), Some(then)) if now == then => {
                    handled.insert(record.pid);
                    let outcome = self.send(record.pid, signal);
                    pending.push(PendingTarget {
                        pid: record.pid,
                        label: record.name.clone(),
                        source: TargetSource::Recorded,
                        child: None,
                        spec: None,
                        outcome,
                    });
                }
                (Some(_), recorded) => {
                    // Either the pid was recycled or its identity cannot be
                    // verified; leave it to substring discovery.
                    warn!(
                        name = %record.name,
                        pid = record.pid,
                        recorded_start_time = ?recorded,
                        "recorded pid belongs to a different process; not signalling it"
                    );
                    stale.push(record.pid);
                }
            }
        }
    }

    fn signal_discovered(
        &mut self,
        signal: StopSignal,
        handled: &mut HashSet<u32>,
        pending: &mut Vec<PendingTarget>,
    ) {
        let patterns = self.config.stop.patterns.clone();
        if patterns.is_empty() {
            debug!("no [stop].match substrings configured; skipping discovery");
            return;
        }

        let own_pid = std::process::id();
        for info in self.table.snapshot() {
            if info.pid == own_pid || handled.contains(&info.pid) {
                continue;
            }
            let Some(pattern) = patterns.iter().find(|p| info.matches(p)) else {
                continue;
            };

            debug!(pid = info.pid, pattern = %pattern, cmdline = %info.label(), "process matched");
            handled.insert(info.pid);
            let outcome = self.send(info.pid, signal);
            pending.push(PendingTarget {
                pid: info.pid,
                label: info.label().to_string(),
                source: TargetSource::Discovered,
                child: None,
                spec: None,
                outcome,
            });
        }
    }

    fn send(&mut self, pid: u32, signal: StopSignal) -> StopOutcome {
        match self.table.signal(pid, signal) {
            Ok(()) => {
                info!(pid, signal = %signal, "signal sent");
                StopOutcome::Signalled
            }
            Err(SignalError::NoSuchProcess) => StopOutcome::AlreadyExited,
            Err(SignalError::PermissionDenied) => {
                warn!(pid, signal = %signal, "permission denied while signalling");
                StopOutcome::PermissionDenied
            }
            Err(SignalError::Unsupported) => {
                StopOutcome::Failed("signals are not supported on this platform".to_string())
            }
            Err(SignalError::Other(e)) => {
                warn!(pid, signal = %signal, error = %e, "failed to signal process");
                StopOutcome::Failed(e)
            }
        }
    }

    /// Wait up to `grace` (shared by all targets) for signalled targets to
    /// exit; SIGKILL the survivors when `force` is set.
    async fn confirm_exit(&mut self, pending: &mut [PendingTarget], grace: Duration) {
        let deadline = readiness::deadline_after(tokio::time::Instant::now(), grace);
        let force = self.config.stop.force;

        for target in pending
            .iter_mut()
            .filter(|t| t.outcome == StopOutcome::Signalled)
        {
            let exited = match target.child.as_mut() {
                Some(child) => {
                    matches!(
                        tokio::time::timeout_at(deadline, child.wait()).await,
                        Ok(Ok(_))
                    )
                }
                None => self.wait_gone(target.pid, deadline).await,
            };

            target.outcome = if exited {
                StopOutcome::Terminated
            } else if force {
                self.force_kill(target).await
            } else {
                warn!(pid = target.pid, ?grace, "process survived the grace period");
                StopOutcome::StillRunning
            };
        }
    }

    async fn wait_gone(&mut self, pid: u32, deadline: tokio::time::Instant) -> bool {
        let interval = self.config.supervisor.poll_interval;
        loop {
            if !self.table.is_alive(pid) {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(interval).await;
        }
    }

    async fn force_kill(&mut self, target: &mut PendingTarget) -> StopOutcome {
        warn!(pid = target.pid, "process survived the grace period; sending SIGKILL");
        match self.send(target.pid, StopSignal::Kill) {
            StopOutcome::Signalled => {
                if let Some(child) = target.child.as_mut() {
                    let _ = tokio::time::timeout(Duration::from_secs(1), child.wait()).await;
                }
                StopOutcome::Killed
            }
            StopOutcome::AlreadyExited => StopOutcome::Terminated,
            other => other,
        }
    }

    fn open_registry(&self) -> Option<ProcessRegistry> {
        let path = self.config.supervisor.state_file.as_ref()?;
        match ProcessRegistry::load(path) {
            Ok(registry) => Some(registry),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read state file; ignoring it");
                None
            }
        }
    }
}

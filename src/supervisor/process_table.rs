// src/supervisor/process_table.rs

//! Pluggable view of the OS process table.
//!
//! The supervisor talks to a `ProcessTable` instead of calling `sysinfo` and
//! `kill(2)` directly, so tests can drive `stop` against a scripted table
//! without touching real processes.
//!
//! - [`SystemProcessTable`] is the production implementation: `sysinfo` for
//!   enumeration and liveness, `nix` for signals.
//! - Tests provide their own table that records which pids were signalled.

use std::collections::HashSet;

use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, System, UpdateKind};

use crate::types::StopSignal;

/// One row of a process table snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    /// Full command line joined with spaces; empty when unreadable.
    pub cmdline: String,
    /// Seconds since the epoch, as reported by the OS.
    pub start_time: u64,
}

impl ProcessInfo {
    /// Substring match over the command line, falling back to the process
    /// name when the command line could not be read.
    ///
    /// This is intentionally loose: any process whose command line contains
    /// `pattern` matches, including unrelated ones.
    pub fn matches(&self, pattern: &str) -> bool {
        if self.cmdline.is_empty() {
            self.name.contains(pattern)
        } else {
            self.cmdline.contains(pattern)
        }
    }

    /// Human-readable label for reports.
    pub fn label(&self) -> &str {
        if self.cmdline.is_empty() {
            &self.name
        } else {
            &self.cmdline
        }
    }
}

/// Why a signal could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalError {
    NoSuchProcess,
    PermissionDenied,
    Unsupported,
    Other(String),
}

/// Trait abstracting enumeration and signalling of OS processes.
pub trait ProcessTable: Send {
    /// Enumerate live (non-zombie) processes.
    fn snapshot(&mut self) -> Vec<ProcessInfo>;

    /// Start time of a live process, `None` if it is gone or a zombie.
    fn start_time(&mut self, pid: u32) -> Option<u64>;

    fn is_alive(&mut self, pid: u32) -> bool {
        self.start_time(pid).is_some()
    }

    fn signal(&mut self, pid: u32, signal: StopSignal) -> Result<(), SignalError>;
}

/// Real process table backed by `sysinfo` and `kill(2)`.
pub struct SystemProcessTable {
    sys: System,
}

impl SystemProcessTable {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }
}

impl Default for SystemProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable for SystemProcessTable {
    fn snapshot(&mut self) -> Vec<ProcessInfo> {
        // A plain refresh leaves `cmd` empty; matching needs the arguments.
        self.sys.refresh_processes_specifics(
            ProcessRefreshKind::new().with_cmd(UpdateKind::OnlyIfNotSet),
        );

        // Threads show up as their own entries on Linux; signalling a thread
        // id reaches its whole process, so keep only thread-group leaders.
        let threads: HashSet<Pid> = self
            .sys
            .processes()
            .iter()
            .filter_map(|(pid, proc)| proc.tasks().map(|tasks| (*pid, tasks)))
            .flat_map(|(pid, tasks)| tasks.iter().copied().filter(move |tid| *tid != pid))
            .collect();

        self.sys
            .processes()
            .iter()
            .filter(|(pid, _)| !threads.contains(*pid))
            .filter(|(_, proc)| proc.status() != ProcessStatus::Zombie)
            .map(|(pid, proc)| ProcessInfo {
                pid: pid.as_u32(),
                name: proc.name().to_string(),
                cmdline: proc.cmd().join(" "),
                start_time: proc.start_time(),
            })
            .collect()
    }

    fn start_time(&mut self, pid: u32) -> Option<u64> {
        let pid = Pid::from_u32(pid);
        if !self.sys.refresh_process(pid) {
            return None;
        }
        self.sys
            .process(pid)
            .filter(|proc| proc.status() != ProcessStatus::Zombie)
            .map(|proc| proc.start_time())
    }

    #[cfg(unix)]
    fn signal(&mut self, pid: u32, signal: StopSignal) -> Result<(), SignalError> {
        use nix::errno::Errno;
        use nix::sys::signal::kill;
        use nix::unistd::Pid as NixPid;

        // kill(2) treats 0 and negative pids as process groups.
        if pid == 0 || pid > i32::MAX as u32 {
            return Err(SignalError::Other(format!("refusing to signal pid {pid}")));
        }

        match kill(NixPid::from_raw(pid as i32), to_nix_signal(signal)) {
            Ok(()) => Ok(()),
            Err(Errno::ESRCH) => Err(SignalError::NoSuchProcess),
            Err(Errno::EPERM) => Err(SignalError::PermissionDenied),
            Err(e) => Err(SignalError::Other(e.to_string())),
        }
    }

    #[cfg(not(unix))]
    fn signal(&mut self, _pid: u32, _signal: StopSignal) -> Result<(), SignalError> {
        Err(SignalError::Unsupported)
    }
}

#[cfg(unix)]
fn to_nix_signal(signal: StopSignal) -> nix::sys::signal::Signal {
    use nix::sys::signal::Signal;

    match signal {
        StopSignal::Term => Signal::SIGTERM,
        StopSignal::Int => Signal::SIGINT,
        StopSignal::Hup => Signal::SIGHUP,
        StopSignal::Quit => Signal::SIGQUIT,
        StopSignal::Kill => Signal::SIGKILL,
    }
}

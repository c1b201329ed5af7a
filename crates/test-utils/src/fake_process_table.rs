use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use procset::supervisor::{ProcessInfo, ProcessTable, SignalError};
use procset::types::StopSignal;

#[derive(Debug, Default)]
struct TableState {
    processes: Vec<ProcessInfo>,
    signals: Vec<(u32, StopSignal)>,
    denied: HashSet<u32>,
    stubborn: HashSet<u32>,
}

/// A scripted process table that:
/// - lists the processes it was seeded with
/// - records every signal sent
/// - removes a process when signalled, unless it is "stubborn" (only
///   SIGKILL removes those) or signalling it is denied.
///
/// Clones share state, so a test can keep a handle after moving one into a
/// `Supervisor`.
#[derive(Debug, Clone, Default)]
pub struct FakeProcessTable {
    state: Arc<Mutex<TableState>>,
}

impl FakeProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_process(self, pid: u32, cmdline: &str) -> Self {
        self.with_process_started(pid, cmdline, 1_000)
    }

    pub fn with_process_started(self, pid: u32, cmdline: &str, start_time: u64) -> Self {
        let name = cmdline
            .split_whitespace()
            .next()
            .and_then(|arg0| arg0.rsplit('/').next())
            .unwrap_or("")
            .to_string();
        self.state.lock().unwrap().processes.push(ProcessInfo {
            pid,
            name,
            cmdline: cmdline.to_string(),
            start_time,
        });
        self
    }

    /// A process whose command line could not be read; only its name is known.
    pub fn with_named_process(self, pid: u32, name: &str) -> Self {
        self.state.lock().unwrap().processes.push(ProcessInfo {
            pid,
            name: name.to_string(),
            cmdline: String::new(),
            start_time: 1_000,
        });
        self
    }

    /// Signalling `pid` fails with EPERM.
    pub fn deny(self, pid: u32) -> Self {
        self.state.lock().unwrap().denied.insert(pid);
        self
    }

    /// `pid` ignores everything but SIGKILL.
    pub fn stubborn(self, pid: u32) -> Self {
        self.state.lock().unwrap().stubborn.insert(pid);
        self
    }

    pub fn signals(&self) -> Vec<(u32, StopSignal)> {
        self.state.lock().unwrap().signals.clone()
    }

    pub fn signalled_pids(&self) -> Vec<u32> {
        self.signals().into_iter().map(|(pid, _)| pid).collect()
    }

    pub fn alive_pids(&self) -> Vec<u32> {
        self.state
            .lock()
            .unwrap()
            .processes
            .iter()
            .map(|p| p.pid)
            .collect()
    }
}

impl ProcessTable for FakeProcessTable {
    fn snapshot(&mut self) -> Vec<ProcessInfo> {
        self.state.lock().unwrap().processes.clone()
    }

    fn start_time(&mut self, pid: u32) -> Option<u64> {
        self.state
            .lock()
            .unwrap()
            .processes
            .iter()
            .find(|p| p.pid == pid)
            .map(|p| p.start_time)
    }

    fn signal(&mut self, pid: u32, signal: StopSignal) -> Result<(), SignalError> {
        let mut state = self.state.lock().unwrap();
        if state.denied.contains(&pid) {
            return Err(SignalError::PermissionDenied);
        }
        if !state.processes.iter().any(|p| p.pid == pid) {
            return Err(SignalError::NoSuchProcess);
        }

        state.signals.push((pid, signal));
        if signal == StopSignal::Kill || !state.stubborn.contains(&pid) {
            state.processes.retain(|p| p.pid != pid);
        }
        Ok(())
    }
}

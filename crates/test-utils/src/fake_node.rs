use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use procset::supervisor::{ProcessInfo, ProcessTable, SystemProcessTable};
use tempfile::TempDir;

/// Body of a node that stays up until signalled.
pub const LONG_RUNNING: &str = "while :; do sleep 1; done";

/// A throwaway "server" executable: a shell script inside its own temp dir.
///
/// The temp dir path shows up in the command line of every process started
/// from it, so it doubles as a unique stop-match substring per test.
pub struct FakeNode {
    dir: TempDir,
    executable: PathBuf,
}

impl FakeNode {
    /// A node that runs until it is signalled.
    pub fn long_running() -> io::Result<Self> {
        Self::with_body(LONG_RUNNING)
    }

    /// A node running `body` as a `/bin/sh` script.
    pub fn with_body(body: &str) -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("procset-node-").tempdir()?;
        let executable = dir.path().join("fake-server");
        fs::write(&executable, format!("#!/bin/sh\n{body}\n"))?;
        fs::set_permissions(&executable, fs::Permissions::from_mode(0o755))?;
        Ok(Self { dir, executable })
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Create an (empty) node config file and return its path.
    pub fn config(&self, file_name: &str) -> io::Result<PathBuf> {
        let path = self.dir.path().join(file_name);
        fs::write(&path, "# node config\n")?;
        Ok(path)
    }

    /// Substring unique to processes started from this node.
    pub fn marker(&self) -> String {
        self.dir.path().to_string_lossy().into_owned()
    }

    /// Live processes whose command line carries this node's marker.
    pub fn live_processes(&self) -> Vec<ProcessInfo> {
        let marker = self.marker();
        SystemProcessTable::new()
            .snapshot()
            .into_iter()
            .filter(|p| p.cmdline.contains(&marker))
            .collect()
    }
}

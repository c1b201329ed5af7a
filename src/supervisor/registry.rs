// src/supervisor/registry.rs

//! Process registry - records launched processes so a later `stop` can
//! terminate them precisely instead of by name.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::Result;

/// A process launched by `procset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub name: String,
    pub pid: u32,
    pub executable: PathBuf,
    pub config: PathBuf,
    /// OS start time at launch; guards against signalling a recycled pid.
    pub start_time: Option<u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryData {
    processes: Vec<ProcessRecord>,
}

/// JSON-backed registry of launched processes.
#[derive(Debug)]
pub struct ProcessRegistry {
    data: RegistryData,
    path: PathBuf,
}

impl ProcessRegistry {
    /// Load the registry at `path`. A missing file is an empty registry; a
    /// corrupted one is reported and reset.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let data = if path.exists() {
            let content = fs::read_to_string(&path)?;
            match serde_json::from_str(&content) {
                Ok(d) => d,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "corrupted state file, resetting");
                    RegistryData::default()
                }
            }
        } else {
            RegistryData::default()
        };

        Ok(Self { data, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the registry back. An empty registry removes the file.
    pub fn save(&self) -> Result<()> {
        if self.data.processes.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path)?;
            }
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    /// Record a launched process, replacing any entry with the same pid.
    pub fn register(&mut self, record: ProcessRecord) -> Result<()> {
        self.data.processes.retain(|p| p.pid != record.pid);
        self.data.processes.push(record);
        self.save()
    }

    pub fn unregister_all(&mut self, pids: &[u32]) -> Result<()> {
        let before = self.data.processes.len();
        self.data.processes.retain(|p| !pids.contains(&p.pid));
        if self.data.processes.len() != before {
            self.save()?;
        }
        Ok(())
    }

    pub fn records(&self) -> &[ProcessRecord] {
        &self.data.processes
    }

    pub fn find_by_pid(&self, pid: u32) -> Option<&ProcessRecord> {
        self.data.processes.iter().find(|p| p.pid == pid)
    }
}

// src/supervisor/launcher.rs

//! Spawning of a single launch entry.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use tokio::process::{Child, Command};
use tracing::info;

use crate::types::LaunchSpec;

/// A freshly spawned child.
pub struct Spawned {
    pub pid: u32,
    pub child: Child,
    pub spawned_at: Instant,
    /// Length of the log file before the spawn; readiness markers are only
    /// searched for after this offset.
    pub log_offset: u64,
}

/// Spawn `<executable> -c <config>` detached from the supervisor.
///
/// - stdin is null, stdout/stderr are appended to the log file or dropped.
/// - The child gets its own process group, so a Ctrl-C aimed at the
///   supervisor's terminal does not reach it.
/// - The child is not killed when its handle is dropped; it outlives the
///   supervisor.
pub fn spawn_detached(spec: &LaunchSpec) -> Result<Spawned> {
    info!(
        name = %spec.name,
        executable = %spec.executable.display(),
        config = %spec.config.display(),
        "spawning process"
    );

    let mut cmd = Command::new(&spec.executable);
    cmd.args(spec.args())
        .stdin(Stdio::null())
        .kill_on_drop(false);

    let mut log_offset = 0;
    match &spec.log_file {
        Some(path) => {
            let (stdout, stderr, offset) = open_log(path)
                .with_context(|| format!("opening log file {:?} for '{}'", path, spec.name))?;
            cmd.stdout(stdout).stderr(stderr);
            log_offset = offset;
        }
        None => {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
    }

    #[cfg(unix)]
    {
        cmd.process_group(0);
    }

    let child = cmd
        .spawn()
        .with_context(|| format!("spawning {:?} for '{}'", spec.executable, spec.name))?;
    let spawned_at = Instant::now();

    let pid = child
        .id()
        .ok_or_else(|| anyhow!("process for '{}' exited before its pid was read", spec.name))?;

    info!(name = %spec.name, pid, "process spawned");

    Ok(Spawned {
        pid,
        child,
        spawned_at,
        log_offset,
    })
}

fn open_log(path: &Path) -> Result<(Stdio, Stdio, u64)> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
        }
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let offset = file.metadata()?.len();
    let stderr = file.try_clone()?;

    Ok((Stdio::from(file), Stdio::from(stderr), offset))
}

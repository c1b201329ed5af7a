// src/supervisor/readiness.rs

//! Readiness barriers applied after each spawn.
//!
//! Every probe also watches the child: a process that exits before it is
//! considered ready is reported as `NotReadyReason::Exited`.

use std::path::Path;
use std::time::Duration;

use regex::Regex;
use tokio::net::TcpStream;
use tokio::process::Child;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, trace};

use crate::supervisor::launcher::Spawned;
use crate::supervisor::report::NotReadyReason;
use crate::types::{LaunchSpec, Readiness};

/// Wait until the spawned process is ready according to `spec.readiness`.
///
/// Returns how long the barrier took.
pub async fn wait_ready(spec: &LaunchSpec, spawned: &mut Spawned) -> Result<Duration, NotReadyReason> {
    debug!(
        name = %spec.name,
        pid = spawned.pid,
        kind = spec.readiness.kind(),
        "waiting for readiness"
    );

    match &spec.readiness {
        Readiness::Delay(delay) => {
            let started = Instant::now();
            // The whole delay always elapses, even if the child dies early.
            sleep(*delay).await;
            check_exited(&mut spawned.child)?;
            Ok(started.elapsed())
        }
        Readiness::Tcp {
            address,
            timeout,
            interval,
        } => poll_tcp(&mut spawned.child, address, *timeout, *interval).await,
        Readiness::LogMarker {
            pattern,
            timeout,
            interval,
        } => {
            let path = spec.log_file.as_deref().ok_or_else(|| {
                NotReadyReason::Probe(format!("launch '{}' has no log file to watch", spec.name))
            })?;
            poll_log(
                &mut spawned.child,
                path,
                spawned.log_offset,
                pattern,
                *timeout,
                *interval,
            )
            .await
        }
    }
}

/// `start + limit`, saturating to a far-future instant for limits too large
/// to represent.
pub(crate) fn deadline_after(start: Instant, limit: Duration) -> Instant {
    start
        .checked_add(limit)
        .unwrap_or_else(|| start + Duration::from_secs(86_400 * 365 * 30))
}

fn check_exited(child: &mut Child) -> Result<(), NotReadyReason> {
    match child.try_wait() {
        Ok(Some(status)) => Err(NotReadyReason::Exited(status.code())),
        Ok(None) => Ok(()),
        Err(e) => Err(NotReadyReason::Probe(format!("checking process status: {e}"))),
    }
}

async fn poll_tcp(
    child: &mut Child,
    address: &str,
    limit: Duration,
    interval: Duration,
) -> Result<Duration, NotReadyReason> {
    let started = Instant::now();
    let deadline = deadline_after(started, limit);

    loop {
        check_exited(child)?;

        match timeout(interval, TcpStream::connect(address)).await {
            Ok(Ok(_stream)) => return Ok(started.elapsed()),
            Ok(Err(e)) => trace!(address, error = %e, "tcp probe not accepted yet"),
            Err(_) => trace!(address, "tcp probe connect timed out"),
        }

        if Instant::now() >= deadline {
            return Err(NotReadyReason::TimedOut(limit));
        }
        sleep(interval).await;
    }
}

async fn poll_log(
    child: &mut Child,
    path: &Path,
    offset: u64,
    pattern: &Regex,
    limit: Duration,
    interval: Duration,
) -> Result<Duration, NotReadyReason> {
    let started = Instant::now();
    let deadline = deadline_after(started, limit);

    loop {
        check_exited(child)?;

        match tokio::fs::read(path).await {
            Ok(bytes) => {
                if marker_present(&bytes, offset, pattern) {
                    return Ok(started.elapsed());
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                trace!(path = %path.display(), "log file not created yet");
            }
            Err(e) => {
                return Err(NotReadyReason::Probe(format!(
                    "reading {}: {e}",
                    path.display()
                )))
            }
        }

        if Instant::now() >= deadline {
            return Err(NotReadyReason::TimedOut(limit));
        }
        sleep(interval).await;
    }
}

/// Search lines written after `offset`. A file truncated below `offset` is
/// searched from the start.
fn marker_present(bytes: &[u8], offset: u64, pattern: &Regex) -> bool {
    let start = usize::try_from(offset)
        .ok()
        .filter(|&o| o <= bytes.len())
        .unwrap_or(0);
    String::from_utf8_lossy(&bytes[start..])
        .lines()
        .any(|line| pattern.is_match(line))
}

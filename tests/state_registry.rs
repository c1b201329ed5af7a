// tests/state_registry.rs
mod common;
use crate::common::builders::{ConfigFileBuilder, LaunchConfigBuilder};
use crate::common::{init_tracing, FakeProcessTable};

use std::error::Error;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use procset::supervisor::{
    ProcessRecord, ProcessRegistry, StopOutcome, Supervisor, TargetSource,
};

type TestResult = Result<(), Box<dyn Error>>;

fn record(name: &str, pid: u32, start_time: Option<u64>) -> ProcessRecord {
    ProcessRecord {
        name: name.to_string(),
        pid,
        executable: PathBuf::from("./target/release/databend-query"),
        config: PathBuf::from(format!("{name}.toml")),
        start_time,
    }
}

fn seed_registry(path: &Path, records: Vec<ProcessRecord>) -> TestResult {
    let mut registry = ProcessRegistry::load(path)?;
    for r in records {
        registry.register(r)?;
    }
    Ok(())
}

#[test]
fn missing_state_file_is_an_empty_registry() -> TestResult {
    let dir = TempDir::new()?;
    let registry = ProcessRegistry::load(dir.path().join("state.json"))?;
    assert!(registry.records().is_empty());
    Ok(())
}

#[test]
fn registered_processes_survive_a_reload() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("nested").join("state.json");

    seed_registry(
        &path,
        vec![
            record("query-1", 101, Some(10)),
            record("query-3", 103, Some(11)),
            record("query-1-again", 101, Some(12)),
        ],
    )?;
    assert!(path.exists(), "parent directories are created on save");

    let reloaded = ProcessRegistry::load(&path)?;
    let pids: Vec<u32> = reloaded.records().iter().map(|r| r.pid).collect();
    assert_eq!(pids, vec![103, 101], "a reused pid replaces the older record");
    assert_eq!(
        reloaded.find_by_pid(101).map(|r| r.name.as_str()),
        Some("query-1-again")
    );
    assert!(reloaded.find_by_pid(999).is_none());
    Ok(())
}

#[test]
fn corrupted_state_file_is_reset() -> TestResult {
    init_tracing();

    let dir = TempDir::new()?;
    let path = dir.path().join("state.json");
    std::fs::write(&path, "{ this is not json")?;

    let registry = ProcessRegistry::load(&path)?;
    assert!(registry.records().is_empty());
    Ok(())
}

#[test]
fn unregistering_everything_removes_the_file() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("state.json");
    seed_registry(&path, vec![record("a", 1, None), record("b", 2, None)])?;

    let mut registry = ProcessRegistry::load(&path)?;
    registry.unregister_all(&[1])?;
    assert!(path.exists());
    registry.unregister_all(&[2, 3])?;
    assert!(!path.exists());
    Ok(())
}

fn recorded_only_config(state_file: &Path) -> procset::config::ConfigFile {
    ConfigFileBuilder::new()
        .with_launch(LaunchConfigBuilder::new("bin/databend-query", "node-1.toml").build())
        .state_file(state_file)
        .match_patterns(&[])
        .poll_interval("10ms")
        .build()
}

#[tokio::test]
async fn recorded_process_with_matching_start_time_is_signalled() -> TestResult {
    init_tracing();

    let dir = TempDir::new()?;
    let path = dir.path().join("state.json");
    seed_registry(&path, vec![record("query-1", 4100, Some(1_000))])?;

    let table = FakeProcessTable::new().with_process_started(4100, "databend-query -c node-1.toml", 1_000);
    let mut sup = Supervisor::with_process_table(recorded_only_config(&path), table.clone());

    let report = sup.stop().await;

    assert_eq!(report.pids_from(TargetSource::Recorded), vec![4100]);
    assert_eq!(report.outcome_of(4100), Some(&StopOutcome::Signalled));
    assert!(!path.exists(), "stopped processes are dropped from the state file");
    Ok(())
}

/// The recorded pid now belongs to an unrelated process started later.
#[tokio::test]
async fn recycled_pid_is_not_signalled() -> TestResult {
    init_tracing();

    let dir = TempDir::new()?;
    let path = dir.path().join("state.json");
    seed_registry(&path, vec![record("query-1", 4200, Some(1_000))])?;

    let table = FakeProcessTable::new().with_process_started(4200, "/usr/bin/unrelated --daemon", 9_999);
    let mut sup = Supervisor::with_process_table(recorded_only_config(&path), table.clone());

    let report = sup.stop().await;

    assert!(report.is_empty());
    assert!(table.signals().is_empty());
    assert_eq!(table.alive_pids(), vec![4200]);
    assert!(!path.exists(), "the stale record is forgotten");
    Ok(())
}

#[tokio::test]
async fn record_without_start_time_is_not_trusted() -> TestResult {
    init_tracing();

    let dir = TempDir::new()?;
    let path = dir.path().join("state.json");
    seed_registry(&path, vec![record("query-1", 4300, None)])?;

    let table = FakeProcessTable::new().with_process(4300, "databend-query -c node-1.toml");
    let mut sup = Supervisor::with_process_table(recorded_only_config(&path), table.clone());

    let report = sup.stop().await;

    assert!(report.is_empty());
    assert!(table.signals().is_empty());
    Ok(())
}

#[tokio::test]
async fn recorded_process_that_is_gone_is_reported_as_exited() -> TestResult {
    init_tracing();

    let dir = TempDir::new()?;
    let path = dir.path().join("state.json");
    seed_registry(&path, vec![record("query-2", 4400, Some(1_000))])?;

    let table = FakeProcessTable::new();
    let mut sup = Supervisor::with_process_table(recorded_only_config(&path), table.clone());

    let report = sup.stop().await;

    assert_eq!(report.outcome_of(4400), Some(&StopOutcome::AlreadyExited));
    assert!(!report.has_failures());
    assert!(!path.exists());
    Ok(())
}

/// A later invocation stops what an earlier one started, using only the
/// state file (discovery is disabled).
#[cfg(unix)]
#[tokio::test]
async fn second_invocation_stops_processes_recorded_by_the_first() -> TestResult {
    use crate::common::{with_timeout, FakeNode};

    init_tracing();

    let node = FakeNode::long_running()?;
    let state = node.dir().join("state").join("procset.json");

    let build = || -> Result<procset::config::ConfigFile, Box<dyn Error>> {
        Ok(ConfigFileBuilder::new()
            .launch_delay("50ms")
            .poll_interval("20ms")
            .grace_period("5s")
            .state_file(&state)
            .match_patterns(&[])
            .with_launch(LaunchConfigBuilder::new(node.executable(), node.config("cfg1.toml")?).build())
            .with_launch(LaunchConfigBuilder::new(node.executable(), node.config("cfg2.toml")?).build())
            .build())
    };

    let mut first = Supervisor::new(build()?);
    let started = with_timeout(first.start()).await;
    assert!(!started.has_failures());
    assert!(state.exists());
    assert_eq!(ProcessRegistry::load(&state)?.records().len(), 2);
    drop(first);

    let mut second = Supervisor::new(build()?);
    let stopped = with_timeout(second.stop()).await;

    let mut recorded = stopped.pids_from(TargetSource::Recorded);
    recorded.sort();
    let mut launched = started.pids();
    launched.sort();
    assert_eq!(recorded, launched);
    assert!(stopped
        .entries
        .iter()
        .all(|e| e.outcome == StopOutcome::Terminated));
    assert!(node.live_processes().is_empty());
    assert!(!state.exists());
    Ok(())
}

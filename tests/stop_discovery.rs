// tests/stop_discovery.rs
mod common;
use crate::common::builders::{ConfigFileBuilder, LaunchConfigBuilder};
use crate::common::{init_tracing, FakeProcessTable};

use procset::config::ConfigFile;
use procset::supervisor::{StopOutcome, Supervisor, TargetSource};
use procset::types::StopSignal;

fn config_matching(patterns: &[&str]) -> ConfigFileBuilder {
    ConfigFileBuilder::new()
        .with_launch(LaunchConfigBuilder::new("bin/databend-query", "node-1.toml").build())
        .match_patterns(patterns)
        .poll_interval("10ms")
}

fn supervisor(cfg: ConfigFile, table: &FakeProcessTable) -> Supervisor<FakeProcessTable> {
    Supervisor::with_process_table(cfg, table.clone())
}

#[tokio::test]
async fn stop_with_no_matching_process_is_a_silent_no_op() {
    init_tracing();

    let table = FakeProcessTable::new()
        .with_process(100, "/usr/sbin/sshd -D")
        .with_process(101, "/bin/bash --login");
    let mut sup = supervisor(config_matching(&["databend-query", "databend-meta"]).build(), &table);

    let report = sup.stop().await;

    assert!(report.is_empty());
    assert!(!report.has_failures());
    assert!(table.signals().is_empty(), "nothing may be signalled");
    assert_eq!(table.alive_pids(), vec![100, 101]);

    // A second stop is just as quiet.
    let again = sup.stop().await;
    assert!(again.is_empty());
}

#[tokio::test]
async fn stop_signals_every_process_matching_either_substring() {
    init_tracing();

    let table = FakeProcessTable::new()
        .with_process(200, "./target/release/databend-query -c node-1.toml")
        .with_process(201, "./target/release/databend-meta -c meta.toml")
        .with_process(202, "./target/release/databend-query -c node-2.toml")
        .with_process(203, "/usr/bin/postgres -D /var/lib/pg");
    let mut sup = supervisor(config_matching(&["databend-query", "databend-meta"]).build(), &table);

    let report = sup.stop().await;

    let mut signalled = table.signalled_pids();
    signalled.sort();
    assert_eq!(signalled, vec![200, 201, 202]);
    assert!(table.signals().iter().all(|(_, s)| *s == StopSignal::Term));
    assert_eq!(table.alive_pids(), vec![203]);

    assert_eq!(report.entries.len(), 3);
    for entry in &report.entries {
        assert_eq!(entry.source, TargetSource::Discovered);
        assert_eq!(
            entry.outcome,
            StopOutcome::Signalled,
            "without a grace period exits are not confirmed"
        );
    }
}

/// Substring matching is loose on purpose: a decoy whose command line merely
/// mentions the binary name is terminated too.
#[tokio::test]
async fn decoy_mentioning_the_substring_is_terminated_too() {
    init_tracing();

    let table = FakeProcessTable::new()
        .with_process(300, "./target/release/databend-query -c node-1.toml")
        .with_process(301, "tail -f /var/log/databend-query.log")
        .with_process(302, "vim notes-about-databend-meta.md");
    let mut sup = supervisor(config_matching(&["databend-query", "databend-meta"]).build(), &table);

    let report = sup.stop().await;

    assert_eq!(report.outcome_of(301), Some(&StopOutcome::Signalled));
    assert_eq!(report.outcome_of(302), Some(&StopOutcome::Signalled));
    assert!(table.alive_pids().is_empty(), "decoys are killed along with the target");
}

#[tokio::test]
async fn own_process_is_never_signalled() {
    init_tracing();

    let own = std::process::id();
    let table = FakeProcessTable::new()
        .with_process(own, "procset stop --config databend-query.toml")
        .with_process(400, "databend-query -c node-1.toml");
    let mut sup = supervisor(config_matching(&["databend-query"]).build(), &table);

    let report = sup.stop().await;

    assert_eq!(table.signalled_pids(), vec![400]);
    assert!(report.outcome_of(own).is_none());
}

#[tokio::test]
async fn name_is_matched_when_command_line_is_unreadable() {
    init_tracing();

    let table = FakeProcessTable::new()
        .with_named_process(500, "postgres")
        .with_named_process(501, "databend-meta");
    let mut sup = supervisor(config_matching(&["databend-meta"]).build(), &table);

    let report = sup.stop().await;

    assert_eq!(report.pids_from(TargetSource::Discovered), vec![501]);
}

#[tokio::test]
async fn permission_denied_is_reported_not_swallowed() {
    init_tracing();

    let table = FakeProcessTable::new()
        .with_process(600, "databend-query -c node-1.toml")
        .with_process(601, "databend-query -c node-2.toml")
        .deny(601);
    let mut sup = supervisor(config_matching(&["databend-query"]).build(), &table);

    let report = sup.stop().await;

    assert_eq!(report.outcome_of(600), Some(&StopOutcome::Signalled));
    assert_eq!(report.outcome_of(601), Some(&StopOutcome::PermissionDenied));
    assert!(report.has_failures());
}

#[tokio::test]
async fn grace_period_confirms_exit_and_reports_survivors() {
    init_tracing();

    let table = FakeProcessTable::new()
        .with_process(700, "databend-query -c node-1.toml")
        .with_process(701, "databend-query -c node-2.toml")
        .stubborn(701);
    let cfg = config_matching(&["databend-query"])
        .grace_period("100ms")
        .build();
    let mut sup = supervisor(cfg, &table);

    let report = sup.stop().await;

    assert_eq!(report.outcome_of(700), Some(&StopOutcome::Terminated));
    assert_eq!(report.outcome_of(701), Some(&StopOutcome::StillRunning));
    assert!(report.has_failures());
    assert_eq!(table.alive_pids(), vec![701]);
}

#[tokio::test]
async fn force_escalates_survivors_to_sigkill() {
    init_tracing();

    let table = FakeProcessTable::new()
        .with_process(800, "databend-query -c node-1.toml")
        .stubborn(800);
    let cfg = config_matching(&["databend-query"])
        .grace_period("50ms")
        .force(true)
        .build();
    let mut sup = supervisor(cfg, &table);

    let report = sup.stop().await;

    assert_eq!(report.outcome_of(800), Some(&StopOutcome::Killed));
    assert_eq!(
        table.signals(),
        vec![(800, StopSignal::Term), (800, StopSignal::Kill)]
    );
    assert!(!report.has_failures());
    assert!(table.alive_pids().is_empty());
}

#[tokio::test]
async fn configured_signal_is_used() {
    init_tracing();

    let table = FakeProcessTable::new().with_process(900, "databend-query -c node-1.toml");
    let cfg = config_matching(&["databend-query"]).signal("SIGINT").build();
    let mut sup = supervisor(cfg, &table);

    sup.stop().await;

    assert_eq!(table.signals(), vec![(900, StopSignal::Int)]);
}

#[tokio::test]
async fn empty_match_list_disables_discovery() {
    init_tracing();

    let table = FakeProcessTable::new().with_process(1000, "databend-query -c node-1.toml");
    let mut sup = supervisor(config_matching(&[]).build(), &table);

    let report = sup.stop().await;

    assert!(report.is_empty());
    assert!(table.signals().is_empty());
}

/// A grace period too large to add to the clock still confirms exits.
#[tokio::test]
async fn huge_grace_period_does_not_overflow_the_deadline() {
    init_tracing();

    let table = FakeProcessTable::new().with_process(1100, "databend-query -c node-1.toml");
    let cfg = config_matching(&["databend-query"])
        .grace_period("18446744073709551615s")
        .build();
    let mut sup = supervisor(cfg, &table);

    let report = sup.stop().await;

    assert_eq!(report.outcome_of(1100), Some(&StopOutcome::Terminated));
    assert!(table.alive_pids().is_empty());
}

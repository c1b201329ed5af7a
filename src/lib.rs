// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod supervisor;
pub mod types;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::model::ConfigFile;
use crate::config::resolve_config;
use crate::supervisor::{StartReport, StopReport, Supervisor};
use crate::types::{Action, Readiness};

/// What a single invocation did.
#[derive(Debug)]
pub enum RunSummary {
    /// No recognised mode; nothing was touched.
    Idle,
    /// `--dry-run`: the plan was printed.
    DryRun,
    Started(StartReport),
    Stopped(StopReport),
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        match self {
            RunSummary::Idle | RunSummary::DryRun => false,
            RunSummary::Started(report) => report.has_failures(),
            RunSummary::Stopped(report) => report.has_failures(),
        }
    }
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - mode selection (unknown modes return before any config is read)
/// - config resolution
/// - the supervisor's `start` / `stop`
pub async fn run(args: CliArgs) -> Result<RunSummary> {
    let Some(action) = args.mode.as_deref().and_then(Action::parse) else {
        debug!(mode = ?args.mode, "no recognised mode; nothing to do");
        return Ok(RunSummary::Idle);
    };

    let cfg = resolve_config(args.config.as_deref())?;

    if args.dry_run {
        print_dry_run(action, &cfg);
        return Ok(RunSummary::DryRun);
    }

    info!(%action, launches = cfg.launch.len(), "procset running");

    let mut supervisor = Supervisor::new(cfg);
    let summary = match action {
        Action::Start => RunSummary::Started(supervisor.start().await),
        Action::Stop => RunSummary::Stopped(supervisor.stop().await),
    };
    Ok(summary)
}

/// Simple dry-run output: print launches, readiness barriers and stop settings.
fn print_dry_run(action: Action, cfg: &ConfigFile) {
    println!("procset dry-run ({action})");
    println!(
        "  supervisor.abort_on_failure = {}",
        cfg.supervisor.abort_on_failure
    );
    if let Some(ref path) = cfg.supervisor.state_file {
        println!("  supervisor.state_file = {}", path.display());
    }
    println!();

    println!("launch ({}):", cfg.launch.len());
    for spec in cfg.launch.iter() {
        println!("  - {}", spec.name);
        println!(
            "      cmd: {} -c {}",
            spec.executable.display(),
            spec.config.display()
        );
        if let Some(ref log) = spec.log_file {
            println!("      log_file: {}", log.display());
        }
        match &spec.readiness {
            Readiness::Delay(d) => println!("      ready: delay {d:?}"),
            Readiness::Tcp {
                address, timeout, ..
            } => println!("      ready: tcp {address} (timeout {timeout:?})"),
            Readiness::LogMarker {
                pattern, timeout, ..
            } => println!("      ready: log_marker /{pattern}/ (timeout {timeout:?})"),
        }
    }
    println!();

    println!("stop:");
    println!("  signal: {}", cfg.stop.signal);
    if cfg.stop.patterns.is_empty() {
        println!("  match: (discovery disabled)");
    } else {
        println!("  match: {:?}", cfg.stop.patterns);
    }
    if let Some(grace) = cfg.stop.grace_period {
        println!("  grace_period: {grace:?}");
        if cfg.stop.force {
            println!("  force: true");
        }
    }

    debug!("dry-run complete (no process touched)");
}

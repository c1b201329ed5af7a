// src/logging.rs

//! Logging for `procset`: a `tracing` fmt subscriber on stderr.
//!
//! The filter directive comes from, in order:
//! 1. `--log-level`, applied to procset's own targets (other crates stay at
//!    `warn`);
//! 2. `PROCSET_LOG`, taken as a full `EnvFilter` directive, so
//!    `procset::supervisor=trace` works as well as plain `debug`;
//! 3. [`DEFAULT_DIRECTIVE`].
//!
//! stdout is left to the `--dry-run` plan.

use anyhow::{anyhow, Result};
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "PROCSET_LOG";
pub const DEFAULT_DIRECTIVE: &str = "procset=info,warn";

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let directive = log_directive(cli_level, env.as_deref());

    let (filter, rejected) = match EnvFilter::try_new(&directive) {
        Ok(filter) => (filter, None),
        Err(e) => (EnvFilter::new(DEFAULT_DIRECTIVE), Some(e)),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("installing log subscriber: {e}"))?;

    if let Some(e) = rejected {
        warn!(env = LOG_ENV, %directive, error = %e, "ignoring unparsable log filter");
    }
    Ok(())
}

/// The filter directive for a CLI level and the raw `PROCSET_LOG` value.
pub fn log_directive(cli_level: Option<LogLevel>, env: Option<&str>) -> String {
    match (cli_level, env.map(str::trim)) {
        (Some(level), _) => format!("procset={},warn", level.as_str()),
        (None, Some(env)) if !env.is_empty() => env.to_string(),
        _ => DEFAULT_DIRECTIVE.to_string(),
    }
}

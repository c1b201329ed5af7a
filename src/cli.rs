// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! The mode is a free-form positional string rather than a subcommand: an
//! unknown mode must be a silent no-op, not a usage error.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `procset`.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "procset",
    version,
    about = "Start and stop a fixed, ordered set of server processes.",
    long_about = None
)]
pub struct CliArgs {
    /// `start` or `stop`. Anything else does nothing.
    #[arg(value_name = "MODE")]
    pub mode: Option<String>,

    /// Path to the config file (TOML).
    ///
    /// If omitted, `Procset.toml` in the current working directory is used
    /// when it exists, otherwise the built-in layout.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PROCSET_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the launch plan, but don't touch any process.
    #[arg(long)]
    pub dry_run: bool,

    /// Exit with status 2 when any launch or stop outcome is a failure.
    #[arg(long)]
    pub strict: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

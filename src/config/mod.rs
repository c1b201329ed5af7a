// src/config/mod.rs

//! Configuration loading and validation for procset.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk, or fall back to the built-in layout
//!   (`loader.rs`).
//! - Turn the raw model into typed launch specs and stop settings
//!   (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, resolve_config};
pub use model::{
    ConfigFile, LaunchConfig, RawConfigFile, ReadyConfig, StopSection, StopSettings,
    SupervisorSection, SupervisorSettings,
};

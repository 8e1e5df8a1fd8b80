// src/config/mod.rs

//! Configuration loading and validation for probekit.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Parse durations and check retry/process invariants (`validate.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{
    ClusterSection, ConfigFile, ProcessSettings, RawConfigFile, RawProcessSection,
    RawWaitSection, WaitSettings,
};

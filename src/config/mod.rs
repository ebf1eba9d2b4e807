// src/config/mod.rs

//! Configuration loading and validation for taskforge.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate basic invariants like tool names and scan globs (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{
    ConfigFile, InstallSection, LegalSection, ProjectSection, ScanSection, ToolsSection,
};
pub use validate::validate_config;

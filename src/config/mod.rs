// src/config/mod.rs

//! Configuration loading and validation for assetpipe.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk, falling back to defaults (`loader.rs`).
//! - Validate path safety, globs and numeric ranges (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{
    AssetPath, ConfigFile, HtmlSection, ImagesSection, PathsSection, RawConfigFile,
    ServerSection, WatchSection,
};
pub use validate::validate_config;

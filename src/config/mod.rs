//! Configuration loading and management for the Markup Engine.
//!
//! This module provides functionality to load engine configurations from YAML files,
//! including metadata, default tender parameters, pricing distribution rules and
//! markup tactics.
//!
//! # Example
//!
//! ```no_run
//! use markup_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/default").unwrap();
//! println!("Loaded configuration: {}", config.engine().name);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{EngineConfig, EngineMetadata, EngineSettings, RoundingConfig};

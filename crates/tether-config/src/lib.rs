//! Tether configuration system.
//!
//! TOML-based configuration for the bridge and the demo shell. Every section
//! uses serde defaults, so a partial (or empty) file is a valid config.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tether_config::load_config;
//!
//! let config = load_config().expect("failed to load config");
//! println!("delivery: {:?}", config.delivery.mode);
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    DeliveryConfig, DeliveryMode, EngineConfig, LocaleConfig, LogLevel, LoggingConfig,
    TetherConfig, UiConfig,
};

use tether_common::ConfigError;

/// Load config from the platform default path, creating a default file if
/// none exists, and validate the result.
pub fn load_config() -> Result<TetherConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config)?;
    Ok(config)
}

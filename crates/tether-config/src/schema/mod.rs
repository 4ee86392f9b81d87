//! Configuration schema types for Tether.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod bridge;
mod engine;
mod system;

pub use bridge::*;
pub use engine::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TetherConfig {
    pub delivery: DeliveryConfig,
    pub ui: UiConfig,
    pub engine: EngineConfig,
    pub locale: LocaleConfig,
    pub logging: LoggingConfig,
}

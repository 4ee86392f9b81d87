//! Engine configuration for the built-in loopback engine.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker threads in the engine pool (valid range: 1-64).
    pub worker_threads: u32,
    pub testnet: bool,
    /// How long shutdown waits for in-flight engine work (valid range: 0-30000).
    pub stop_timeout_ms: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: 4,
            testnet: false,
            stop_timeout_ms: 2000,
        }
    }
}

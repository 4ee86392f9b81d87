//! Bridge configuration: response delivery and UI marshaling.

use serde::{Deserialize, Serialize};

/// Where resolved query interests run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// On the engine thread that delivered the response.
    #[default]
    Inline,
    /// On a dedicated delivery thread owned by the bridge.
    Thread,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub mode: DeliveryMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Log a warning when this many marshaled tasks are waiting for the UI
    /// thread (valid range: 1-65536).
    pub queue_warn_depth: u32,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            queue_warn_depth: 64,
        }
    }
}

use std::path::PathBuf;

use crate::id::QueryId;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Errors surfaced to callers of the bridge.
///
/// Protocol violations (unknown or already-resolved response ids) never show
/// up here: they are logged and dropped where they are detected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    #[error("bridge is closed")]
    Closed,

    #[error("query id {0} is already pending")]
    IdCollision(QueryId),

    #[error("engine is already serving; shut down first")]
    AlreadyServing,

    #[error("engine is not serving")]
    NotServing,

    #[error("ui loop is no longer running")]
    UiLoopClosed,

    #[error("invalid utf-8 in cross-boundary buffer: {0}")]
    InvalidUtf8(String),

    #[error("string contains an interior nul byte")]
    NulByte,

    #[error("engine error: {0}")]
    Engine(String),

    #[error("shell error: {0}")]
    Shell(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TetherError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

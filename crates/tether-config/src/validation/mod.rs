//! Configuration validation.
//!
//! Collects every range violation into a single `ConfigError` so the user
//! sees all problems at once.


use crate::schema::TetherConfig;
use tether_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &TetherConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_range(
        &mut errors,
        "ui.queue_warn_depth",
        config.ui.queue_warn_depth,
        1,
        65_536,
    );
    validate_range(
        &mut errors,
        "engine.worker_threads",
        config.engine.worker_threads,
        1,
        64,
    );
    validate_range(
        &mut errors,
        "engine.stop_timeout_ms",
        config.engine.stop_timeout_ms,
        0,
        30_000,
    );

    if let Some(locale) = &config.locale.preferred {
        if locale.trim().is_empty() || locale.contains('\0') {
            errors.push(format!("locale.preferred = {locale:?} is not a language tag"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

/// Push an error if `value` is outside `[min, max]`.
fn validate_range(errors: &mut Vec<String>, name: &str, value: u32, min: u32, max: u32) {
    if value < min || value > max {
        errors.push(format!("{name} = {value} is out of range [{min}, {max}]"));
    }
}

//! Configuration validation logic.

use crate::errors::ConfigError;
use crate::types::DeckConfig;

/// Upper bound for `[polling] min_request_interval_ms`.
pub const MAX_MIN_REQUEST_INTERVAL_MS: u64 = 60_000;

/// Validate a DeckConfig, returning an error if any values are invalid.
///
/// # Validation Rules
///
/// - Every polling interval, if set, must be greater than zero
/// - `min_request_interval_ms`, if set, must not exceed [`MAX_MIN_REQUEST_INTERVAL_MS`]
pub fn validate_config(config: &DeckConfig) -> Result<(), ConfigError> {
    let polling = &config.polling;
    let intervals = [
        ("list_interval_ms", polling.list_interval_ms),
        ("status_interval_ms", polling.status_interval_ms),
        ("metrics_interval_ms", polling.metrics_interval_ms),
        ("alerts_interval_ms", polling.alerts_interval_ms),
        ("min_request_interval_ms", polling.min_request_interval_ms),
    ];
    for (name, value) in intervals {
        if value == Some(0) {
            return Err(ConfigError::InvalidConfiguration {
                message: format!("[polling] {} must be greater than 0", name),
            });
        }
    }

    if let Some(min) = polling.min_request_interval_ms
        && min > MAX_MIN_REQUEST_INTERVAL_MS
    {
        return Err(ConfigError::InvalidConfiguration {
            message: format!(
                "[polling] min_request_interval_ms must be at most {} (got {})",
                MAX_MIN_REQUEST_INTERVAL_MS, min
            ),
        });
    }

    Ok(())
}

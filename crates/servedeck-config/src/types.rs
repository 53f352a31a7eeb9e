//! Configuration types.
//!
//! Every field is optional so that a partial file only overrides what it sets.
//! Accessors apply the built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_LIST_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_STATUS_INTERVAL_MS: u64 = 3_000;
pub const DEFAULT_METRICS_INTERVAL_MS: u64 = 10_000;
pub const DEFAULT_ALERTS_INTERVAL_MS: u64 = 15_000;
pub const DEFAULT_MIN_REQUEST_INTERVAL_MS: u64 = 1_000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckConfig {
    pub backend: BackendConfig,
    pub polling: PollingConfig,
    pub confirm: ConfirmConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Override for the backend Unix socket. Defaults to `~/.servedeck/backend.sock`.
    pub socket_path: Option<PathBuf>,
}

/// `[polling]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub list_interval_ms: Option<u64>,
    pub status_interval_ms: Option<u64>,
    pub metrics_interval_ms: Option<u64>,
    pub alerts_interval_ms: Option<u64>,
    pub min_request_interval_ms: Option<u64>,
    /// Skip ticks while the host reports itself hidden.
    pub skip_when_hidden: Option<bool>,
}

impl PollingConfig {
    pub fn list_interval(&self) -> Duration {
        Duration::from_millis(self.list_interval_ms.unwrap_or(DEFAULT_LIST_INTERVAL_MS))
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms.unwrap_or(DEFAULT_STATUS_INTERVAL_MS))
    }

    pub fn metrics_interval(&self) -> Duration {
        Duration::from_millis(
            self.metrics_interval_ms
                .unwrap_or(DEFAULT_METRICS_INTERVAL_MS),
        )
    }

    pub fn alerts_interval(&self) -> Duration {
        Duration::from_millis(self.alerts_interval_ms.unwrap_or(DEFAULT_ALERTS_INTERVAL_MS))
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(
            self.min_request_interval_ms
                .unwrap_or(DEFAULT_MIN_REQUEST_INTERVAL_MS),
        )
    }

    pub fn skip_when_hidden(&self) -> bool {
        self.skip_when_hidden.unwrap_or(true)
    }

    /// Merge two polling configs. `other` (override) wins for fields it sets.
    pub fn merge(base: &Self, other: &Self) -> Self {
        Self {
            list_interval_ms: other.list_interval_ms.or(base.list_interval_ms),
            status_interval_ms: other.status_interval_ms.or(base.status_interval_ms),
            metrics_interval_ms: other.metrics_interval_ms.or(base.metrics_interval_ms),
            alerts_interval_ms: other.alerts_interval_ms.or(base.alerts_interval_ms),
            min_request_interval_ms: other
                .min_request_interval_ms
                .or(base.min_request_interval_ms),
            skip_when_hidden: other.skip_when_hidden.or(base.skip_when_hidden),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmConfig {
    /// Prompt before `delete`. Defaults to true.
    pub delete: Option<bool>,
}

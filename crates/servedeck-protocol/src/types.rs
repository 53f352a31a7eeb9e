use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a managed API endpoint as assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiId(String);

impl ApiId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ApiId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ApiId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for ApiId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ApiId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of a managed API.
///
/// Closed set. Unknown strings from newer backends deserialize to `Error`
/// via `#[serde(other)]`, matching [`ApiStatus::from_wire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStatus {
    Running,
    Preparing,
    Stopped,
    #[serde(other)]
    Error,
}

impl ApiStatus {
    /// Strict parse. Returns `None` for anything outside the closed set.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "running" => Some(ApiStatus::Running),
            "preparing" => Some(ApiStatus::Preparing),
            "stopped" => Some(ApiStatus::Stopped),
            "error" => Some(ApiStatus::Error),
            _ => None,
        }
    }

    /// Lenient parse used at the normalization boundary: unknown strings
    /// become `Error`.
    pub fn from_wire(raw: &str) -> Self {
        Self::parse(raw).unwrap_or(ApiStatus::Error)
    }

    /// Whether the backend process for this API is up or coming up.
    pub fn is_active(&self) -> bool {
        matches!(self, ApiStatus::Running | ApiStatus::Preparing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApiStatus::Running => "running",
            ApiStatus::Preparing => "preparing",
            ApiStatus::Stopped => "stopped",
            ApiStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for ApiStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One API as reported by `list_apis`.
///
/// `is_listening` is a liveness probe result and is independent of the
/// persisted `status` (a `running` API may not be accepting connections yet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSnapshot {
    pub id: ApiId,
    pub name: String,
    pub status: ApiStatus,
    #[serde(default)]
    pub is_listening: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Mutating operations that lock an API while in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Start,
    Stop,
    Delete,
}

impl OperationKind {
    /// Backend command that performs this operation.
    pub fn command(&self) -> &'static str {
        match self {
            OperationKind::Start => crate::names::commands::START_API,
            OperationKind::Stop => crate::names::commands::STOP_API,
            OperationKind::Delete => crate::names::commands::DELETE_API,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Start => "start",
            OperationKind::Stop => "stop",
            OperationKind::Delete => "delete",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress payload pushed by the backend while an operation runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub api_id: ApiId,
    pub operation: OperationKind,
    pub step: String,
    /// Percentage in `0.0..=100.0`.
    #[serde(default)]
    pub progress: f64,
}

/// One sample of a time-series metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
}

impl AlertLevel {
    /// Unknown levels are treated as `Warning`.
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "info" => AlertLevel::Info,
            "critical" | "error" => AlertLevel::Critical,
            _ => AlertLevel::Warning,
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertLevel::Info => write!(f, "info"),
            AlertLevel::Warning => write!(f, "warning"),
            AlertLevel::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_id: Option<ApiId>,
    pub level: AlertLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_status_parse_closed_set() {
        assert_eq!(ApiStatus::parse("running"), Some(ApiStatus::Running));
        assert_eq!(ApiStatus::parse("preparing"), Some(ApiStatus::Preparing));
        assert_eq!(ApiStatus::parse("stopped"), Some(ApiStatus::Stopped));
        assert_eq!(ApiStatus::parse("error"), Some(ApiStatus::Error));
        assert_eq!(ApiStatus::parse("paused"), None);
        assert_eq!(ApiStatus::parse(""), None);
        assert_eq!(ApiStatus::parse(" preparing "), None);
        assert_eq!(ApiStatus::parse("STOPPED"), None);
    }

    #[test]
    fn test_api_status_from_wire_defaults_to_error() {
        assert_eq!(ApiStatus::from_wire("paused"), ApiStatus::Error);
        assert_eq!(ApiStatus::from_wire("running"), ApiStatus::Running);
    }

    #[test]
    fn test_api_status_serde_unknown_is_error() {
        let parsed: ApiStatus = serde_json::from_str(r#""hibernating""#).unwrap();
        assert_eq!(parsed, ApiStatus::Error);
        let parsed: ApiStatus = serde_json::from_str(r#""running""#).unwrap();
        assert_eq!(parsed, ApiStatus::Running);
    }

    #[test]
    fn test_api_status_is_active() {
        assert!(ApiStatus::Running.is_active());
        assert!(ApiStatus::Preparing.is_active());
        assert!(!ApiStatus::Stopped.is_active());
        assert!(!ApiStatus::Error.is_active());
    }

    #[test]
    fn test_api_snapshot_optional_fields_omitted() {
        let snapshot = ApiSnapshot {
            id: "llama-7b".into(),
            name: "Llama 7B".to_string(),
            status: ApiStatus::Stopped,
            is_listening: false,
            port: None,
            model: None,
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains(r#""id":"llama-7b""#));
        assert!(json.contains(r#""status":"stopped""#));
        assert!(!json.contains("port"));
        assert!(!json.contains("model"));
    }

    #[test]
    fn test_operation_kind_commands() {
        assert_eq!(OperationKind::Start.command(), "start_api");
        assert_eq!(OperationKind::Stop.command(), "stop_api");
        assert_eq!(OperationKind::Delete.command(), "delete_api");
    }

    #[test]
    fn test_progress_event_wire_format() {
        let json = r#"{"api_id":"a1","operation":"start","step":"loading model","progress":42.5}"#;
        let event: ProgressEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.api_id, ApiId::from("a1"));
        assert_eq!(event.operation, OperationKind::Start);
        assert_eq!(event.step, "loading model");
        assert_eq!(event.progress, 42.5);
    }

    #[test]
    fn test_alert_level_from_wire() {
        assert_eq!(AlertLevel::from_wire("info"), AlertLevel::Info);
        assert_eq!(AlertLevel::from_wire("CRITICAL"), AlertLevel::Critical);
        assert_eq!(AlertLevel::from_wire("error"), AlertLevel::Critical);
        assert_eq!(AlertLevel::from_wire("whatever"), AlertLevel::Warning);
    }
}

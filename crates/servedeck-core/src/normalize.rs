//! Backend payloads to typed views.
//!
//! Malformed entries are filtered out, never turned into errors. Unknown
//! status strings become [`ApiStatus::Error`] and are logged.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use servedeck_protocol::{AlertLevel, AlertRecord, ApiId, ApiSnapshot, ApiStatus, MetricPoint};
use tracing::warn;

/// Current status of one API as returned by `get_api_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApiStatusView {
    pub status: ApiStatus,
    pub is_listening: bool,
}

/// Metric name to samples, oldest first.
pub type MetricSeries = BTreeMap<String, Vec<MetricPoint>>;

/// Closed-set status normalization. Anything unrecognized is `Error`.
pub fn status(raw: Option<&Value>) -> ApiStatus {
    let text = raw.and_then(Value::as_str);
    match text.and_then(ApiStatus::parse) {
        Some(status) => status,
        None => {
            warn!(
                event = "core.normalize.unknown_status",
                raw = ?raw,
                mapped_to = "error",
            );
            ApiStatus::Error
        }
    }
}

/// `list_apis` payload. Anything but an array yields an empty list.
pub fn api_list(payload: &Value) -> Vec<ApiSnapshot> {
    let Some(entries) = payload.as_array() else {
        warn!(event = "core.normalize.api_list_malformed", kind = value_kind(payload));
        return Vec::new();
    };
    entries.iter().filter_map(api_snapshot).collect()
}

fn api_snapshot(entry: &Value) -> Option<ApiSnapshot> {
    let obj = entry.as_object()?;
    let id = obj.get("id")?.as_str()?;
    if id.is_empty() {
        return None;
    }
    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .unwrap_or(id);

    Some(ApiSnapshot {
        id: ApiId::from(id),
        name: name.to_string(),
        status: status(obj.get("status")),
        is_listening: flag(obj, "is_listening"),
        port: obj
            .get("port")
            .and_then(Value::as_u64)
            .and_then(|p| u16::try_from(p).ok())
            .filter(|p| *p != 0),
        model: obj.get("model").and_then(Value::as_str).map(str::to_string),
    })
}

/// `get_api_status` payload. `None` unless it is an object.
pub fn api_status(payload: &Value) -> Option<ApiStatusView> {
    let obj = payload.as_object()?;
    Some(ApiStatusView {
        status: status(obj.get("status")),
        is_listening: flag(obj, "is_listening"),
    })
}

/// `get_api_metrics` payload: `{ name: [ {timestamp, value}, ... ] }`.
pub fn metrics(payload: &Value) -> Option<MetricSeries> {
    let obj = payload.as_object()?;
    let mut series = MetricSeries::new();
    for (name, points) in obj {
        let Some(points) = points.as_array() else {
            continue;
        };
        let mut parsed: Vec<MetricPoint> = points.iter().filter_map(metric_point).collect();
        if parsed.is_empty() {
            continue;
        }
        parsed.sort_by_key(|p| p.timestamp);
        series.insert(name.clone(), parsed);
    }
    Some(series)
}

fn metric_point(point: &Value) -> Option<MetricPoint> {
    let obj = point.as_object()?;
    let timestamp = timestamp(obj.get("timestamp")?)?;
    let value = obj.get("value")?.as_f64().filter(|v| v.is_finite())?;
    Some(MetricPoint { timestamp, value })
}

/// `list_alerts` payload. Anything but an array yields no alerts.
pub fn alerts(payload: &Value) -> Vec<AlertRecord> {
    let Some(entries) = payload.as_array() else {
        warn!(event = "core.normalize.alerts_malformed", kind = value_kind(payload));
        return Vec::new();
    };
    entries.iter().filter_map(alert).collect()
}

fn alert(entry: &Value) -> Option<AlertRecord> {
    let obj = entry.as_object()?;
    let id = match obj.get("id")? {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let message = obj.get("message")?.as_str()?.to_string();
    Some(AlertRecord {
        id,
        api_id: obj.get("api_id").and_then(Value::as_str).map(ApiId::from),
        level: obj
            .get("level")
            .and_then(Value::as_str)
            .map(AlertLevel::from_wire)
            .unwrap_or(AlertLevel::Warning),
        message,
        created_at: obj.get("created_at").and_then(timestamp),
    })
}

/// RFC 3339 string or epoch milliseconds.
fn timestamp(raw: &Value) -> Option<DateTime<Utc>> {
    match raw {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| f as i64)
            })?;
            Utc.timestamp_millis_opt(millis).single()
        }
        _ => None,
    }
}

fn flag(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

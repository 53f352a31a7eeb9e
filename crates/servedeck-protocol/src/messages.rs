use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error codes returned by the backend in error responses.
///
/// Unknown codes from future backend versions deserialize to `Unknown` via
/// `#[serde(other)]`.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    UnknownCommand,
    InvalidParams,
    ApiNotFound,
    ApiBusy,
    OperationFailed,
    Internal,
    #[serde(other)]
    Unknown,
}

impl ErrorCode {
    /// Convert a string error code to an `ErrorCode`.
    pub fn from_code(code: &str) -> Self {
        serde_json::from_value(Value::String(code.to_string())).unwrap_or(ErrorCode::Unknown)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::UnknownCommand => write!(f, "unknown_command"),
            ErrorCode::InvalidParams => write!(f, "invalid_params"),
            ErrorCode::ApiNotFound => write!(f, "api_not_found"),
            ErrorCode::ApiBusy => write!(f, "api_busy"),
            ErrorCode::OperationFailed => write!(f, "operation_failed"),
            ErrorCode::Internal => write!(f, "internal"),
            ErrorCode::Unknown => write!(f, "unknown"),
        }
    }
}

/// Client -> Backend request messages.
///
/// Each variant maps to a JSONL message with `"type"` as the tag field.
/// All requests carry an `id` field for response correlation.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Run a named backend command. `params` is command-specific JSON.
    #[serde(rename = "invoke")]
    Invoke {
        id: String,
        command: String,
        #[serde(default)]
        params: Value,
    },

    /// Turn this connection into a push stream for the named events.
    ///
    /// The backend answers with `ack` and then writes `event` lines until
    /// the client disconnects.
    #[serde(rename = "subscribe")]
    Subscribe { id: String, events: Vec<String> },

    #[serde(rename = "ping")]
    Ping { id: String },
}

/// Backend -> Client response and streaming messages.
///
/// Response messages echo the request `id`. Streaming `event` messages have
/// no `id`.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BackendMessage {
    #[serde(rename = "result")]
    Response {
        id: String,
        #[serde(default)]
        data: Value,
    },

    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        id: Option<String>,
        code: ErrorCode,
        message: String,
    },

    /// Pushed event. No `id`.
    #[serde(rename = "event")]
    Event {
        event: String,
        #[serde(default)]
        payload: Value,
    },

    #[serde(rename = "ack")]
    Ack { id: String },
}

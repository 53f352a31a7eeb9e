//! Async JSONL client for the servedeck backend socket.
//!
//! One connection per request. Subscriptions keep their connection open and
//! yield pushed `event` lines until the backend hangs up.

use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use smol::Async;
use smol::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::{BackendMessage, ClientMessage, ErrorCode};

/// Monotonic counter for generating unique request IDs within this process.
static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(1);

pub fn next_request_id() -> String {
    let n = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("deck-{n}")
}

#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    #[error("backend is not running (socket: {path})")]
    NotRunning { path: String },

    #[error("failed to connect to backend: {0}")]
    Connect(std::io::Error),

    #[error("failed to serialize request: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backend closed connection (EOF)")]
    ConnectionClosed,

    #[error("backend sent empty response")]
    EmptyResponse,

    #[error("invalid JSON from backend: {source}: {json}")]
    InvalidJson {
        source: serde_json::Error,
        json: String,
    },

    #[error("{message}")]
    BackendError { code: ErrorCode, message: String },

    #[error("unexpected response from backend: {0:?}")]
    UnexpectedResponse(Box<BackendMessage>),
}

impl IpcError {
    /// Whether the failure happened before any request reached the backend.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, IpcError::NotRunning { .. } | IpcError::Connect(_))
    }
}

/// Handle to the backend socket. Cheap to clone; holds no connection.
#[derive(Debug, Clone)]
pub struct AsyncIpcClient {
    socket_path: PathBuf,
}

impl AsyncIpcClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Missing socket and refused connections both map to `NotRunning`.
    async fn connect(&self) -> Result<Async<UnixStream>, IpcError> {
        if !self.socket_path.exists() {
            return Err(IpcError::NotRunning {
                path: self.socket_path.display().to_string(),
            });
        }
        match Async::<UnixStream>::connect(&self.socket_path).await {
            Ok(stream) => Ok(stream),
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
                Err(IpcError::NotRunning {
                    path: self.socket_path.display().to_string(),
                })
            }
            Err(e) => Err(IpcError::Connect(e)),
        }
    }

    /// Send one request and read one response on a fresh connection.
    ///
    /// An `error` message from the backend is returned as
    /// [`IpcError::BackendError`].
    pub async fn request(&self, msg: &ClientMessage) -> Result<BackendMessage, IpcError> {
        let mut stream = self.connect().await?;
        send_message(&mut stream, msg).await?;
        let mut reader = BufReader::new(stream);
        match read_message(&mut reader).await? {
            BackendMessage::Error { code, message, .. } => {
                Err(IpcError::BackendError { code, message })
            }
            other => Ok(other),
        }
    }

    /// Run a named backend command and return its `data` payload.
    pub async fn invoke(&self, command: &str, params: Value) -> Result<Value, IpcError> {
        let request = ClientMessage::Invoke {
            id: next_request_id(),
            command: command.to_string(),
            params,
        };
        match self.request(&request).await? {
            BackendMessage::Response { data, .. } => Ok(data),
            other => Err(IpcError::UnexpectedResponse(Box::new(other))),
        }
    }

    /// `Ok(false)` when no backend is listening.
    pub async fn ping(&self) -> Result<bool, IpcError> {
        let request = ClientMessage::Ping {
            id: next_request_id(),
        };
        match self.request(&request).await {
            Ok(BackendMessage::Ack { .. }) => Ok(true),
            Ok(other) => Err(IpcError::UnexpectedResponse(Box::new(other))),
            Err(IpcError::NotRunning { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Open a push stream for the named events. Resolves once the backend
    /// acknowledges the subscription.
    pub async fn subscribe(&self, events: &[&str]) -> Result<EventStream, IpcError> {
        let mut stream = self.connect().await?;
        let request = ClientMessage::Subscribe {
            id: next_request_id(),
            events: events.iter().map(|e| e.to_string()).collect(),
        };
        send_message(&mut stream, &request).await?;
        let mut reader = BufReader::new(stream);
        match read_message(&mut reader).await? {
            BackendMessage::Ack { .. } => Ok(EventStream { reader }),
            BackendMessage::Error { code, message, .. } => {
                Err(IpcError::BackendError { code, message })
            }
            other => Err(IpcError::UnexpectedResponse(Box::new(other))),
        }
    }
}

/// Open subscription connection.
pub struct EventStream {
    reader: BufReader<Async<UnixStream>>,
}

impl EventStream {
    /// Next pushed `(event, payload)` pair. `Ok(None)` when the backend hangs up.
    ///
    /// Blank lines and non-event messages on the stream are skipped.
    pub async fn next_event(&mut self) -> Result<Option<(String, Value)>, IpcError> {
        loop {
            match read_message(&mut self.reader).await {
                Ok(BackendMessage::Event { event, payload }) => return Ok(Some((event, payload))),
                Ok(_) | Err(IpcError::EmptyResponse) => continue,
                Err(IpcError::ConnectionClosed) => return Ok(None),
                Err(e) => return Err(e),
            }
        }
    }
}

async fn send_message(stream: &mut Async<UnixStream>, msg: &ClientMessage) -> Result<(), IpcError> {
    let json = serde_json::to_string(msg)?;
    stream.write_all(json.as_bytes()).await?;
    stream.write_all(b"\n").await?;
    stream.flush().await?;
    Ok(())
}

async fn read_message(
    reader: &mut BufReader<Async<UnixStream>>,
) -> Result<BackendMessage, IpcError> {
    let mut line = String::new();
    let bytes_read = reader.read_line(&mut line).await?;
    if bytes_read == 0 {
        return Err(IpcError::ConnectionClosed);
    }
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(IpcError::EmptyResponse);
    }
    serde_json::from_str(trimmed).map_err(|e| IpcError::InvalidJson {
        source: e,
        json: trimmed.to_string(),
    })
}

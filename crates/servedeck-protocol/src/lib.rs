//! Shared wire types and IPC plumbing between servedeck clients and the
//! backend process that owns the managed LLM-serving endpoints.

#[cfg(unix)]
pub mod async_client;
mod messages;
pub mod names;
mod types;

#[cfg(unix)]
pub use async_client::{AsyncIpcClient, EventStream, IpcError};
pub use messages::{BackendMessage, ClientMessage, ErrorCode};
pub use types::{
    AlertLevel, AlertRecord, ApiId, ApiSnapshot, ApiStatus, MetricPoint, OperationKind,
    ProgressEvent,
};

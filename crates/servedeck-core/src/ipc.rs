//! Backend adapters over the Unix-socket JSONL protocol.

use std::path::PathBuf;

use futures::future::BoxFuture;
use serde_json::Value;
use servedeck_protocol::{AsyncIpcClient, IpcError};
use tracing::{debug, info, warn};

use crate::errors::InvokeError;
use crate::events::EventHub;
use crate::ports::CommandInvoker;

/// [`CommandInvoker`] that sends each command on its own socket connection.
#[derive(Debug, Clone)]
pub struct IpcBackend {
    client: AsyncIpcClient,
}

impl IpcBackend {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            client: AsyncIpcClient::new(socket_path),
        }
    }

    pub fn client(&self) -> &AsyncIpcClient {
        &self.client
    }
}

impl CommandInvoker for IpcBackend {
    fn invoke(&self, command: &str, params: Value) -> BoxFuture<'static, Result<Value, InvokeError>> {
        let client = self.client.clone();
        let command = command.to_string();
        Box::pin(async move {
            debug!(event = "core.ipc.invoke_started", command = %command);
            match client.invoke(&command, params).await {
                Ok(data) => {
                    debug!(event = "core.ipc.invoke_completed", command = %command);
                    Ok(data)
                }
                Err(e) => {
                    warn!(
                        event = "core.ipc.invoke_failed",
                        command = %command,
                        error = %e,
                    );
                    Err(InvokeError::from_ipc(&command, e))
                }
            }
        })
    }
}

/// Subscribe to `events` on the backend and re-emit every pushed event on
/// `hub` until the backend closes the stream.
pub async fn forward_events(
    client: AsyncIpcClient,
    hub: EventHub,
    events: Vec<String>,
) -> Result<(), IpcError> {
    let names: Vec<&str> = events.iter().map(String::as_str).collect();
    let mut stream = client.subscribe(&names).await?;
    info!(event = "core.ipc.subscribe_completed", events = ?events);

    while let Some((event, payload)) = stream.next_event().await? {
        hub.emit(&event, &payload);
    }

    info!(event = "core.ipc.stream_closed");
    Ok(())
}

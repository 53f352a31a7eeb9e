//! Collaborator seams: command invocation, pushed events, host visibility.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::BoxFuture;
use serde_json::Value;

use crate::errors::InvokeError;

/// Runs a named backend command.
pub trait CommandInvoker: Send + Sync {
    fn invoke(&self, command: &str, params: Value) -> BoxFuture<'static, Result<Value, InvokeError>>;
}

pub type EventHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Source of pushed backend events.
///
/// Handlers for one event are called in emission order.
pub trait EventSource: Send + Sync {
    fn subscribe(&self, event: &str, handler: EventHandler) -> Subscription;
}

/// Registered event handler. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A subscription with nothing to release.
    pub fn noop() -> Self {
        Self { release: None }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// Synchronous "is the host hidden" query, asked once per poll tick.
pub trait VisibilitySource: Send + Sync {
    fn is_hidden(&self) -> bool;
}

/// Host that is never hidden (terminal sessions).
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysVisible;

impl VisibilitySource for AlwaysVisible {
    fn is_hidden(&self) -> bool {
        false
    }
}

/// Visibility toggled by the host.
#[derive(Debug, Default)]
pub struct VisibilityFlag {
    hidden: AtomicBool,
}

impl VisibilityFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_hidden(&self, hidden: bool) {
        self.hidden.store(hidden, Ordering::SeqCst);
    }
}

impl VisibilitySource for VisibilityFlag {
    fn is_hidden(&self) -> bool {
        self.hidden.load(Ordering::SeqCst)
    }
}

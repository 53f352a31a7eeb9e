//! Start, stop and delete with per-API locking and scoped progress.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::json;
use servedeck_protocol::{ApiId, ApiStatus, OperationKind};
use tracing::{debug, error, info};

use crate::confirm::{ConfirmPrompt, ConfirmationOutcome, ConfirmationSequence, ConfirmationStep};
use crate::lock;
use crate::operations::{OperationErrors, OperationTracker, ProgressScope};
use crate::ports::{CommandInvoker, EventSource};
use crate::runtime::Runtime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "message", rename_all = "snake_case")]
pub enum OperationOutcome {
    Completed,
    /// Another operation on the same API is still running. Nothing was sent.
    AlreadyInProgress,
    Failed(String),
}

pub type SettledListener = Arc<dyn Fn(&ApiId, OperationKind) + Send + Sync>;

/// Mutating calls against the backend.
///
/// At most one operation per API runs at a time; a second request while one
/// is in flight is dropped, not queued. Listeners registered with
/// [`on_settled`](Self::on_settled) run after every operation that was
/// actually sent, once the API is no longer busy.
#[derive(Clone)]
pub struct ApiActions {
    invoker: Arc<dyn CommandInvoker>,
    events: Arc<dyn EventSource>,
    runtime: Arc<dyn Runtime>,
    tracker: Arc<OperationTracker>,
    errors: Arc<OperationErrors>,
    listeners: Arc<Mutex<Vec<SettledListener>>>,
}

impl ApiActions {
    pub fn new(
        invoker: Arc<dyn CommandInvoker>,
        events: Arc<dyn EventSource>,
        runtime: Arc<dyn Runtime>,
    ) -> Self {
        Self {
            invoker,
            events,
            runtime,
            tracker: Arc::new(OperationTracker::new()),
            errors: Arc::new(OperationErrors::new()),
            listeners: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn tracker(&self) -> &Arc<OperationTracker> {
        &self.tracker
    }

    pub fn errors(&self) -> &Arc<OperationErrors> {
        &self.errors
    }

    pub fn on_settled(&self, listener: impl Fn(&ApiId, OperationKind) + Send + Sync + 'static) {
        lock(&self.listeners).push(Arc::new(listener));
    }

    pub async fn start(&self, id: &ApiId) -> OperationOutcome {
        self.run(id, OperationKind::Start).await
    }

    pub async fn stop(&self, id: &ApiId) -> OperationOutcome {
        self.run(id, OperationKind::Stop).await
    }

    /// Run `kind` on `id` without any confirmation.
    pub async fn run(&self, id: &ApiId, kind: OperationKind) -> OperationOutcome {
        let Some(guard) = self.tracker.begin_guarded(id) else {
            return OperationOutcome::AlreadyInProgress;
        };
        self.errors.clear(id);
        info!(event = "core.operation.run_started", api_id = %id, operation = %kind);

        let scope = ProgressScope::open(self.events.as_ref(), self.tracker.clone(), id.clone());
        let result = self
            .invoker
            .invoke(kind.command(), json!({ "id": id }))
            .await;
        drop(scope);

        let outcome = match result {
            Ok(_) => {
                info!(event = "core.operation.run_completed", api_id = %id, operation = %kind);
                OperationOutcome::Completed
            }
            Err(e) => {
                error!(
                    event = "core.operation.run_failed",
                    api_id = %id,
                    operation = %kind,
                    error = %e,
                );
                let message = e.to_string();
                self.errors.record(id, message.clone());
                OperationOutcome::Failed(message)
            }
        };
        drop(guard);

        let listeners = lock(&self.listeners).clone();
        for listener in listeners {
            listener(id, kind);
        }
        outcome
    }

    /// Delete `id` after confirmation. When `status` says the API is up, a
    /// second prompt warns that it will be stopped first. A busy API is
    /// reported without asking anything.
    pub async fn delete(
        &self,
        id: &ApiId,
        status: Option<ApiStatus>,
        prompt: &dyn ConfirmPrompt,
    ) -> ConfirmationOutcome<OperationOutcome> {
        if self.tracker.is_busy(id) {
            debug!(event = "core.operation.delete_skipped", api_id = %id, reason = "busy");
            return ConfirmationOutcome::Confirmed(OperationOutcome::AlreadyInProgress);
        }
        delete_confirmation(id, status)
            .run(prompt, self.runtime.as_ref(), || {
                self.run(id, OperationKind::Delete)
            })
            .await
    }
}

fn delete_confirmation(id: &ApiId, status: Option<ApiStatus>) -> ConfirmationSequence {
    let sequence = ConfirmationSequence::new().step(ConfirmationStep::new(format!(
        "Delete API '{}'? This cannot be undone.",
        id
    )));
    match status {
        Some(status) if status.is_active() => sequence.step(ConfirmationStep::new(format!(
            "API '{}' is {}. It will be stopped before it is deleted. Continue?",
            id, status
        ))),
        _ => sequence,
    }
}

//! In-flight mutating operations: per-API busy lock, pushed progress, and
//! per-API failure messages.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::Value;
use servedeck_protocol::names::events::API_OPERATION_PROGRESS;
use servedeck_protocol::{ApiId, ProgressEvent};
use tracing::{debug, info};

use crate::lock;
use crate::ports::{EventSource, Subscription};

/// Point-in-time copy of the tracker.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OperationSnapshot {
    pub busy: BTreeSet<ApiId>,
    pub progress: BTreeMap<ApiId, ProgressEvent>,
}

/// Registry of APIs currently undergoing a mutating operation.
///
/// `begin` is the lock: a second `begin` for the same API fails until
/// `end`. Progress is only kept for tracked APIs and is dropped with them.
#[derive(Debug, Default)]
pub struct OperationTracker {
    state: Mutex<TrackerState>,
}

#[derive(Debug, Default)]
struct TrackerState {
    busy: HashSet<ApiId>,
    progress: HashMap<ApiId, ProgressEvent>,
}

impl OperationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if `id` is already busy.
    pub fn begin(&self, id: &ApiId) -> bool {
        let inserted = lock(&self.state).busy.insert(id.clone());
        if !inserted {
            info!(event = "core.operation.begin_rejected", api_id = %id);
        }
        inserted
    }

    /// Clears the busy marker and any progress for `id`.
    pub fn end(&self, id: &ApiId) {
        let mut state = lock(&self.state);
        state.busy.remove(id);
        state.progress.remove(id);
    }

    /// [`begin`](Self::begin) returning a guard that calls `end` when dropped.
    pub fn begin_guarded(self: &Arc<Self>, id: &ApiId) -> Option<OperationGuard> {
        self.begin(id).then(|| OperationGuard {
            tracker: self.clone(),
            id: id.clone(),
        })
    }

    /// Store progress for a busy API. Returns false (and drops the event)
    /// when the API is not tracked.
    pub fn set_progress(&self, event: ProgressEvent) -> bool {
        let mut state = lock(&self.state);
        if !state.busy.contains(&event.api_id) {
            debug!(
                event = "core.operation.progress_dropped",
                api_id = %event.api_id,
            );
            return false;
        }
        state.progress.insert(event.api_id.clone(), event);
        true
    }

    pub fn is_busy(&self, id: &ApiId) -> bool {
        lock(&self.state).busy.contains(id)
    }

    pub fn progress(&self, id: &ApiId) -> Option<ProgressEvent> {
        lock(&self.state).progress.get(id).cloned()
    }

    pub fn snapshot(&self) -> OperationSnapshot {
        let state = lock(&self.state);
        OperationSnapshot {
            busy: state.busy.iter().cloned().collect(),
            progress: state
                .progress
                .iter()
                .map(|(id, event)| (id.clone(), event.clone()))
                .collect(),
        }
    }
}

/// Busy marker for one API. Dropping it ends the operation, whether the
/// operation succeeded, failed, or its future was dropped.
#[must_use = "dropping the guard ends the operation immediately"]
#[derive(Debug)]
pub struct OperationGuard {
    tracker: Arc<OperationTracker>,
    id: ApiId,
}

impl OperationGuard {
    pub fn id(&self) -> &ApiId {
        &self.id
    }
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        self.tracker.end(&self.id);
    }
}

/// Last failure message per API.
#[derive(Debug, Default)]
pub struct OperationErrors {
    errors: Mutex<HashMap<ApiId, String>>,
}

impl OperationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, id: &ApiId, message: impl Into<String>) {
        lock(&self.errors).insert(id.clone(), message.into());
    }

    pub fn clear(&self, id: &ApiId) {
        lock(&self.errors).remove(id);
    }

    pub fn get(&self, id: &ApiId) -> Option<String> {
        lock(&self.errors).get(id).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<ApiId, String> {
        lock(&self.errors)
            .iter()
            .map(|(id, message)| (id.clone(), message.clone()))
            .collect()
    }
}

/// Progress subscription for one API, open for the duration of one call.
#[derive(Debug)]
pub struct ProgressScope {
    _subscription: Subscription,
}

impl ProgressScope {
    /// Feed `api_operation_progress` events for `id` into `tracker` until
    /// the scope is dropped. Events for other APIs are ignored.
    pub fn open(events: &dyn EventSource, tracker: Arc<OperationTracker>, id: ApiId) -> Self {
        let subscription = events.subscribe(
            API_OPERATION_PROGRESS,
            Arc::new(move |payload: &Value| {
                match serde_json::from_value::<ProgressEvent>(payload.clone()) {
                    Ok(event) if event.api_id == id => {
                        tracker.set_progress(event);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        debug!(
                            event = "core.operation.progress_malformed",
                            api_id = %id,
                            error = %e,
                        );
                    }
                }
            }),
        );
        Self {
            _subscription: subscription,
        }
    }
}

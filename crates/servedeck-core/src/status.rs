use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

/// Immutable copy of a synchronized view, handed to readers and listeners.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryView<V> {
    pub data: Option<V>,
    pub error: Option<String>,
    pub loading: bool,
    /// Number of committed data changes since creation.
    pub revision: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Proof that a load holds the latch. Only the matching load may release it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// Derived view of remote state for one key.
///
/// `K = ()` tracks a whole collection; `K = ApiId` tracks one API and
/// rejects snapshots for any other id. Snapshots replace the view
/// wholesale; a snapshot equal to the current view is suppressed.
#[derive(Debug)]
pub struct StatusSynchronizer<K, V> {
    tracked: Option<K>,
    data: Option<V>,
    error: Option<String>,
    loading: Option<LoadTicket>,
    next_load: u64,
    revision: u64,
    updated_at: Option<DateTime<Utc>>,
}

impl<V: Clone + PartialEq> StatusSynchronizer<(), V> {
    pub fn collection() -> Self {
        Self::new(Some(()))
    }
}

impl<K: Clone + PartialEq, V: Clone + PartialEq> StatusSynchronizer<K, V> {
    pub fn new(tracked: Option<K>) -> Self {
        Self {
            tracked,
            data: None,
            error: None,
            loading: None,
            next_load: 0,
            revision: 0,
            updated_at: None,
        }
    }

    /// Switch to another key. A real switch clears the view, the error and
    /// the loading latch. Returns whether anything changed.
    pub fn track(&mut self, key: Option<K>) -> bool {
        if self.tracked == key {
            return false;
        }
        self.tracked = key;
        self.data = None;
        self.error = None;
        self.loading = None;
        true
    }

    pub fn tracked(&self) -> Option<&K> {
        self.tracked.as_ref()
    }

    /// Replace the view with `next` if it belongs to the tracked key and
    /// differs from the current view. Returns whether the view changed.
    pub fn apply_snapshot(&mut self, key: &K, next: V) -> bool {
        if self.tracked.as_ref() != Some(key) {
            debug!(event = "core.status.snapshot_rejected", reason = "key_mismatch");
            return false;
        }
        if self.data.as_ref() == Some(&next) {
            return false;
        }
        self.data = Some(next);
        self.revision += 1;
        self.updated_at = Some(Utc::now());
        true
    }

    /// Take the loading latch. `None` if a load is already in flight.
    pub fn begin_load(&mut self) -> Option<LoadTicket> {
        if self.loading.is_some() {
            return None;
        }
        self.next_load += 1;
        let ticket = LoadTicket(self.next_load);
        self.loading = Some(ticket);
        Some(ticket)
    }

    /// Release the latch if `ticket` still holds it.
    pub fn finish_load(&mut self, ticket: LoadTicket) {
        if self.loading == Some(ticket) {
            self.loading = None;
        }
    }

    /// Set or clear the error. Returns whether it changed.
    pub fn record_error(&mut self, error: Option<String>) -> bool {
        if self.error == error {
            return false;
        }
        self.error = error;
        true
    }

    pub fn data(&self) -> Option<&V> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn view(&self) -> QueryView<V> {
        QueryView {
            data: self.data.clone(),
            error: self.error.clone(),
            loading: self.loading.is_some(),
            revision: self.revision,
            updated_at: self.updated_at,
        }
    }
}

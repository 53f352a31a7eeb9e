//! Polled queries: a scheduler, a staleness guard, a selection, and a
//! status synchronizer behind one handle.

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use serde_json::{Value, json};
use servedeck_protocol::names::commands;
use servedeck_protocol::{AlertRecord, ApiId, ApiSnapshot};
use tracing::{debug, warn};

use crate::lock;
use crate::normalize::{self, ApiStatusView, MetricSeries};
use crate::poll::{FetchFn, PollContext, PollOptions, PollScheduler, PollTrigger};
use crate::ports::CommandInvoker;
use crate::staleness::{StalenessGuard, TrackedId};
use crate::status::{QueryView, StatusSynchronizer};

/// What a query fetches and how it reads the reply.
pub struct QuerySpec<K, V> {
    pub name: &'static str,
    pub command: &'static str,
    pub params: fn(&K) -> Value,
    pub normalize: fn(&Value) -> Option<V>,
}

impl<K, V> Clone for QuerySpec<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for QuerySpec<K, V> {}

pub type ChangeListener<V> = Arc<dyn Fn(&QueryView<V>) + Send + Sync>;

pub type ApiListQuery = SyncedQuery<(), Vec<ApiSnapshot>>;
pub type ApiStatusQuery = SyncedQuery<ApiId, ApiStatusView>;
pub type MetricsQuery = SyncedQuery<ApiId, MetricSeries>;
pub type AlertsQuery = SyncedQuery<(), Vec<AlertRecord>>;

pub fn api_list_spec() -> QuerySpec<(), Vec<ApiSnapshot>> {
    QuerySpec {
        name: "api_list",
        command: commands::LIST_APIS,
        params: |_| json!({}),
        normalize: |payload| Some(normalize::api_list(payload)),
    }
}

pub fn api_status_spec() -> QuerySpec<ApiId, ApiStatusView> {
    QuerySpec {
        name: "api_status",
        command: commands::GET_API_STATUS,
        params: |id| json!({ "id": id }),
        normalize: normalize::api_status,
    }
}

pub fn metrics_spec() -> QuerySpec<ApiId, MetricSeries> {
    QuerySpec {
        name: "api_metrics",
        command: commands::GET_API_METRICS,
        params: |id| json!({ "id": id }),
        normalize: normalize::metrics,
    }
}

pub fn alerts_spec() -> QuerySpec<(), Vec<AlertRecord>> {
    QuerySpec {
        name: "alerts",
        command: commands::LIST_ALERTS,
        params: |_| json!({}),
        normalize: |payload| Some(normalize::alerts(payload)),
    }
}

/// One polled view of backend state.
///
/// Each fetch is dropped when nothing is selected or another fetch for this
/// query is still in flight. A result is discarded when the query was
/// disposed or the selection moved while it was in flight. Listeners fire
/// only when the data or the error actually changed.
///
/// Dropping the query disposes it.
pub struct SyncedQuery<K, V> {
    inner: Arc<QueryInner<K, V>>,
    scheduler: PollScheduler,
}

struct QueryInner<K, V> {
    spec: QuerySpec<K, V>,
    invoker: Arc<dyn CommandInvoker>,
    guard: StalenessGuard,
    selection: TrackedId<K>,
    state: Mutex<StatusSynchronizer<K, V>>,
    listeners: Mutex<Vec<ChangeListener<V>>>,
}

impl<K, V> SyncedQuery<K, V>
where
    K: Clone + PartialEq + Send + Sync + 'static,
    V: Clone + PartialEq + Send + Sync + 'static,
{
    /// Build the query. Polling begins at [`start`](Self::start).
    pub fn new(
        spec: QuerySpec<K, V>,
        invoker: Arc<dyn CommandInvoker>,
        ctx: PollContext,
        options: PollOptions,
        selection: Option<K>,
    ) -> Self {
        let inner = Arc::new(QueryInner {
            spec,
            invoker,
            guard: StalenessGuard::new(),
            selection: TrackedId::new(selection.clone()),
            state: Mutex::new(StatusSynchronizer::new(selection)),
            listeners: Mutex::new(Vec::new()),
        });

        let weak = Arc::downgrade(&inner);
        let callback: FetchFn = Arc::new(move |trigger: PollTrigger| -> BoxFuture<'static, ()> {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(inner) = weak.upgrade() {
                    QueryInner::fetch(inner, trigger).await;
                }
            })
        });
        let scheduler = PollScheduler::new(spec.name, options, callback, ctx);

        Self { inner, scheduler }
    }

    pub fn start(&self) {
        self.scheduler.start();
    }

    /// Move the selection. A real move clears the view, notifies listeners
    /// and forces a fetch for the new key.
    pub fn select(&self, key: Option<K>) {
        if !self.inner.selection.set(key.clone()) {
            return;
        }
        let has_key = key.is_some();
        let view = {
            let mut state = lock(&self.inner.state);
            state.track(key);
            state.view()
        };
        debug!(event = "core.query.selection_changed", query = self.inner.spec.name);
        self.inner.notify(&view);

        if has_key {
            self.scheduler.refresh();
        }
    }

    pub fn selected(&self) -> Option<K> {
        self.inner.selection.get()
    }

    pub fn refresh(&self) {
        self.scheduler.refresh();
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.scheduler.set_enabled(enabled);
    }

    pub fn on_change(&self, listener: impl Fn(&QueryView<V>) + Send + Sync + 'static) {
        lock(&self.inner.listeners).push(Arc::new(listener));
    }

    pub fn view(&self) -> QueryView<V> {
        lock(&self.inner.state).view()
    }

    pub fn scheduler(&self) -> &PollScheduler {
        &self.scheduler
    }

    pub fn name(&self) -> &'static str {
        self.inner.spec.name
    }

    pub fn is_live(&self) -> bool {
        self.inner.guard.is_live()
    }

    /// Stop polling and discard every in-flight result.
    pub fn dispose(&self) {
        if self.inner.guard.dispose() {
            self.scheduler.teardown();
            lock(&self.inner.listeners).clear();
        }
    }
}

impl<K, V> Drop for SyncedQuery<K, V> {
    fn drop(&mut self) {
        if self.inner.guard.dispose() {
            self.scheduler.teardown();
        }
    }
}

impl<K, V> QueryInner<K, V>
where
    K: Clone + PartialEq + Send + Sync + 'static,
    V: Clone + PartialEq + Send + Sync + 'static,
{
    async fn fetch(self: Arc<Self>, trigger: PollTrigger) {
        let name = self.spec.name;
        let token = self.guard.token();
        let ticket = self.selection.capture();
        let Some(key) = ticket.key().cloned() else {
            debug!(event = "core.query.fetch_skipped", query = name, reason = "no_selection");
            return;
        };
        let Some(load) = lock(&self.state).begin_load() else {
            debug!(event = "core.query.fetch_skipped", query = name, reason = "in_flight");
            return;
        };

        debug!(event = "core.query.fetch_started", query = name, trigger = ?trigger);
        let result = self
            .invoker
            .invoke(self.spec.command, (self.spec.params)(&key))
            .await;

        if !token.is_live() {
            debug!(event = "core.query.result_discarded", query = name, reason = "disposed");
            return;
        }

        let changed_view = {
            let mut state = lock(&self.state);
            state.finish_load(load);
            if !ticket.is_current() {
                debug!(
                    event = "core.query.result_discarded",
                    query = name,
                    reason = "selection_changed",
                );
                return;
            }

            let changed = match result {
                Ok(payload) => match (self.spec.normalize)(&payload) {
                    Some(next) => {
                        let data_changed = state.apply_snapshot(&key, next);
                        let error_cleared = state.record_error(None);
                        data_changed || error_cleared
                    }
                    None => {
                        warn!(event = "core.query.payload_rejected", query = name);
                        state.record_error(Some(format!(
                            "unexpected {} response",
                            self.spec.command
                        )))
                    }
                },
                Err(e) => {
                    warn!(event = "core.query.fetch_failed", query = name, error = %e);
                    state.record_error(Some(e.to_string()))
                }
            };
            changed.then(|| state.view())
        };

        if let Some(view) = changed_view {
            self.notify(&view);
        }
    }

    fn notify(&self, view: &QueryView<V>) {
        let listeners = lock(&self.listeners).clone();
        for listener in listeners {
            listener(view);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ManualClock, ManualRuntime, ScriptedInvoker};
    use servedeck_protocol::ApiStatus;
    use std::time::Duration;

    struct Harness {
        runtime: Arc<ManualRuntime>,
        invoker: Arc<ScriptedInvoker>,
    }

    impl Harness {
        fn new() -> Self {
            let clock = Arc::new(ManualClock::new());
            Self {
                runtime: Arc::new(ManualRuntime::new(clock)),
                invoker: Arc::new(ScriptedInvoker::new()),
            }
        }

        fn ctx(&self) -> PollContext {
            PollContext::new(self.runtime.clone()).with_clock(self.runtime.clock().clone())
        }

        fn list_query(&self) -> ApiListQuery {
            SyncedQuery::new(
                api_list_spec(),
                self.invoker.clone(),
                self.ctx(),
                PollOptions::new(Duration::from_millis(1000)),
                Some(()),
            )
        }

        fn status_query(&self, id: Option<&str>) -> ApiStatusQuery {
            SyncedQuery::new(
                api_status_spec(),
                self.invoker.clone(),
                self.ctx(),
                PollOptions::new(Duration::from_millis(1000)),
                id.map(ApiId::from),
            )
        }
    }

    fn counter<K, V>(query: &SyncedQuery<K, V>) -> Arc<Mutex<usize>>
    where
        K: Clone + PartialEq + Send + Sync + 'static,
        V: Clone + PartialEq + Send + Sync + 'static,
    {
        let count = Arc::new(Mutex::new(0));
        let sink = count.clone();
        query.on_change(move |_| *sink.lock().unwrap() += 1);
        count
    }

    #[test]
    fn test_initial_fetch_populates_view() {
        let h = Harness::new();
        h.invoker.reply_ok(
            "list_apis",
            json!([{"id": "llama", "status": "running", "is_listening": true}]),
        );
        let query = h.list_query();
        query.start();
        h.runtime.run_until_stalled();

        let view = query.view();
        let data = view.data.unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].status, ApiStatus::Running);
        assert_eq!(view.revision, 1);
        assert!(!view.loading);
        assert_eq!(h.invoker.calls()[0].0, "list_apis");
    }

    #[test]
    fn test_unchanged_snapshot_does_not_notify() {
        let h = Harness::new();
        h.invoker
            .always("list_apis", Ok(json!([{"id": "a", "status": "stopped"}])));
        let query = h.list_query();
        let changes = counter(&query);
        query.start();
        h.runtime.run_until_stalled();
        h.runtime.advance(Duration::from_millis(3000));

        assert_eq!(h.invoker.call_count("list_apis"), 4);
        assert_eq!(*changes.lock().unwrap(), 1);
        assert_eq!(query.view().revision, 1);
    }

    #[test]
    fn test_failure_records_error_and_success_clears_it() {
        let h = Harness::new();
        h.invoker.reply_err("list_apis", "backend restarting");
        h.invoker.reply_ok("list_apis", json!([]));
        let query = h.list_query();
        query.start();
        h.runtime.run_until_stalled();

        let view = query.view();
        assert_eq!(view.error.as_deref(), Some("backend restarting"));
        assert!(!view.loading);
        assert!(query.scheduler().has_active_timer());

        h.runtime.advance(Duration::from_millis(1000));
        let view = query.view();
        assert!(view.error.is_none());
        assert_eq!(view.data, Some(vec![]));
    }

    #[test]
    fn test_in_flight_fetch_drops_duplicates() {
        let h = Harness::new();
        let gate = h.invoker.gate("list_apis");
        let query = h.list_query();
        query.start();
        h.runtime.run_until_stalled();
        assert!(query.view().loading);

        query.refresh();
        h.runtime.run_until_stalled();
        assert_eq!(h.invoker.call_count("list_apis"), 1);

        gate.ok(json!([]));
        h.runtime.run_until_stalled();
        assert!(!query.view().loading);
    }

    #[test]
    fn test_no_selection_fetches_nothing() {
        let h = Harness::new();
        let query = h.status_query(None);
        query.start();
        h.runtime.advance(Duration::from_millis(2000));
        assert!(h.invoker.calls().is_empty());
    }

    #[test]
    fn test_select_forces_fetch_with_key_param() {
        let h = Harness::new();
        h.invoker.reply_ok("get_api_status", json!({"status": "preparing"}));
        let query = h.status_query(None);
        query.start();

        query.select(Some(ApiId::from("qwen")));
        h.runtime.run_until_stalled();

        assert_eq!(h.invoker.calls()[0].1, json!({"id": "qwen"}));
        assert_eq!(
            query.view().data.map(|v| v.status),
            Some(ApiStatus::Preparing)
        );
    }

    #[test]
    fn test_unexpected_payload_is_an_error() {
        let h = Harness::new();
        h.invoker.reply_ok("get_api_status", json!("running"));
        let query = h.status_query(Some("a"));
        query.start();
        h.runtime.run_until_stalled();
        assert_eq!(
            query.view().error.as_deref(),
            Some("unexpected get_api_status response")
        );
    }

    #[test]
    fn test_dispose_discards_in_flight_result() {
        let h = Harness::new();
        let gate = h.invoker.gate("list_apis");
        let query = h.list_query();
        let changes = counter(&query);
        query.start();
        h.runtime.run_until_stalled();

        query.dispose();
        assert!(!query.is_live());
        gate.ok(json!([{"id": "late", "status": "running"}]));
        h.runtime.run_until_stalled();

        assert!(query.view().data.is_none());
        assert_eq!(*changes.lock().unwrap(), 0);
        assert_eq!(h.runtime.active_timers(), 0);
    }
}

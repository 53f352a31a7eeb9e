use std::sync::Arc;

use servedeck_config::DeckConfig;
use servedeck_protocol::{ApiId, ApiStatus, OperationKind};
use tracing::info;

use crate::actions::{ApiActions, OperationOutcome};
use crate::confirm::{ConfirmPrompt, ConfirmationOutcome};
use crate::poll::{PollContext, PollOptions};
use crate::ports::{CommandInvoker, EventSource};
use crate::query::{
    AlertsQuery, ApiListQuery, ApiStatusQuery, MetricsQuery, SyncedQuery, alerts_spec,
    api_list_spec, api_status_spec, metrics_spec,
};

/// Everything a front end polls and mutates, built from one config.
///
/// The API list and alerts are always tracked. Status and metrics follow
/// the selected API. A settled start, stop or delete refreshes the list and
/// the status query.
pub struct Dashboard {
    apis: ApiListQuery,
    status: ApiStatusQuery,
    metrics: MetricsQuery,
    alerts: AlertsQuery,
    actions: ApiActions,
    confirm_delete: bool,
}

impl Dashboard {
    pub fn new(
        config: &DeckConfig,
        invoker: Arc<dyn CommandInvoker>,
        events: Arc<dyn EventSource>,
        ctx: PollContext,
    ) -> Self {
        let polling = &config.polling;
        let options = |interval| {
            PollOptions::new(interval)
                .min_request_interval(polling.min_request_interval())
                .skip_when_hidden(polling.skip_when_hidden())
        };

        let apis = SyncedQuery::new(
            api_list_spec(),
            invoker.clone(),
            ctx.clone(),
            options(polling.list_interval()),
            Some(()),
        );
        let status = SyncedQuery::new(
            api_status_spec(),
            invoker.clone(),
            ctx.clone(),
            options(polling.status_interval()),
            None,
        );
        let metrics = SyncedQuery::new(
            metrics_spec(),
            invoker.clone(),
            ctx.clone(),
            options(polling.metrics_interval()),
            None,
        );
        let alerts = SyncedQuery::new(
            alerts_spec(),
            invoker.clone(),
            ctx.clone(),
            options(polling.alerts_interval()),
            Some(()),
        );

        let actions = ApiActions::new(invoker, events, ctx.runtime.clone());
        let list_poll = apis.scheduler().clone();
        let status_poll = status.scheduler().clone();
        actions.on_settled(move |_, _| {
            list_poll.refresh();
            status_poll.refresh();
        });

        Self {
            apis,
            status,
            metrics,
            alerts,
            actions,
            confirm_delete: config.confirm_delete(),
        }
    }

    pub fn start(&self) {
        info!(event = "core.dashboard.start_started");
        self.apis.start();
        self.status.start();
        self.metrics.start();
        self.alerts.start();
    }

    /// Point status and metrics at `id`, or at nothing.
    pub fn select(&self, id: Option<ApiId>) {
        self.status.select(id.clone());
        self.metrics.select(id);
    }

    pub fn selected(&self) -> Option<ApiId> {
        self.status.selected()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.apis.set_enabled(enabled);
        self.status.set_enabled(enabled);
        self.metrics.set_enabled(enabled);
        self.alerts.set_enabled(enabled);
    }

    pub fn apis(&self) -> &ApiListQuery {
        &self.apis
    }

    pub fn status(&self) -> &ApiStatusQuery {
        &self.status
    }

    pub fn metrics(&self) -> &MetricsQuery {
        &self.metrics
    }

    pub fn alerts(&self) -> &AlertsQuery {
        &self.alerts
    }

    pub fn actions(&self) -> &ApiActions {
        &self.actions
    }

    /// Last known status of `id`. The status query wins when it tracks `id`.
    pub fn known_status(&self, id: &ApiId) -> Option<ApiStatus> {
        if self.status.selected().as_ref() == Some(id)
            && let Some(view) = self.status.view().data
        {
            return Some(view.status);
        }
        self.apis
            .view()
            .data?
            .into_iter()
            .find(|api| &api.id == id)
            .map(|api| api.status)
    }

    /// Delete `id`, prompting unless `[confirm] delete` is off.
    pub async fn delete(
        &self,
        id: &ApiId,
        prompt: &dyn ConfirmPrompt,
    ) -> ConfirmationOutcome<OperationOutcome> {
        if !self.confirm_delete {
            return ConfirmationOutcome::Confirmed(self.actions.run(id, OperationKind::Delete).await);
        }
        self.actions
            .delete(id, self.known_status(id), prompt)
            .await
    }

    /// Stop polling and discard in-flight results of every query.
    pub fn dispose(&self) {
        self.apis.dispose();
        self.status.dispose();
        self.metrics.dispose();
        self.alerts.dispose();
        info!(event = "core.dashboard.dispose_completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventHub;
    use crate::testing::{ManualClock, ManualRuntime, ScriptedInvoker, ScriptedPrompt};
    use servedeck_config::ConfirmConfig;
    use serde_json::json;
    use std::time::Duration;

    struct Harness {
        runtime: Arc<ManualRuntime>,
        invoker: Arc<ScriptedInvoker>,
    }

    impl Harness {
        fn new() -> Self {
            let invoker = Arc::new(ScriptedInvoker::new());
            invoker.always(
                "list_apis",
                Ok(json!([
                    {"id": "llama", "status": "running", "is_listening": true},
                    {"id": "old", "status": "stopped"}
                ])),
            );
            invoker.always("list_alerts", Ok(json!([])));
            Self {
                runtime: Arc::new(ManualRuntime::new(Arc::new(ManualClock::new()))),
                invoker,
            }
        }

        fn dashboard(&self, config: &DeckConfig) -> Dashboard {
            let ctx =
                PollContext::new(self.runtime.clone()).with_clock(self.runtime.clock().clone());
            Dashboard::new(config, self.invoker.clone(), Arc::new(EventHub::new()), ctx)
        }
    }

    #[test]
    fn test_intervals_come_from_config() {
        let h = Harness::new();
        let mut config = DeckConfig::default();
        config.polling.status_interval_ms = Some(750);
        config.polling.min_request_interval_ms = Some(500);
        let dash = h.dashboard(&config);

        assert_eq!(
            dash.apis().scheduler().options().interval,
            Duration::from_millis(5000)
        );
        let status = dash.status().scheduler().options();
        assert_eq!(status.interval, Duration::from_millis(750));
        assert_eq!(status.min_request_interval, Duration::from_millis(500));
        assert_eq!(
            dash.alerts().scheduler().options().interval,
            Duration::from_millis(15000)
        );
    }

    #[test]
    fn test_start_loads_collections_only() {
        let h = Harness::new();
        let dash = h.dashboard(&DeckConfig::default());
        dash.start();
        h.runtime.run_until_stalled();

        assert_eq!(h.invoker.call_count("list_apis"), 1);
        assert_eq!(h.invoker.call_count("list_alerts"), 1);
        assert_eq!(h.invoker.call_count("get_api_status"), 0);
        assert_eq!(h.invoker.call_count("get_api_metrics"), 0);
        assert_eq!(dash.apis().view().data.map(|d| d.len()), Some(2));
    }

    #[test]
    fn test_select_follows_api_in_status_and_metrics() {
        let h = Harness::new();
        h.invoker.always("get_api_status", Ok(json!({"status": "running"})));
        h.invoker.always("get_api_metrics", Ok(json!({})));
        let dash = h.dashboard(&DeckConfig::default());
        dash.start();

        dash.select(Some(ApiId::from("llama")));
        h.runtime.run_until_stalled();

        assert_eq!(dash.selected(), Some(ApiId::from("llama")));
        assert_eq!(h.invoker.call_count("get_api_status"), 1);
        assert_eq!(h.invoker.call_count("get_api_metrics"), 1);
        assert_eq!(
            dash.known_status(&ApiId::from("llama")),
            Some(ApiStatus::Running)
        );
    }

    #[test]
    fn test_settled_operation_refreshes_list() {
        let h = Harness::new();
        h.invoker.always("stop_api", Ok(json!({})));
        let dash = h.dashboard(&DeckConfig::default());
        dash.start();
        h.runtime.run_until_stalled();

        let outcome = futures::executor::block_on(dash.actions().stop(&ApiId::from("llama")));
        assert_eq!(outcome, OperationOutcome::Completed);
        h.runtime.run_until_stalled();
        assert_eq!(h.invoker.call_count("list_apis"), 2);
    }

    #[test]
    fn test_delete_uses_listed_status() {
        let h = Harness::new();
        h.invoker.reply_ok("delete_api", json!({}));
        let dash = h.dashboard(&DeckConfig::default());
        dash.start();
        h.runtime.run_until_stalled();

        let prompt = ScriptedPrompt::new([true, true]);
        let outcome = futures::executor::block_on(dash.delete(&ApiId::from("llama"), &prompt));
        assert_eq!(
            outcome,
            ConfirmationOutcome::Confirmed(OperationOutcome::Completed)
        );
        assert_eq!(prompt.asked().len(), 2);
    }

    #[test]
    fn test_delete_without_confirmation() {
        let h = Harness::new();
        h.invoker.reply_ok("delete_api", json!({}));
        let config = DeckConfig {
            confirm: ConfirmConfig {
                delete: Some(false),
            },
            ..DeckConfig::default()
        };
        let dash = h.dashboard(&config);

        let prompt = ScriptedPrompt::default();
        let outcome = futures::executor::block_on(dash.delete(&ApiId::from("old"), &prompt));
        assert_eq!(
            outcome,
            ConfirmationOutcome::Confirmed(OperationOutcome::Completed)
        );
        assert!(prompt.asked().is_empty());
        assert_eq!(h.invoker.call_count("delete_api"), 1);
    }

    #[test]
    fn test_dispose_stops_every_timer() {
        let h = Harness::new();
        let dash = h.dashboard(&DeckConfig::default());
        dash.start();
        h.runtime.run_until_stalled();
        assert_eq!(h.runtime.active_timers(), 4);

        dash.dispose();
        assert_eq!(h.runtime.active_timers(), 0);
        h.runtime.advance(Duration::from_secs(30));
        assert_eq!(h.invoker.call_count("list_apis"), 1);
    }
}

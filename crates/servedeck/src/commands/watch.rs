use std::sync::Arc;

use chrono::Local;
use clap::ArgMatches;
use futures::StreamExt;
use futures::channel::mpsc;
use tracing::info;

use servedeck_core::{
    AlertRecord, ApiId, ApiSnapshot, ApiStatusView, Dashboard, EventHub, MetricSeries,
    PollContext, QueryView,
};

use super::helpers::{
    backend_runtime, connect_backend, is_valid_api_id, load_config_with_warning,
    spawn_progress_forwarder,
};
use super::metrics::metrics_table;
use crate::color;
use crate::table::{alert_table, api_table};

pub(crate) fn handle_watch_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let selected = matches.get_one::<String>("id").cloned();
    let limit = matches.get_one::<u64>("count").copied();

    if let Some(id) = &selected
        && !is_valid_api_id(id)
    {
        eprintln!("{}", color::error(&format!("Invalid API id: {}", id)));
        return Err("Invalid API id".into());
    }

    info!(event = "cli.watch_started", api_id = ?selected, limit = ?limit);

    let config = load_config_with_warning();
    let backend = connect_backend(&config)?;
    let (runtime, shared) = backend_runtime();
    let hub = EventHub::new();
    spawn_progress_forwarder(&runtime, &backend, &hub);

    let dashboard = Dashboard::new(
        &config,
        Arc::new(backend),
        Arc::new(hub),
        PollContext::new(shared),
    );

    let (changes, mut received) = mpsc::unbounded::<()>();
    dashboard.apis().on_change(move |view| {
        print_apis(view);
        let _ = changes.unbounded_send(());
    });
    dashboard.status().on_change(print_status);
    dashboard.metrics().on_change(print_metrics);
    dashboard.alerts().on_change(print_alerts);

    if limit.is_none() {
        println!("{}", color::muted("Watching. Press Ctrl+C to exit."));
    }

    let updates = runtime.block_on(async {
        dashboard.start();
        dashboard.select(selected.map(ApiId::from));

        let mut updates = 0u64;
        while received.next().await.is_some() {
            updates += 1;
            if limit.is_some_and(|limit| updates >= limit) {
                break;
            }
        }
        updates
    });

    dashboard.dispose();
    info!(event = "cli.watch_completed", updates = updates);
    Ok(())
}

fn stamp() -> String {
    color::muted(&Local::now().format("%H:%M:%S").to_string())
}

fn print_error(what: &str, error: Option<&str>) -> bool {
    match error {
        Some(message) => {
            eprintln!(
                "{} {}",
                stamp(),
                color::warning(&format!("{} unavailable: {}", what, message))
            );
            true
        }
        None => false,
    }
}

fn print_apis(view: &QueryView<Vec<ApiSnapshot>>) {
    if print_error("API list", view.error.as_deref()) {
        return;
    }
    let Some(apis) = &view.data else {
        return;
    };
    println!("{} {}", stamp(), color::bold(&format!("{} API(s)", apis.len())));
    if !apis.is_empty() {
        api_table(apis).print();
    }
}

fn print_status(view: &QueryView<ApiStatusView>) {
    if print_error("Status", view.error.as_deref()) {
        return;
    }
    if let Some(status) = &view.data {
        let listening = if status.is_listening {
            color::good("listening")
        } else {
            color::muted("not listening")
        };
        println!(
            "{} status: {} ({})",
            stamp(),
            color::status(status.status.as_str()),
            listening
        );
    }
}

fn print_metrics(view: &QueryView<MetricSeries>) {
    if print_error("Metrics", view.error.as_deref()) {
        return;
    }
    if let Some(series) = &view.data
        && !series.is_empty()
    {
        println!("{} metrics", stamp());
        metrics_table(series).print();
    }
}

fn print_alerts(view: &QueryView<Vec<AlertRecord>>) {
    if print_error("Alerts", view.error.as_deref()) {
        return;
    }
    let Some(alerts) = &view.data else {
        return;
    };
    if alerts.is_empty() {
        println!("{} {}", stamp(), color::good("no active alerts"));
    } else {
        println!("{} {}", stamp(), color::warning(&format!("{} alert(s)", alerts.len())));
        alert_table(alerts).print();
    }
}

use clap::ArgMatches;
use serde_json::Value;
use tracing::{error, info};

use servedeck_core::{CommandInvoker, DeckConfig, log_app_error};

mod alerts;
mod delete;
mod helpers;
mod lifecycle;
mod list;
mod metrics;
mod status;
mod watch;

pub fn run_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    info!(event = "cli.app_started", version = env!("CARGO_PKG_VERSION"));

    match matches.subcommand() {
        Some(("list", sub_matches)) => list::handle_list_command(sub_matches),
        Some(("status", sub_matches)) => status::handle_status_command(sub_matches),
        Some(("metrics", sub_matches)) => metrics::handle_metrics_command(sub_matches),
        Some(("alerts", sub_matches)) => alerts::handle_alerts_command(sub_matches),
        Some(("watch", sub_matches)) => watch::handle_watch_command(sub_matches),
        Some(("start", sub_matches)) => lifecycle::handle_start_command(sub_matches),
        Some(("stop", sub_matches)) => lifecycle::handle_stop_command(sub_matches),
        Some(("delete", sub_matches)) => delete::handle_delete_command(sub_matches),
        _ => {
            error!(event = "cli.command_unknown");
            Err("Unknown command".into())
        }
    }
}

/// Send one command to the backend and wait for its reply.
fn invoke_once(
    config: &DeckConfig,
    command: &str,
    params: Value,
) -> Result<Value, Box<dyn std::error::Error>> {
    let backend = helpers::connect_backend(config)?;
    smol::block_on(backend.invoke(command, params)).map_err(|e| {
        log_app_error(&e);
        e.into()
    })
}

use clap::ArgMatches;
use serde_json::json;
use tracing::{error, info};

use servedeck_core::normalize;
use servedeck_protocol::names::commands;

use super::helpers::{load_config_with_warning, print_json};
use super::invoke_once;
use crate::table::alert_table;

pub(crate) fn handle_alerts_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    let json_output = matches.get_flag("json");

    info!(event = "cli.alerts_started", json_output = json_output);

    let config = load_config_with_warning();
    let payload = match invoke_once(&config, commands::LIST_ALERTS, json!({})) {
        Ok(payload) => payload,
        Err(e) => {
            eprintln!("Could not list alerts: {}", e);
            error!(event = "cli.alerts_failed", error = %e);
            return Err(e);
        }
    };

    let alerts = normalize::alerts(&payload);
    if json_output {
        print_json(&alerts)?;
    } else if alerts.is_empty() {
        println!("No active alerts.");
    } else {
        alert_table(&alerts).print();
    }

    info!(event = "cli.alerts_completed", count = alerts.len());
    Ok(())
}

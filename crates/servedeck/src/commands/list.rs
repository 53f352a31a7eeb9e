use clap::ArgMatches;
use serde_json::json;
use tracing::{error, info};

use servedeck_core::normalize;
use servedeck_protocol::names::commands;

use super::helpers::{load_config_with_warning, print_json};
use super::invoke_once;
use crate::table::api_table;

pub(crate) fn handle_list_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let json_output = matches.get_flag("json");

    info!(event = "cli.list_started", json_output = json_output);

    let config = load_config_with_warning();
    let payload = match invoke_once(&config, commands::LIST_APIS, json!({})) {
        Ok(payload) => payload,
        Err(e) => {
            eprintln!("Could not list APIs: {}", e);
            error!(event = "cli.list_failed", error = %e);
            return Err(e);
        }
    };

    let apis = normalize::api_list(&payload);
    if json_output {
        print_json(&apis)?;
    } else if apis.is_empty() {
        println!("No APIs found.");
    } else {
        api_table(&apis).print();
    }

    info!(event = "cli.list_completed", count = apis.len());
    Ok(())
}

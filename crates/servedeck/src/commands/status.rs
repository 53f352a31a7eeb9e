use clap::ArgMatches;
use serde_json::json;
use tracing::{error, info};

use servedeck_core::normalize;
use servedeck_protocol::names::commands;

use super::helpers::{api_id_arg, load_config_with_warning, print_json, unexpected_payload};
use super::invoke_once;
use crate::color;

pub(crate) fn handle_status_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = api_id_arg(matches)?;
    let json_output = matches.get_flag("json");

    info!(event = "cli.status_started", api_id = %id, json_output = json_output);

    let config = load_config_with_warning();
    let payload = match invoke_once(&config, commands::GET_API_STATUS, json!({ "id": id })) {
        Ok(payload) => payload,
        Err(e) => {
            eprintln!("Could not get status of '{}': {}", id, e);
            error!(event = "cli.status_failed", api_id = %id, error = %e);
            return Err(e);
        }
    };

    let Some(view) = normalize::api_status(&payload) else {
        let message = unexpected_payload(commands::GET_API_STATUS, &payload);
        eprintln!("{}", color::error(&message));
        error!(event = "cli.status_failed", api_id = %id, error = %message);
        return Err(message.into());
    };

    if json_output {
        print_json(&view)?;
    } else {
        let listening = if view.is_listening {
            color::good("listening")
        } else {
            color::muted("not listening")
        };
        println!(
            "{}: {} ({})",
            color::accent(id.as_str()),
            color::status(view.status.as_str()),
            listening
        );
    }

    info!(event = "cli.status_completed", api_id = %id, status = %view.status);
    Ok(())
}

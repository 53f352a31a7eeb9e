use std::sync::Arc;

use clap::ArgMatches;
use serde_json::json;
use tracing::{info, warn};

use servedeck_core::{
    ApiActions, ApiId, ApiStatus, CommandInvoker, ConfirmationOutcome, EventHub, IpcBackend,
    OperationKind, normalize,
};
use servedeck_protocol::names::commands;

use super::helpers::{
    StdinPrompt, api_id_arg, backend_runtime, connect_backend, load_config_with_warning,
    spawn_progress_forwarder,
};
use super::lifecycle::{print_progress, report_outcome};

pub(crate) fn handle_delete_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = api_id_arg(matches)?;
    let skip_prompts = matches.get_flag("yes");

    info!(event = "cli.delete_started", api_id = %id, skip_prompts = skip_prompts);

    let config = load_config_with_warning();
    let backend = connect_backend(&config)?;
    let (runtime, shared) = backend_runtime();
    let hub = EventHub::new();
    spawn_progress_forwarder(&runtime, &backend, &hub);

    let prompt = !skip_prompts && config.confirm_delete();
    let status = if prompt {
        runtime.block_on(current_status(&backend, &id))
    } else {
        None
    };

    let actions = ApiActions::new(Arc::new(backend), Arc::new(hub.clone()), shared);
    let _progress = print_progress(&hub, &id);

    let outcome = if prompt {
        match runtime.block_on(actions.delete(&id, status, &StdinPrompt)) {
            ConfirmationOutcome::Confirmed(outcome) => outcome,
            ConfirmationOutcome::Cancelled { step } => {
                println!("Aborted.");
                info!(event = "cli.delete_aborted", api_id = %id, step = step);
                return Ok(());
            }
        }
    } else {
        runtime.block_on(actions.run(&id, OperationKind::Delete))
    };

    report_outcome(&id, OperationKind::Delete, outcome)
}

/// Best-effort status lookup so a running API gets the extra prompt.
async fn current_status(backend: &IpcBackend, id: &ApiId) -> Option<ApiStatus> {
    match backend
        .invoke(commands::GET_API_STATUS, json!({ "id": id }))
        .await
    {
        Ok(payload) => normalize::api_status(&payload).map(|view| view.status),
        Err(e) => {
            warn!(event = "cli.delete_status_unknown", api_id = %id, error = %e);
            None
        }
    }
}

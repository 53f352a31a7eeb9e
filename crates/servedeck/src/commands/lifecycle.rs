use std::sync::Arc;

use clap::ArgMatches;
use serde_json::Value;
use tracing::{error, info};

use servedeck_core::ports::EventHandler;
use servedeck_core::{
    ApiActions, ApiId, EventHub, EventSource, OperationKind, OperationOutcome, ProgressEvent,
    Subscription,
};
use servedeck_protocol::names::events::API_OPERATION_PROGRESS;

use super::helpers::{
    api_id_arg, backend_runtime, connect_backend, load_config_with_warning,
    spawn_progress_forwarder,
};
use crate::color;

pub(crate) fn handle_start_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    run_operation(matches, OperationKind::Start)
}

pub(crate) fn handle_stop_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    run_operation(matches, OperationKind::Stop)
}

fn run_operation(
    matches: &ArgMatches,
    kind: OperationKind,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = api_id_arg(matches)?;

    info!(event = "cli.operation_started", api_id = %id, operation = %kind);

    let config = load_config_with_warning();
    let backend = connect_backend(&config)?;
    let (runtime, shared) = backend_runtime();
    let hub = EventHub::new();
    spawn_progress_forwarder(&runtime, &backend, &hub);

    let actions = ApiActions::new(Arc::new(backend), Arc::new(hub.clone()), shared);
    let _progress = print_progress(&hub, &id);
    let outcome = runtime.block_on(actions.run(&id, kind));

    report_outcome(&id, kind, outcome)
}

/// Print each progress step for `id` while the returned subscription lives.
pub(super) fn print_progress(hub: &EventHub, id: &ApiId) -> Subscription {
    let id = id.clone();
    let handler: EventHandler = Arc::new(move |payload: &Value| {
        if let Ok(event) = serde_json::from_value::<ProgressEvent>(payload.clone())
            && event.api_id == id
        {
            println!(
                "  {} {}",
                color::muted(&format!("[{:>3.0}%]", event.progress.clamp(0.0, 100.0))),
                event.step
            );
        }
    });
    hub.subscribe(API_OPERATION_PROGRESS, handler)
}

pub(super) fn report_outcome(
    id: &ApiId,
    kind: OperationKind,
    outcome: OperationOutcome,
) -> Result<(), Box<dyn std::error::Error>> {
    match outcome {
        OperationOutcome::Completed => {
            println!("{} {}", past_tense(kind), color::accent(id.as_str()));
            info!(event = "cli.operation_completed", api_id = %id, operation = %kind);
            Ok(())
        }
        OperationOutcome::AlreadyInProgress => {
            eprintln!(
                "{}",
                color::warning(&format!("Another operation on '{}' is still running.", id))
            );
            info!(event = "cli.operation_skipped", api_id = %id, operation = %kind);
            Err("Operation already in progress".into())
        }
        OperationOutcome::Failed(message) => {
            eprintln!(
                "{}",
                color::error(&format!("Could not {} '{}': {}", kind, id, message))
            );
            error!(
                event = "cli.operation_failed",
                api_id = %id,
                operation = %kind,
                error = %message
            );
            Err(message.into())
        }
    }
}

fn past_tense(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::Start => "Started",
        OperationKind::Stop => "Stopped",
        OperationKind::Delete => "Deleted",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_outcome_is_error() {
        let result = report_outcome(
            &ApiId::from("llama"),
            OperationKind::Start,
            OperationOutcome::Failed("port in use".to_string()),
        );
        assert_eq!(result.unwrap_err().to_string(), "port in use");
    }

    #[test]
    fn test_completed_outcome_is_ok() {
        let result = report_outcome(
            &ApiId::from("llama"),
            OperationKind::Stop,
            OperationOutcome::Completed,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_progress_subscription_is_scoped() {
        let hub = EventHub::new();
        let sub = print_progress(&hub, &ApiId::from("llama"));
        assert_eq!(hub.handler_count(API_OPERATION_PROGRESS), 1);
        drop(sub);
        assert_eq!(hub.handler_count(API_OPERATION_PROGRESS), 0);
    }
}

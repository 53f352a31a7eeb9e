use std::io::{self, Write};
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, warn};

use servedeck_core::{
    ApiId, ConfirmPrompt, DeckConfig, EventHub, IpcBackend, Runtime, SmolRuntime, forward_events,
};
use servedeck_paths::DeckPaths;
use servedeck_protocol::names::events::API_OPERATION_PROGRESS;

use crate::color;

/// Load configuration with warning on errors.
///
/// Falls back to defaults when loading or validation fails, and tells the
/// user on stderr plus a `cli.config.load_failed` event.
pub fn load_config_with_warning() -> DeckConfig {
    let loaded = DeckConfig::load_hierarchy().and_then(|config| {
        config.validate()?;
        Ok(config)
    });
    match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "{}",
                color::warning(&format!(
                    "Warning: Could not load config: {}. Using defaults.",
                    e
                ))
            );
            eprintln!(
                "{}",
                color::hint(
                    "Tip: Check ~/.servedeck/config.toml and ./.servedeck/config.toml for errors."
                )
            );
            warn!(
                event = "cli.config.load_failed",
                error = %e,
                "Config load failed, using defaults"
            );
            DeckConfig::default()
        }
    }
}

/// Backend adapter for the configured socket.
pub fn connect_backend(config: &DeckConfig) -> Result<IpcBackend, Box<dyn std::error::Error>> {
    let paths = DeckPaths::resolve()?;
    let socket = config.socket_path(&paths);
    debug!(event = "cli.backend.socket_resolved", path = %socket.display());
    Ok(IpcBackend::new(socket))
}

/// Forward backend progress events into `hub` on `runtime` until the
/// backend closes the stream. A backend without event support only loses
/// progress output.
pub fn spawn_progress_forwarder(runtime: &SmolRuntime, backend: &IpcBackend, hub: &EventHub) {
    let client = backend.client().clone();
    let hub = hub.clone();
    runtime.spawn(Box::pin(async move {
        if let Err(e) =
            forward_events(client, hub, vec![API_OPERATION_PROGRESS.to_string()]).await
        {
            debug!(event = "cli.events.forward_failed", error = %e);
        }
    }));
}

/// Validate an API id before sending it anywhere.
pub fn is_valid_api_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
}

/// Parse the positional `id` argument.
pub fn api_id_arg(matches: &clap::ArgMatches) -> Result<ApiId, Box<dyn std::error::Error>> {
    let id = matches
        .get_one::<String>("id")
        .ok_or("API id argument is required")?;
    if !is_valid_api_id(id) {
        eprintln!("{}", color::error(&format!("Invalid API id: {}", id)));
        return Err("Invalid API id".into());
    }
    Ok(ApiId::from(id.as_str()))
}

/// Check if user confirmation input indicates acceptance.
/// Accepts "y" or "yes" (case-insensitive).
pub fn is_confirmation_accepted(input: &str) -> bool {
    let normalized = input.trim().to_lowercase();
    normalized == "y" || normalized == "yes"
}

/// [`ConfirmPrompt`] on the controlling terminal.
pub struct StdinPrompt;

impl ConfirmPrompt for StdinPrompt {
    fn ask(&self, message: &str) -> BoxFuture<'static, bool> {
        let message = message.to_string();
        Box::pin(smol::unblock(move || {
            print!("{} [y/N] ", message);
            if io::stdout().flush().is_err() {
                return false;
            }
            let mut input = String::new();
            match io::stdin().read_line(&mut input) {
                Ok(_) => is_confirmation_accepted(&input),
                Err(e) => {
                    warn!(event = "cli.prompt.read_failed", error = %e);
                    false
                }
            }
        }))
    }
}

/// Pretty JSON on stdout.
pub fn print_json(value: &impl serde::Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Describe a payload the core could not read.
pub fn unexpected_payload(command: &str, payload: &Value) -> String {
    let preview: String = payload.to_string().chars().take(80).collect();
    format!("unexpected {} response: {}", command, preview)
}

pub fn backend_runtime() -> (SmolRuntime, Arc<dyn Runtime>) {
    let runtime = SmolRuntime::new();
    let shared: Arc<dyn Runtime> = Arc::new(runtime.clone());
    (runtime, shared)
}

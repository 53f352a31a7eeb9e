//! servedeck-core: client-side state for a dashboard of LLM-serving APIs
//!
//! Keeps periodically polled views of a backend in sync, serializes
//! start/stop/delete per API, and gates destructive actions behind
//! confirmation prompts. Used by the CLI; any other front end plugs in
//! through the ports in [`ports`] and [`runtime`].
//!
//! # Main Entry Points
//!
//! - [`dashboard`] - The four standard queries plus actions, built from config
//! - [`query`] - Polled, staleness-guarded views of one backend command
//! - [`actions`] - Locked mutating operations with progress tracking
//! - [`poll`] - Interval scheduling with throttle and visibility gates
//! - [`ipc`] - Unix socket adapters for the backend

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod actions;
pub mod clock;
pub mod confirm;
pub mod dashboard;
pub mod errors;
pub mod events;
pub mod ipc;
pub mod logging;
pub mod normalize;
pub mod operations;
pub mod poll;
pub mod ports;
pub mod query;
pub mod runtime;
pub mod staleness;
pub mod status;
pub mod testing;
pub mod throttle;

// Re-export shared wire types from servedeck-protocol
pub use servedeck_protocol::{
    AlertLevel, AlertRecord, ApiId, ApiSnapshot, ApiStatus, MetricPoint, OperationKind,
    ProgressEvent,
};

// Re-export config types from servedeck-config
pub use servedeck_config::{ConfigError, DeckConfig};

pub use actions::{ApiActions, OperationOutcome};
pub use confirm::{ConfirmPrompt, ConfirmationOutcome, ConfirmationSequence, ConfirmationStep};
pub use dashboard::Dashboard;
pub use errors::{DeckError, InvokeError, log_app_error};
pub use events::EventHub;
pub use ipc::{IpcBackend, forward_events};
pub use normalize::{ApiStatusView, MetricSeries};
pub use operations::{OperationErrors, OperationSnapshot, OperationTracker};
pub use poll::{PollContext, PollOptions, PollPhase, PollScheduler, PollTrigger};
pub use ports::{CommandInvoker, EventSource, Subscription, VisibilitySource};
pub use query::SyncedQuery;
pub use runtime::{Runtime, SmolRuntime};
pub use status::QueryView;

// Re-export logging initialization
pub use logging::init_logging;

/// Lock `mutex`, recovering the data if a panicking holder poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

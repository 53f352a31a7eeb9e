use std::error::Error;

use servedeck_config::ConfigError;
use servedeck_paths::PathError;
use servedeck_protocol::IpcError;
use tracing::{error, warn};

/// Base trait for all application errors
pub trait DeckError: Error + Send + Sync + 'static {
    /// Error code for programmatic handling
    fn error_code(&self) -> &'static str;

    /// Whether this error should be logged as an error or warning
    fn is_user_error(&self) -> bool {
        false
    }
}

/// Failure of a backend command as seen by the core.
///
/// `Display` is the human-readable message recorded in query and operation
/// error state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvokeError {
    /// The backend received the command and refused it.
    #[error("{message}")]
    Rejected {
        command: String,
        code: String,
        message: String,
    },

    /// No backend is reachable.
    #[error("backend unavailable: {message}")]
    Unavailable { message: String },

    /// The request was sent but the exchange broke down.
    #[error("{command} failed: {message}")]
    Transport { command: String, message: String },
}

impl InvokeError {
    pub fn rejected(command: &str, message: impl Into<String>) -> Self {
        InvokeError::Rejected {
            command: command.to_string(),
            code: "operation_failed".to_string(),
            message: message.into(),
        }
    }

    /// Map an IPC failure for `command` onto the invocation error surface.
    pub fn from_ipc(command: &str, err: IpcError) -> Self {
        match err {
            IpcError::NotRunning { .. } | IpcError::Connect(_) => InvokeError::Unavailable {
                message: err.to_string(),
            },
            IpcError::BackendError { code, message } => InvokeError::Rejected {
                command: command.to_string(),
                code: code.to_string(),
                message,
            },
            other => InvokeError::Transport {
                command: command.to_string(),
                message: other.to_string(),
            },
        }
    }
}

impl DeckError for InvokeError {
    fn error_code(&self) -> &'static str {
        match self {
            InvokeError::Rejected { .. } => "COMMAND_REJECTED",
            InvokeError::Unavailable { .. } => "BACKEND_UNAVAILABLE",
            InvokeError::Transport { .. } => "COMMAND_TRANSPORT_FAILED",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(
            self,
            InvokeError::Rejected { .. } | InvokeError::Unavailable { .. }
        )
    }
}

impl DeckError for IpcError {
    fn error_code(&self) -> &'static str {
        match self {
            IpcError::NotRunning { .. } => "BACKEND_NOT_RUNNING",
            IpcError::Connect(_) => "IPC_CONNECT_FAILED",
            IpcError::Serialize(_) => "IPC_SERIALIZE_FAILED",
            IpcError::Io(_) => "IPC_IO_ERROR",
            IpcError::ConnectionClosed => "IPC_CONNECTION_CLOSED",
            IpcError::EmptyResponse => "IPC_EMPTY_RESPONSE",
            IpcError::InvalidJson { .. } => "IPC_INVALID_JSON",
            IpcError::BackendError { .. } => "BACKEND_ERROR",
            IpcError::UnexpectedResponse(_) => "IPC_UNEXPECTED_RESPONSE",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(
            self,
            IpcError::NotRunning { .. } | IpcError::BackendError { .. }
        )
    }
}

impl DeckError for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            ConfigError::ConfigParseError { .. } => "CONFIG_PARSE_ERROR",
            ConfigError::InvalidConfiguration { .. } => "INVALID_CONFIGURATION",
            ConfigError::IoError { .. } => "CONFIG_IO_ERROR",
            ConfigError::Paths(_) => "CONFIG_PATH_ERROR",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(
            self,
            ConfigError::ConfigParseError { .. } | ConfigError::InvalidConfiguration { .. }
        )
    }
}

impl DeckError for PathError {
    fn error_code(&self) -> &'static str {
        match self {
            PathError::HomeNotFound => "HOME_NOT_FOUND",
        }
    }

    fn is_user_error(&self) -> bool {
        true
    }
}

/// Log an application error at `warn` for user errors, `error` otherwise.
pub fn log_app_error(err: &dyn DeckError) {
    if err.is_user_error() {
        warn!(
            event = "core.app.error_occurred",
            error_code = err.error_code(),
            error = %err,
        );
    } else {
        error!(
            event = "core.app.error_occurred",
            error_code = err.error_code(),
            error = %err,
        );
    }
}

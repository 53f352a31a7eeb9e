//! Backend command and push-event names.

pub mod commands {
    pub const LIST_APIS: &str = "list_apis";
    pub const GET_API_STATUS: &str = "get_api_status";
    pub const GET_API_METRICS: &str = "get_api_metrics";
    pub const LIST_ALERTS: &str = "list_alerts";
    pub const START_API: &str = "start_api";
    pub const STOP_API: &str = "stop_api";
    pub const DELETE_API: &str = "delete_api";
}

pub mod events {
    /// Payload: [`crate::ProgressEvent`].
    pub const API_OPERATION_PROGRESS: &str = "api_operation_progress";
}

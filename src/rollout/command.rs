// ABOUTME: Command request/response value objects exchanged with the remote worker.
// ABOUTME: Wire format is the dispatch layer's concern; these are the in-core shapes.

use serde::{Deserialize, Serialize};

use crate::context::{ApplicationDetails, InstanceDetail};
use crate::types::{AccountId, AppId, CorrelationToken};

/// What the remote worker is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandKind {
    /// Create or update the new application from the manifest package.
    Setup,
    /// Scale the new application up and the old one down.
    Resize,
    /// Swap traffic routes between old and new applications.
    UpdateRoutes,
}

/// One unit of work handed to the dispatch interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub account_id: AccountId,
    pub app_id: AppId,
    pub kind: CommandKind,
    pub correlation: CorrelationToken,
    pub timeout_minutes: u32,
    pub payload: CommandPayload,
}

/// Command-specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommandPayload {
    Setup(SetupCommand),
    Resize(ResizeCommand),
    UpdateRoutes(RouteSwapConfig),
}

/// Parameters of a create/update-application command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupCommand {
    pub release_name_prefix: String,
    pub manifest_yaml: String,
    #[serde(default)]
    pub variable_yamls: Vec<String>,
    #[serde(default)]
    pub route_maps: Vec<String>,
    pub max_count: i32,
    pub use_current_running_count: bool,
    #[serde(default)]
    pub current_running_count: Option<i32>,
    pub older_versions_to_keep: u32,
}

/// Parameters of a resize command: both counts plus the previous total so the
/// worker can report deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResizeCommand {
    pub application_name: String,
    pub upsize_count: i32,
    pub downsize_count: i32,
    pub total_previous_instance_count: i32,
    #[serde(default)]
    pub downsize_app_details: Vec<ApplicationDetails>,
}

/// Parameters of a route-swap command, forward or rollback.
///
/// Built fresh on every invocation: forward swaps derive it from the current
/// setup context, rollbacks restore it from the persisted swap record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteSwapConfig {
    pub new_application_name: String,
    #[serde(default)]
    pub existing_application_names: Vec<String>,
    #[serde(default)]
    pub existing_application_details: Vec<ApplicationDetails>,
    #[serde(default)]
    pub temp_routes: Vec<String>,
    #[serde(default)]
    pub final_routes: Vec<String>,
    pub is_rollback: bool,
    pub downsize_old_application: bool,
    pub skip_rollback: bool,
}

/// Terminal status reported by the worker for one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandStatus {
    Success,
    Failure,
}

/// The correlated asynchronous response for one dispatched command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub status: CommandStatus,
    #[serde(default)]
    pub error_message: Option<String>,
    pub payload: ResponsePayload,
}

impl CommandResponse {
    pub fn success(payload: ResponsePayload) -> Self {
        Self {
            status: CommandStatus::Success,
            error_message: None,
            payload,
        }
    }

    pub fn failure(message: impl Into<String>, payload: ResponsePayload) -> Self {
        Self {
            status: CommandStatus::Failure,
            error_message: Some(message.into()),
            payload,
        }
    }
}

/// Command-specific result fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResponsePayload {
    Setup(SetupResult),
    Resize(ResizeResult),
    UpdateRoutes,
}

/// Result of a setup command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetupResult {
    pub new_application: ApplicationDetails,
    #[serde(default)]
    pub downsize_details: Vec<ApplicationDetails>,
    pub total_previous_instance_count: i32,
}

/// Result of a resize command: the updated instance list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResizeResult {
    #[serde(default)]
    pub instances: Vec<InstanceDetail>,
}

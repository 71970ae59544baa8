// ABOUTME: Typed phase-output payloads and their context-store naming scheme.
// ABOUTME: SetupOutput is produced by Setup and consumed by every later state.

use serde::{Deserialize, Serialize};

/// Name prefixes for phase-keyed outputs. The producing phase's trimmed name
/// is appended so that parallel phases never collide.
pub const SETUP_OUTPUT_PREFIX: &str = "rolloutSetup-";
pub const DEPLOY_OUTPUT_PREFIX: &str = "rolloutDeploy-";

/// Workflow-visible route/application variables, written once by the first
/// successful Setup and refreshed by a successful forward route swap.
pub const ROUTE_STATE_OUTPUT_NAME: &str = "rolloutInfo";

pub fn setup_output_name(phase_name: &str) -> String {
    format!("{SETUP_OUTPUT_PREFIX}{}", phase_name.trim())
}

pub fn deploy_output_name(phase_name: &str) -> String {
    format!("{DEPLOY_OUTPUT_PREFIX}{}", phase_name.trim())
}

/// Worker-reported details of one application on the target platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationDetails {
    pub application_name: String,
    #[serde(default)]
    pub application_guid: Option<String>,
    #[serde(default)]
    pub urls: Vec<String>,
}

/// Everything the Setup state learned, persisted for later steps and phases.
///
/// Created exactly once per phase's Setup step and never mutated afterwards.
/// A default (zero-value) instance means "no setup ran for this phase" —
/// callers treat that as nothing to act on, not as an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetupOutput {
    pub max_instance_count: i32,
    pub use_current_running_instance_count: bool,
    pub current_running_instance_count: i32,
    #[serde(default)]
    pub route_maps: Vec<String>,
    #[serde(default)]
    pub temp_route_maps: Vec<String>,
    pub use_temp_routes: bool,
    #[serde(default)]
    pub app_details_to_be_downsized: Vec<ApplicationDetails>,
    #[serde(default)]
    pub timeout_interval_minutes: Option<u32>,
    #[serde(default)]
    pub new_application_details: Option<ApplicationDetails>,
    pub total_previous_instance_count: i32,
}

impl SetupOutput {
    /// True when no setup data exists (the zero value).
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The route list the new application was bound to during setup.
    pub fn active_routes(&self) -> &[String] {
        if self.use_temp_routes {
            &self.temp_route_maps
        } else {
            &self.route_maps
        }
    }
}

/// One application instance as reported by a resize response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceDetail {
    pub application_name: String,
    pub instance_index: String,
    pub new_instance: bool,
}

impl InstanceDetail {
    /// Host-style display name, `app-name:index`.
    pub fn host_name(&self) -> String {
        format!("{}:{}", self.application_name, self.instance_index)
    }
}

/// Route/application state exposed to workflow notification and expressions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteStateVariables {
    #[serde(default)]
    pub new_application_name: Option<String>,
    #[serde(default)]
    pub new_application_routes: Vec<String>,
    #[serde(default)]
    pub old_application_names: Vec<String>,
}

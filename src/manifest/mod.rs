// ABOUTME: Deployment-manifest templating: package type, constants, and resolution ops.
// ABOUTME: Handles YAML parsing, ((var)) substitution, and deprecated placeholder literals.

mod application;
mod error;
mod template;

pub use application::{
    ApplicationBlock, resolve_application_name, resolve_instance_count, resolve_routes,
    substitute_route_placeholders,
};
pub use error::ManifestError;
pub use template::{has_placeholder, resolve_placeholders};

use serde::{Deserialize, Serialize};

pub const APPLICATIONS_ELEMENT: &str = "applications";
pub const NAME_ELEMENT: &str = "name";
pub const INSTANCES_ELEMENT: &str = "instances";
pub const ROUTES_ELEMENT: &str = "routes";
pub const ROUTE_ELEMENT: &str = "route";
pub const NO_ROUTE_ELEMENT: &str = "no-route";

/// Literals left behind by older manifest templates. They read as "take the
/// value from state/infrastructure configuration instead of the manifest".
pub const LEGACY_NAME_PLACEHOLDER: &str = "${APPLICATION_NAME}";
pub const DEPRECATED_ROUTE_PLACEHOLDER: &str = "${ROUTE_MAP}";
pub const DEPRECATED_INSTANCE_PLACEHOLDER: &str = "${INSTANCE_COUNT}";

/// The manifest documents assembled for one setup phase.
///
/// The application manifest is mandatory; variable documents cascade in
/// order (later files override earlier ones during substitution).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestPackage {
    pub manifest_yaml: String,
    #[serde(default)]
    pub variable_yamls: Vec<String>,
    #[serde(default)]
    pub autoscaler_yaml: Option<String>,
}

impl ManifestPackage {
    /// Parse the first application block of the manifest document.
    pub fn application_block(&self) -> Result<ApplicationBlock, ManifestError> {
        ApplicationBlock::parse(&self.manifest_yaml)
    }
}

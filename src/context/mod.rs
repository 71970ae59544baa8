// ABOUTME: Scoped key/value store for passing data between workflow phases.
// ABOUTME: Defines the ContextStore trait, scopes, and typed read/write helpers.

mod fallback;
mod memory;
mod output;

pub use fallback::{PhaseRecord, find_setup_output};
pub use memory::InMemoryContextStore;
pub use output::{
    ApplicationDetails, DEPLOY_OUTPUT_PREFIX, InstanceDetail, ROUTE_STATE_OUTPUT_NAME,
    RouteStateVariables, SETUP_OUTPUT_PREFIX, SetupOutput, deploy_output_name, setup_output_name,
};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::types::WorkflowExecutionId;

/// Visibility of a context entry within one workflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
pub enum Scope {
    /// Visible to every phase of the execution.
    Workflow,
    /// Visible within the producing phase.
    Phase,
}

/// Errors from context-store operations.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("context store backend error: {0}")]
    Backend(String),

    #[error("context value '{name}' failed to encode: {source}")]
    Encode {
        name: String,
        source: serde_json::Error,
    },

    #[error("context value '{name}' has unexpected shape: {source}")]
    Decode {
        name: String,
        source: serde_json::Error,
    },
}

/// Backing store for phase context, keyed by `(execution, scope, name)`.
///
/// Each workflow execution owns a disjoint key space and phases run strictly
/// sequentially, so implementations need no cross-entry coordination.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Store a value. Overwrites any existing entry under the same key.
    async fn put(
        &self,
        execution: &WorkflowExecutionId,
        scope: Scope,
        name: &str,
        value: serde_json::Value,
    ) -> Result<(), ContextError>;

    /// Point lookup of a value.
    async fn get(
        &self,
        execution: &WorkflowExecutionId,
        scope: Scope,
        name: &str,
    ) -> Result<Option<serde_json::Value>, ContextError>;
}

/// Look a name up in the phase scope first, then the workflow scope.
pub async fn find_output(
    store: &dyn ContextStore,
    execution: &WorkflowExecutionId,
    name: &str,
) -> Result<Option<serde_json::Value>, ContextError> {
    if let Some(value) = store.get(execution, Scope::Phase, name).await? {
        return Ok(Some(value));
    }
    store.get(execution, Scope::Workflow, name).await
}

/// Typed variant of [`find_output`].
pub async fn read_output<T: DeserializeOwned>(
    store: &dyn ContextStore,
    execution: &WorkflowExecutionId,
    name: &str,
) -> Result<Option<T>, ContextError> {
    match find_output(store, execution, name).await? {
        None => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|source| ContextError::Decode {
                name: name.to_string(),
                source,
            }),
    }
}

/// Serialize and store a typed output value.
pub async fn write_output<T: Serialize>(
    store: &dyn ContextStore,
    execution: &WorkflowExecutionId,
    scope: Scope,
    name: &str,
    value: &T,
) -> Result<(), ContextError> {
    let value = serde_json::to_value(value).map_err(|source| ContextError::Encode {
        name: name.to_string(),
        source,
    })?;
    store.put(execution, scope, name, value).await
}

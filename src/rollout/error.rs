// ABOUTME: Unified rollout error with SNAFU pattern.
// ABOUTME: Wraps manifest, context, dispatch, and infra failures for one surface.

use snafu::Snafu;

use crate::context::ContextError;
use crate::manifest::ManifestError;

use super::dispatch::DispatchError;
use super::infra::InfraError;

/// Unified error for rollout-state execution and response handling.
///
/// Every variant is raised synchronously, before or instead of a dispatch;
/// remote command failures travel through `StateOutcome` instead.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RolloutError {
    #[snafu(display("manifest error: {source}"))]
    Manifest { source: ManifestError },

    #[snafu(display("context store error: {source}"))]
    Context { source: ContextError },

    #[snafu(display("dispatch error: {source}"))]
    Dispatch { source: DispatchError },

    #[snafu(display("infrastructure config error: {source}"))]
    Infrastructure { source: InfraError },

    #[snafu(display("application manifest is missing or empty for this service"))]
    MissingManifest,

    #[snafu(display("no setup context found for phase '{phase}'"))]
    MissingSetupContext { phase: String },

    #[snafu(display("maximum instance count must be populated and non-negative"))]
    InvalidInstanceConfiguration,

    #[snafu(display("active versions to keep must be greater than zero"))]
    InvalidKeepVersions,

    #[snafu(display("expected exactly one correlated response, got {count}"))]
    UnexpectedResponseShape { count: usize },

    #[snafu(display("phase-state data or response payload does not match this state kind"))]
    StateDataMismatch,
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloutErrorKind {
    /// A manifest or variable document failed validation.
    Manifest,
    /// The context store rejected a read or write.
    ContextStore,
    /// The command could not be handed to a worker.
    Dispatch,
    /// Infrastructure configuration could not be read or updated.
    Infrastructure,
    /// A precondition of the state failed before any dispatch.
    Validation,
    /// The response map or phase-state data had the wrong shape.
    Protocol,
}

impl RolloutError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> RolloutErrorKind {
        match self {
            RolloutError::Manifest { .. } => RolloutErrorKind::Manifest,
            RolloutError::Context { .. } => RolloutErrorKind::ContextStore,
            RolloutError::Dispatch { .. } => RolloutErrorKind::Dispatch,
            RolloutError::Infrastructure { .. } => RolloutErrorKind::Infrastructure,
            RolloutError::MissingManifest
            | RolloutError::MissingSetupContext { .. }
            | RolloutError::InvalidInstanceConfiguration
            | RolloutError::InvalidKeepVersions => RolloutErrorKind::Validation,
            RolloutError::UnexpectedResponseShape { .. } | RolloutError::StateDataMismatch => {
                RolloutErrorKind::Protocol
            }
        }
    }
}

impl From<ManifestError> for RolloutError {
    fn from(source: ManifestError) -> Self {
        RolloutError::Manifest { source }
    }
}

impl From<ContextError> for RolloutError {
    fn from(source: ContextError) -> Self {
        RolloutError::Context { source }
    }
}

impl From<DispatchError> for RolloutError {
    fn from(source: DispatchError) -> Self {
        RolloutError::Dispatch { source }
    }
}

impl From<InfraError> for RolloutError {
    fn from(source: InfraError) -> Self {
        RolloutError::Infrastructure { source }
    }
}

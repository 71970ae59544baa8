// ABOUTME: RolloutState trait, execution context, and immutable outcome values.
// ABOUTME: States dispatch a command, suspend, and later interpret the response.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::{ContextStore, InstanceDetail, PhaseRecord, Scope, SetupOutput};
use crate::manifest::{ManifestError, ManifestPackage};
use crate::types::{AccountId, AppId, CorrelationToken, StateExecutionId, WorkflowExecutionId};

use super::command::{CommandResponse, RouteSwapConfig};
use super::dispatch::Dispatcher;
use super::error::RolloutError;
use super::infra::InfrastructureConfig;
use super::resize::ResizeStateData;
use super::setup::SetupStateData;
use super::swap::SwapStateData;

/// The four states of one rollout phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateKind {
    Setup,
    Resize,
    SwapRoutes,
    SwapRoutesRollback,
}

/// Terminal status of one state invocation, as reported to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Success,
    Failed,
    /// The state decided there was nothing to do. Normal outcome, not a
    /// failure — e.g. rollback with no prior forward swap.
    Skipped,
}

/// Supplies the assembled manifest documents for a setup phase. Fetching from
/// git/Helm/local sources happens behind this seam.
#[async_trait]
pub trait ManifestSource: Send + Sync {
    async fn fetch_package(&self) -> Result<ManifestPackage, ManifestError>;
}

/// Everything a state needs from the engine for one invocation.
///
/// The identity fields pin the invocation to one phase of one workflow
/// execution; the trait objects are the external collaborators.
pub struct ExecutionContext<'a> {
    pub account_id: &'a AccountId,
    pub app_id: &'a AppId,
    pub workflow_execution_id: &'a WorkflowExecutionId,
    pub state_execution_id: &'a StateExecutionId,
    /// Name of the phase this state runs in.
    pub phase_name: &'a str,
    /// Name of the forward phase a rollback state addresses. Equals
    /// `phase_name` outside rollback.
    pub phase_name_for_rollback: &'a str,
    /// Phases of this execution in order; rollback phases share the record
    /// of the phase they roll back.
    pub phases: &'a [PhaseRecord],
    /// Multi-service workflows keep phase outputs phase-scoped so sibling
    /// phases do not observe each other's state.
    pub multi_service: bool,
    /// Fallback application name (conventionally app__service__env).
    pub default_application_name: &'a str,
    pub dispatcher: &'a dyn Dispatcher,
    pub store: &'a dyn ContextStore,
    pub infra: &'a dyn InfrastructureConfig,
    pub manifests: &'a dyn ManifestSource,
}

impl ExecutionContext<'_> {
    /// Scope for outputs produced by this phase.
    pub fn output_scope(&self) -> Scope {
        if self.multi_service {
            Scope::Phase
        } else {
            Scope::Workflow
        }
    }

    /// Phase name to address context entries with.
    pub fn lookup_phase_name(&self, is_rollback: bool) -> &str {
        if is_rollback {
            self.phase_name_for_rollback
        } else {
            self.phase_name
        }
    }
}

/// Audit-record update for the command tagged by `token`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityUpdate {
    pub token: CorrelationToken,
    pub status: ExecutionStatus,
    #[serde(default)]
    pub error_message: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl ActivityUpdate {
    pub fn new(
        token: CorrelationToken,
        status: ExecutionStatus,
        error_message: Option<String>,
    ) -> Self {
        Self {
            token,
            status,
            error_message,
            completed_at: Utc::now(),
        }
    }
}

/// Output objects a completed state hands back for notification and
/// propagation to successor phases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StateOutput {
    Setup(SetupOutput),
    Instances(Vec<InstanceDetail>),
    RouteSwap(RouteSwapConfig),
}

/// Immutable result of a completed state invocation.
///
/// Returned from `on_response` (or directly from `execute` when nothing was
/// dispatched) and threaded back into the engine's own storage; no mutable
/// execution data crosses the dispatch/response boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateOutcome {
    pub status: ExecutionStatus,
    #[serde(default)]
    pub error_message: Option<String>,
    pub activity: ActivityUpdate,
    #[serde(default)]
    pub outputs: Vec<StateOutput>,
}

impl StateOutcome {
    pub fn new(
        status: ExecutionStatus,
        token: CorrelationToken,
        error_message: Option<String>,
    ) -> Self {
        Self {
            status,
            error_message: error_message.clone(),
            activity: ActivityUpdate::new(token, status, error_message),
            outputs: Vec::new(),
        }
    }

    pub fn with_output(mut self, output: StateOutput) -> Self {
        self.outputs.push(output);
        self
    }
}

/// Serializable phase-state data carried across the dispatch/response gap.
/// The engine stores it verbatim and hands it back to `on_response`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StateData {
    Setup(SetupStateData),
    Resize(ResizeStateData),
    RouteSwap(SwapStateData),
}

/// A dispatched command awaiting its correlated response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingExecution {
    pub correlation: CorrelationToken,
    pub state_data: StateData,
}

/// Result of `execute`: either a pending async command or an immediately
/// completed outcome (fail-fast was already raised as an error by then).
#[derive(Debug, Clone, PartialEq)]
pub enum StateExecution {
    Pending(PendingExecution),
    Completed(StateOutcome),
}

/// Responses keyed by correlation token; exactly one entry is expected.
pub type ResponseMap = HashMap<CorrelationToken, CommandResponse>;

/// Extract the single correlated response the engine delivered.
pub fn single_response(
    responses: ResponseMap,
) -> Result<(CorrelationToken, CommandResponse), RolloutError> {
    let count = responses.len();
    let mut iter = responses.into_iter();
    match (iter.next(), iter.next()) {
        (Some(entry), None) => Ok(entry),
        _ => Err(RolloutError::UnexpectedResponseShape { count }),
    }
}

/// One state of the rollout machine.
///
/// `execute` validates, builds and dispatches a command, and returns a
/// pending marker without blocking on the remote result. The engine invokes
/// `on_response` exactly once per dispatched command. `on_abort` is an
/// orthogonal hook; the default no-op is valid because an in-flight remote
/// command is the worker's to cancel.
#[async_trait]
pub trait RolloutState: Send + Sync {
    fn kind(&self) -> StateKind;

    async fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<StateExecution, RolloutError>;

    async fn on_response(
        &self,
        ctx: &ExecutionContext<'_>,
        state_data: StateData,
        responses: ResponseMap,
    ) -> Result<StateOutcome, RolloutError>;

    fn on_abort(&self, _ctx: &ExecutionContext<'_>) {}
}

/// Map a worker command status onto an execution status.
pub(crate) fn status_from_response(response: &CommandResponse) -> ExecutionStatus {
    match response.status {
        super::command::CommandStatus::Success => ExecutionStatus::Success,
        super::command::CommandStatus::Failure => ExecutionStatus::Failed,
    }
}

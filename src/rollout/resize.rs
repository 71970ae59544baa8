// ABOUTME: Resize state: scale the new application up and the old one down.
// ABOUTME: Always runs in the same phase as its Setup; direct context lookup only.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::context::{
    SetupOutput, deploy_output_name, read_output, setup_output_name, write_output,
};
use crate::scaling::{ScaleRequest, resolve_downsize_count, resolve_upsize_count};
use crate::types::CorrelationToken;

use super::command::{CommandKind, CommandPayload, CommandRequest, ResizeCommand, ResponsePayload};
use super::error::RolloutError;
use super::state::{
    ExecutionContext, ExecutionStatus, PendingExecution, ResponseMap, RolloutState, StateData,
    StateExecution, StateKind, StateOutcome, StateOutput, single_response, status_from_response,
};
use super::DEFAULT_TASK_TIMEOUT_MINUTES;

/// Configuration of the Resize state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeState {
    /// Target for the new application.
    pub upsize: ScaleRequest,
    /// Explicit target for the old application; defaults to mirroring the
    /// upsize result.
    pub downsize: Option<ScaleRequest>,
}

/// Data carried from Resize's dispatch to its response handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResizeStateData {
    pub application_name: String,
    pub upsize_count: i32,
    pub downsize_count: i32,
}

#[async_trait]
impl RolloutState for ResizeState {
    fn kind(&self) -> StateKind {
        StateKind::Resize
    }

    async fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<StateExecution, RolloutError> {
        // Setup always ran in this phase, so no fallback search here.
        let setup: SetupOutput = read_output(
            ctx.store,
            ctx.workflow_execution_id,
            &setup_output_name(ctx.phase_name),
        )
        .await?
        .filter(|setup: &SetupOutput| !setup.is_empty())
        .ok_or_else(|| RolloutError::MissingSetupContext {
            phase: ctx.phase_name.to_string(),
        })?;

        let application_name = setup
            .new_application_details
            .as_ref()
            .map(|details| details.application_name.clone())
            .unwrap_or_else(|| ctx.default_application_name.to_string());

        let upsize_count = resolve_upsize_count(&setup, self.upsize);
        let downsize_count = resolve_downsize_count(&setup, upsize_count, self.downsize);

        let token = CorrelationToken::generate();
        let request = CommandRequest {
            account_id: ctx.account_id.clone(),
            app_id: ctx.app_id.clone(),
            kind: CommandKind::Resize,
            correlation: token.clone(),
            timeout_minutes: setup
                .timeout_interval_minutes
                .unwrap_or(DEFAULT_TASK_TIMEOUT_MINUTES),
            payload: CommandPayload::Resize(ResizeCommand {
                application_name: application_name.clone(),
                upsize_count,
                downsize_count,
                total_previous_instance_count: setup.total_previous_instance_count,
                downsize_app_details: setup.app_details_to_be_downsized.clone(),
            }),
        };

        info!(
            phase = ctx.phase_name,
            application = %application_name,
            upsize_count,
            downsize_count,
            "dispatching resize"
        );
        ctx.dispatcher.dispatch(request).await?;

        Ok(StateExecution::Pending(PendingExecution {
            correlation: token,
            state_data: StateData::Resize(ResizeStateData {
                application_name,
                upsize_count,
                downsize_count,
            }),
        }))
    }

    async fn on_response(
        &self,
        ctx: &ExecutionContext<'_>,
        state_data: StateData,
        responses: ResponseMap,
    ) -> Result<StateOutcome, RolloutError> {
        let StateData::Resize(_) = state_data else {
            return Err(RolloutError::StateDataMismatch);
        };
        let (token, response) = single_response(responses)?;

        let status = status_from_response(&response);
        if status != ExecutionStatus::Success {
            return Ok(StateOutcome::new(status, token, response.error_message));
        }

        let ResponsePayload::Resize(result) = response.payload else {
            return Err(RolloutError::StateDataMismatch);
        };

        write_output(
            ctx.store,
            ctx.workflow_execution_id,
            ctx.output_scope(),
            &deploy_output_name(ctx.phase_name),
            &result.instances,
        )
        .await?;

        Ok(StateOutcome::new(ExecutionStatus::Success, token, None)
            .with_output(StateOutput::Instances(result.instances)))
    }
}

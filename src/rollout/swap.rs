// ABOUTME: Route-swap state, forward and rollback, with persisted swap records.
// ABOUTME: Rollback without a prior forward record is a skip, not a failure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::context::{
    ROUTE_STATE_OUTPUT_NAME, RouteStateVariables, Scope, find_setup_output, read_output,
    write_output,
};
use crate::types::CorrelationToken;

use super::command::{CommandKind, CommandPayload, CommandRequest, ResponsePayload, RouteSwapConfig};
use super::error::RolloutError;
use super::state::{
    ExecutionContext, ExecutionStatus, PendingExecution, ResponseMap, RolloutState, StateData,
    StateExecution, StateKind, StateOutcome, StateOutput, single_response, status_from_response,
};
use super::DEFAULT_TASK_TIMEOUT_MINUTES;

/// Name prefix for persisted swap records, keyed by the forward phase's name.
pub const SWAP_RECORD_PREFIX: &str = "rolloutSwapRecord-";

pub fn swap_record_name(phase_name: &str) -> String {
    format!("{SWAP_RECORD_PREFIX}{}", phase_name.trim())
}

/// The record a successful forward swap leaves behind for its rollback.
///
/// Created on forward-swap success, never mutated, superseded by the next
/// forward swap of the same phase key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapRecord {
    pub route_swap_config: RouteSwapConfig,
}

/// Configuration of the route-swap state. One type serves both directions;
/// `is_rollback` selects which.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSwapState {
    pub is_rollback: bool,
    /// Forward swaps: scale the old application down after the swap. Rollback
    /// restores this from the persisted record instead.
    pub downsize_old_application: bool,
}

/// Data carried from the swap dispatch to its response handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapStateData {
    pub config: RouteSwapConfig,
}

#[async_trait]
impl RolloutState for RouteSwapState {
    fn kind(&self) -> StateKind {
        if self.is_rollback {
            StateKind::SwapRoutesRollback
        } else {
            StateKind::SwapRoutes
        }
    }

    async fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<StateExecution, RolloutError> {
        let token = CorrelationToken::generate();

        let downsize_old_application = if self.is_rollback {
            let record: Option<SwapRecord> = read_output(
                ctx.store,
                ctx.workflow_execution_id,
                &swap_record_name(ctx.lookup_phase_name(true)),
            )
            .await?;

            let Some(record) = record else {
                // The forward swap never ran; nothing to undo.
                info!(
                    phase = ctx.phase_name,
                    "no swap record for this phase, skipping rollback"
                );
                let config = RouteSwapConfig {
                    is_rollback: true,
                    skip_rollback: true,
                    ..RouteSwapConfig::default()
                };
                return Ok(StateExecution::Completed(
                    StateOutcome::new(ExecutionStatus::Skipped, token, None)
                        .with_output(StateOutput::RouteSwap(config)),
                ));
            };
            record.route_swap_config.downsize_old_application
        } else {
            self.downsize_old_application
        };

        // Swap may run in a later phase than Setup, so use the fallback chain.
        let setup = find_setup_output(
            ctx.store,
            ctx.workflow_execution_id,
            ctx.phases,
            ctx.state_execution_id,
        )
        .await?;

        let new_application_name = setup
            .new_application_details
            .as_ref()
            .map(|details| details.application_name.clone())
            .unwrap_or_else(|| ctx.default_application_name.to_string());

        let config = RouteSwapConfig {
            new_application_name,
            existing_application_names: setup
                .app_details_to_be_downsized
                .iter()
                .map(|details| details.application_name.clone())
                .collect(),
            existing_application_details: setup.app_details_to_be_downsized.clone(),
            temp_routes: setup.temp_route_maps.clone(),
            final_routes: setup.route_maps.clone(),
            is_rollback: self.is_rollback,
            downsize_old_application,
            skip_rollback: false,
        };

        let request = CommandRequest {
            account_id: ctx.account_id.clone(),
            app_id: ctx.app_id.clone(),
            kind: CommandKind::UpdateRoutes,
            correlation: token.clone(),
            timeout_minutes: setup
                .timeout_interval_minutes
                .unwrap_or(DEFAULT_TASK_TIMEOUT_MINUTES),
            payload: CommandPayload::UpdateRoutes(config.clone()),
        };

        info!(
            phase = ctx.phase_name,
            application = %config.new_application_name,
            rollback = self.is_rollback,
            "dispatching route swap"
        );
        ctx.dispatcher.dispatch(request).await?;

        Ok(StateExecution::Pending(PendingExecution {
            correlation: token,
            state_data: StateData::RouteSwap(SwapStateData { config }),
        }))
    }

    async fn on_response(
        &self,
        ctx: &ExecutionContext<'_>,
        state_data: StateData,
        responses: ResponseMap,
    ) -> Result<StateOutcome, RolloutError> {
        let StateData::RouteSwap(data) = state_data else {
            return Err(RolloutError::StateDataMismatch);
        };
        let (token, response) = single_response(responses)?;

        let status = status_from_response(&response);
        if status != ExecutionStatus::Success {
            return Ok(StateOutcome::new(status, token, response.error_message));
        }

        let ResponsePayload::UpdateRoutes = response.payload else {
            return Err(RolloutError::StateDataMismatch);
        };

        let config = data.config;
        if !config.is_rollback {
            write_output(
                ctx.store,
                ctx.workflow_execution_id,
                Scope::Workflow,
                &swap_record_name(ctx.phase_name),
                &SwapRecord {
                    route_swap_config: config.clone(),
                },
            )
            .await?;
            refresh_route_state(ctx, &config).await?;
        }

        Ok(StateOutcome::new(ExecutionStatus::Success, token, None)
            .with_output(StateOutput::RouteSwap(config)))
    }
}

/// A successful forward swap moved traffic to the final routes; reflect that
/// in the workflow-visible route-state variables.
async fn refresh_route_state(
    ctx: &ExecutionContext<'_>,
    config: &RouteSwapConfig,
) -> Result<(), RolloutError> {
    let variables = RouteStateVariables {
        new_application_name: Some(config.new_application_name.clone()),
        new_application_routes: config.final_routes.clone(),
        old_application_names: config.existing_application_names.clone(),
    };
    write_output(
        ctx.store,
        ctx.workflow_execution_id,
        Scope::Workflow,
        ROUTE_STATE_OUTPUT_NAME,
        &variables,
    )
    .await?;
    Ok(())
}

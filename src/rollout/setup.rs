// ABOUTME: Setup state: resolve the manifest, dispatch create/update, record outputs.
// ABOUTME: First state of every rollout phase; every later state reads what it wrote.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::context::{
    ROUTE_STATE_OUTPUT_NAME, RouteStateVariables, Scope, SetupOutput, read_output,
    setup_output_name, write_output,
};
use crate::manifest::{
    resolve_application_name, resolve_instance_count, resolve_routes,
    substitute_route_placeholders,
};
use crate::types::CorrelationToken;

use super::command::{
    CommandKind, CommandPayload, CommandRequest, ResponsePayload, SetupCommand, SetupResult,
};
use super::error::RolloutError;
use super::state::{
    ExecutionContext, ExecutionStatus, PendingExecution, ResponseMap, RolloutState, StateData,
    StateExecution, StateKind, StateOutcome, StateOutput, single_response, status_from_response,
};
use super::{DEFAULT_CURRENT_RUNNING_COUNT, DEFAULT_TASK_TIMEOUT_MINUTES, DEFAULT_VERSIONS_TO_KEEP};

/// Configuration of the Setup state, as authored on the workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetupState {
    /// Configured maximum instance count. Required unless the current running
    /// count is mirrored instead.
    pub max_instance_count: Option<i32>,
    pub use_current_running_instance_count: bool,
    /// Observed running count of the previous version, when known.
    pub current_running_instance_count: Option<i32>,
    /// Blue/green: stage the new application on the temporary route list.
    pub use_temp_routes: bool,
    /// How many older application versions the worker keeps around.
    pub older_versions_to_keep: Option<u32>,
    pub timeout_minutes: Option<u32>,
}

/// Data carried from Setup's dispatch to its response handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupStateData {
    pub application_name: String,
    /// Setup output as known at dispatch time; the response fills in the
    /// worker-reported fields.
    pub setup: SetupOutput,
    /// Whether route resolution came up empty, making this phase eligible for
    /// the worker-assigned route write-back.
    pub routes_were_empty: bool,
}

impl SetupState {
    fn validate(&self) -> Result<(i32, u32), RolloutError> {
        let max = match self.max_instance_count {
            Some(max) if max >= 0 => max,
            Some(_) => return Err(RolloutError::InvalidInstanceConfiguration),
            None if self.use_current_running_instance_count => 0,
            None => return Err(RolloutError::InvalidInstanceConfiguration),
        };

        let keep = self.older_versions_to_keep.unwrap_or(DEFAULT_VERSIONS_TO_KEEP);
        if keep == 0 {
            return Err(RolloutError::InvalidKeepVersions);
        }

        Ok((max, keep))
    }

    fn effective_running_count(&self) -> i32 {
        match self.current_running_instance_count {
            Some(count) if count > 0 => count,
            _ => DEFAULT_CURRENT_RUNNING_COUNT,
        }
    }
}

#[async_trait]
impl RolloutState for SetupState {
    fn kind(&self) -> StateKind {
        StateKind::Setup
    }

    async fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<StateExecution, RolloutError> {
        let (configured_max, keep_versions) = self.validate()?;

        let package = ctx.manifests.fetch_package().await?;
        if package.manifest_yaml.trim().is_empty() {
            return Err(RolloutError::MissingManifest);
        }

        let block = package.application_block()?;
        let application_name =
            resolve_application_name(&block, &package, ctx.default_application_name)?;

        let final_route_maps = ctx.infra.route_maps().await?;
        let temp_route_maps = ctx.infra.temp_route_maps().await?;
        let infra_routes = if self.use_temp_routes {
            &temp_route_maps
        } else {
            &final_route_maps
        };
        let routes = resolve_routes(&block, infra_routes, block.use_no_route())?;
        let routes = substitute_route_placeholders(routes, &package)?;
        let routes_were_empty = routes.is_empty();

        let max_instance_count = resolve_instance_count(&block, &package, configured_max)?;
        let current_running = self.effective_running_count();

        let mut setup = SetupOutput {
            max_instance_count,
            use_current_running_instance_count: self.use_current_running_instance_count,
            current_running_instance_count: current_running,
            use_temp_routes: self.use_temp_routes,
            timeout_interval_minutes: self.timeout_minutes,
            ..SetupOutput::default()
        };
        // Both lists travel in the setup context: the resolved routes go to
        // the list this phase deploys on, the infra-configured list fills the
        // other so a later swap knows where traffic ultimately lands.
        if self.use_temp_routes {
            setup.temp_route_maps = routes.clone();
            setup.route_maps = final_route_maps;
        } else {
            setup.route_maps = routes.clone();
            setup.temp_route_maps = temp_route_maps;
        }

        let token = CorrelationToken::generate();
        let request = CommandRequest {
            account_id: ctx.account_id.clone(),
            app_id: ctx.app_id.clone(),
            kind: CommandKind::Setup,
            correlation: token.clone(),
            timeout_minutes: self.timeout_minutes.unwrap_or(DEFAULT_TASK_TIMEOUT_MINUTES),
            payload: CommandPayload::Setup(SetupCommand {
                release_name_prefix: application_name.clone(),
                manifest_yaml: package.manifest_yaml,
                variable_yamls: package.variable_yamls,
                route_maps: routes,
                max_count: max_instance_count,
                use_current_running_count: self.use_current_running_instance_count,
                current_running_count: self
                    .use_current_running_instance_count
                    .then_some(current_running),
                older_versions_to_keep: keep_versions,
            }),
        };

        info!(
            phase = ctx.phase_name,
            application = %application_name,
            max_instances = max_instance_count,
            "dispatching application setup"
        );
        ctx.dispatcher.dispatch(request).await?;

        Ok(StateExecution::Pending(PendingExecution {
            correlation: token,
            state_data: StateData::Setup(SetupStateData {
                application_name,
                setup,
                routes_were_empty,
            }),
        }))
    }

    async fn on_response(
        &self,
        ctx: &ExecutionContext<'_>,
        state_data: StateData,
        responses: ResponseMap,
    ) -> Result<StateOutcome, RolloutError> {
        let StateData::Setup(data) = state_data else {
            return Err(RolloutError::StateDataMismatch);
        };
        let (token, response) = single_response(responses)?;

        let status = status_from_response(&response);
        if status != ExecutionStatus::Success {
            return Ok(StateOutcome::new(status, token, response.error_message));
        }

        let ResponsePayload::Setup(result) = response.payload else {
            return Err(RolloutError::StateDataMismatch);
        };

        let mut setup = data.setup;
        apply_setup_result(&mut setup, result);

        if data.routes_were_empty {
            write_back_assigned_routes(ctx, &mut setup).await?;
        }

        write_output(
            ctx.store,
            ctx.workflow_execution_id,
            ctx.output_scope(),
            &setup_output_name(ctx.phase_name),
            &setup,
        )
        .await?;
        publish_route_state(ctx, &setup, &data.application_name).await?;

        Ok(StateOutcome::new(ExecutionStatus::Success, token, None)
            .with_output(StateOutput::Setup(setup)))
    }
}

fn apply_setup_result(setup: &mut SetupOutput, result: SetupResult) {
    setup.new_application_details = Some(result.new_application);
    setup.app_details_to_be_downsized = result.downsize_details;
    setup.total_previous_instance_count = result.total_previous_instance_count;
}

/// When the phase resolved no routes, adopt the worker-assigned URLs and save
/// them to the infrastructure config — but never over a list that has been
/// configured in the meantime.
async fn write_back_assigned_routes(
    ctx: &ExecutionContext<'_>,
    setup: &mut SetupOutput,
) -> Result<(), RolloutError> {
    let urls = setup
        .new_application_details
        .as_ref()
        .map(|details| details.urls.clone())
        .unwrap_or_default();
    if urls.is_empty() {
        return Ok(());
    }

    let existing = if setup.use_temp_routes {
        ctx.infra.temp_route_maps().await?
    } else {
        ctx.infra.route_maps().await?
    };
    if !existing.is_empty() {
        debug!(phase = ctx.phase_name, "routes configured since dispatch, skipping write-back");
        return Ok(());
    }

    info!(
        phase = ctx.phase_name,
        routes = ?urls,
        temp = setup.use_temp_routes,
        "saving worker-assigned routes to infrastructure config"
    );
    ctx.infra.save_route_maps(&urls, setup.use_temp_routes).await?;

    if setup.use_temp_routes {
        setup.temp_route_maps = urls;
    } else {
        setup.route_maps = urls;
    }
    Ok(())
}

/// Publish the workflow-visible route-state variables once, on the first
/// successful Setup of the execution.
async fn publish_route_state(
    ctx: &ExecutionContext<'_>,
    setup: &SetupOutput,
    application_name: &str,
) -> Result<(), RolloutError> {
    let existing: Option<RouteStateVariables> =
        read_output(ctx.store, ctx.workflow_execution_id, ROUTE_STATE_OUTPUT_NAME).await?;
    if existing.is_some() {
        return Ok(());
    }

    let variables = RouteStateVariables {
        new_application_name: Some(application_name.to_string()),
        new_application_routes: setup.active_routes().to_vec(),
        old_application_names: setup
            .app_details_to_be_downsized
            .iter()
            .map(|details| details.application_name.clone())
            .collect(),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_requires_a_max_count_or_current_running_mode() {
        let state = SetupState::default();
        assert!(matches!(
            state.validate(),
            Err(RolloutError::InvalidInstanceConfiguration)
        ));

        let state = SetupState {
            max_instance_count: Some(-1),
            ..SetupState::default()
        };
        assert!(matches!(
            state.validate(),
            Err(RolloutError::InvalidInstanceConfiguration)
        ));

        let state = SetupState {
            use_current_running_instance_count: true,
            ..SetupState::default()
        };
        assert_eq!(state.validate().unwrap(), (0, DEFAULT_VERSIONS_TO_KEEP));
    }

    #[test]
    fn zero_keep_versions_is_rejected() {
        let state = SetupState {
            max_instance_count: Some(2),
            older_versions_to_keep: Some(0),
            ..SetupState::default()
        };
        assert!(matches!(state.validate(), Err(RolloutError::InvalidKeepVersions)));
    }

    #[test]
    fn running_count_has_a_floor_when_mirroring() {
        let state = SetupState {
            use_current_running_instance_count: true,
            current_running_instance_count: Some(0),
            ..SetupState::default()
        };
        assert_eq!(state.effective_running_count(), DEFAULT_CURRENT_RUNNING_COUNT);

        let state = SetupState {
            use_current_running_instance_count: true,
            current_running_instance_count: Some(6),
            ..SetupState::default()
        };
        assert_eq!(state.effective_running_count(), 6);
    }
}

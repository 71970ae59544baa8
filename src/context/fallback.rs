// ABOUTME: Fallback-aware SetupOutput lookup across the phases of one execution.
// ABOUTME: Walks backwards through phase records while service+infra stay the same.

use serde_json::Value;

use super::output::{SetupOutput, setup_output_name};
use super::{ContextError, ContextStore, find_output};
use crate::types::{InfraId, ServiceId, StateExecutionId, WorkflowExecutionId};

/// One phase of a workflow execution, in execution order.
///
/// A rollback phase shares the record of the forward phase it rolls back, so
/// lookups for either land on the same phase name.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseRecord {
    pub state_execution_id: StateExecutionId,
    pub phase_name: String,
    pub service_id: ServiceId,
    pub infra_id: InfraId,
}

/// Locate the `SetupOutput` visible to the phase identified by `current`.
///
/// The phase's own output wins. When absent, the search moves to the previous
/// phase in execution order, but only while that phase targets the same
/// service and infrastructure pairing; the first mismatch (or running out of
/// phases) yields the zero-value output, meaning no rollback-relevant state
/// exists. This is what lets a route-swap or rollback phase recover setup
/// data produced by an earlier phase of the same workflow execution.
pub async fn find_setup_output(
    store: &dyn ContextStore,
    execution: &WorkflowExecutionId,
    phases: &[PhaseRecord],
    current: &StateExecutionId,
) -> Result<SetupOutput, ContextError> {
    let Some(mut index) = phases
        .iter()
        .position(|phase| phase.state_execution_id == *current)
    else {
        return Ok(SetupOutput::default());
    };

    loop {
        let name = setup_output_name(&phases[index].phase_name);
        if let Some(value) = find_output(store, execution, &name).await? {
            return decode(name, value);
        }

        if index == 0 {
            return Ok(SetupOutput::default());
        }

        let previous = &phases[index - 1];
        let this = &phases[index];
        if previous.service_id != this.service_id || previous.infra_id != this.infra_id {
            return Ok(SetupOutput::default());
        }
        index -= 1;
    }
}

fn decode(name: String, value: Value) -> Result<SetupOutput, ContextError> {
    serde_json::from_value(value).map_err(|source| ContextError::Decode { name, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{InMemoryContextStore, Scope, write_output};
    use crate::types::Id;

    fn phase(state_id: &str, name: &str, service: &str, infra: &str) -> PhaseRecord {
        PhaseRecord {
            state_execution_id: Id::new(state_id),
            phase_name: name.to_string(),
            service_id: Id::new(service),
            infra_id: Id::new(infra),
        }
    }

    fn setup_with_max(max: i32) -> SetupOutput {
        SetupOutput {
            max_instance_count: max,
            ..SetupOutput::default()
        }
    }

    #[tokio::test]
    async fn own_phase_entry_wins() {
        let store = InMemoryContextStore::new();
        let exec: WorkflowExecutionId = Id::new("exec");
        let phases = vec![phase("s1", "Phase 1", "svc", "infra")];

        write_output(
            &store,
            &exec,
            Scope::Phase,
            &setup_output_name("Phase 1"),
            &setup_with_max(7),
        )
        .await
        .unwrap();

        let found = find_setup_output(&store, &exec, &phases, &Id::new("s1"))
            .await
            .unwrap();
        assert_eq!(found.max_instance_count, 7);
    }

    #[tokio::test]
    async fn falls_back_to_previous_phase_with_same_service_and_infra() {
        let store = InMemoryContextStore::new();
        let exec: WorkflowExecutionId = Id::new("exec");
        let phases = vec![
            phase("s1", "Phase 1", "svc", "infra"),
            phase("s2", "Phase 2", "svc", "infra"),
        ];

        write_output(
            &store,
            &exec,
            Scope::Phase,
            &setup_output_name("Phase 1"),
            &setup_with_max(3),
        )
        .await
        .unwrap();

        let found = find_setup_output(&store, &exec, &phases, &Id::new("s2"))
            .await
            .unwrap();
        assert_eq!(found.max_instance_count, 3);
    }

    #[tokio::test]
    async fn different_service_or_infra_stops_the_search() {
        let store = InMemoryContextStore::new();
        let exec: WorkflowExecutionId = Id::new("exec");
        let phases = vec![
            phase("s1", "Phase 1", "other-svc", "infra"),
            phase("s2", "Phase 2", "svc", "infra"),
        ];

        write_output(
            &store,
            &exec,
            Scope::Phase,
            &setup_output_name("Phase 1"),
            &setup_with_max(3),
        )
        .await
        .unwrap();

        let found = find_setup_output(&store, &exec, &phases, &Id::new("s2"))
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn no_entries_anywhere_yields_zero_value() {
        let store = InMemoryContextStore::new();
        let exec: WorkflowExecutionId = Id::new("exec");
        let phases = vec![phase("s1", "Phase 1", "svc", "infra")];

        let found = find_setup_output(&store, &exec, &phases, &Id::new("s1"))
            .await
            .unwrap();
        assert!(found.is_empty());

        // unknown state id behaves the same
        let found = find_setup_output(&store, &exec, &phases, &Id::new("missing"))
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn fallback_chains_across_multiple_phases() {
        let store = InMemoryContextStore::new();
        let exec: WorkflowExecutionId = Id::new("exec");
        let phases = vec![
            phase("s1", "Phase 1", "svc", "infra"),
            phase("s2", "Phase 2", "svc", "infra"),
            phase("s3", "Phase 3", "svc", "infra"),
        ];

        write_output(
            &store,
            &exec,
            Scope::Phase,
            &setup_output_name("Phase 1"),
            &setup_with_max(5),
        )
        .await
        .unwrap();

        let found = find_setup_output(&store, &exec, &phases, &Id::new("s3"))
            .await
            .unwrap();
        assert_eq!(found.max_instance_count, 5);
    }
}

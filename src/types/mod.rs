// ABOUTME: Type-safe identifiers shared across the crate.
// ABOUTME: Uses phantom types to prevent ID confusion at compile time.

mod id;

pub use id::{
    AccountId, AppId, CorrelationToken, Id, InfraId, ServiceId, StateExecutionId,
    WorkflowExecutionId,
};

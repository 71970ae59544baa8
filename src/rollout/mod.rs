// ABOUTME: The rollout state machine: Setup, Resize, and the two route swaps.
// ABOUTME: States dispatch worker commands and interpret correlated responses.

mod command;
mod dispatch;
mod error;
mod infra;
mod resize;
mod setup;
mod state;
mod swap;

pub use command::{
    CommandKind, CommandPayload, CommandRequest, CommandResponse, CommandStatus, ResizeCommand,
    ResizeResult, ResponsePayload, RouteSwapConfig, SetupCommand, SetupResult,
};
pub use dispatch::{DispatchError, Dispatcher};
pub use error::{RolloutError, RolloutErrorKind};
pub use infra::{InfraError, InfrastructureConfig};
pub use resize::{ResizeState, ResizeStateData};
pub use setup::{SetupState, SetupStateData};
pub use state::{
    ActivityUpdate, ExecutionContext, ExecutionStatus, ManifestSource, PendingExecution,
    ResponseMap, RolloutState, StateData, StateExecution, StateKind, StateOutcome, StateOutput,
    single_response,
};
pub use swap::{RouteSwapState, SWAP_RECORD_PREFIX, SwapRecord, SwapStateData, swap_record_name};

/// Worker commands time out after this long when neither the state
/// configuration nor the recovered setup context carries a value.
pub const DEFAULT_TASK_TIMEOUT_MINUTES: u32 = 5;

/// Instance floor used when mirroring a running count that is zero or unknown.
pub const DEFAULT_CURRENT_RUNNING_COUNT: i32 = 2;

/// Older application versions the worker keeps when not configured.
pub const DEFAULT_VERSIONS_TO_KEEP: u32 = 3;

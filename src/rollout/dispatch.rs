// ABOUTME: Dispatch trait for handing commands to the remote worker.
// ABOUTME: Fire-and-forget; responses arrive later through the engine.

use async_trait::async_trait;
use thiserror::Error;

use super::command::CommandRequest;

/// Errors from handing a command to the dispatch layer.
///
/// Remote execution failures are not surfaced here; they arrive as a
/// correlated response with failure status.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no worker available for command: {0}")]
    NoWorkerAvailable(String),

    #[error("dispatch failed: {0}")]
    Failed(String),
}

/// Asynchronous hand-off of a command to the remote worker.
///
/// `dispatch` must not block on remote execution: it queues the command and
/// returns. The worker's result comes back through the engine as a response
/// keyed by the request's correlation token. Retry and backoff are this
/// layer's responsibility, not the caller's.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, request: CommandRequest) -> Result<(), DispatchError>;
}

// ABOUTME: Infrastructure-configuration trait for route lists.
// ABOUTME: Reads configured routes and persists worker-assigned ones once.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from reading or updating infrastructure configuration.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("infrastructure config error: {0}")]
    Backend(String),
}

/// The infrastructure definition a phase deploys into.
///
/// Carries the pre-configured final and temporary route lists. When a phase
/// resolves no routes of its own, the worker assigns some and the setup state
/// writes them back here — only while the corresponding list is still empty,
/// so a configured list is never overwritten.
#[async_trait]
pub trait InfrastructureConfig: Send + Sync {
    /// Route list traffic ultimately runs on.
    async fn route_maps(&self) -> Result<Vec<String>, InfraError>;

    /// Staging route list used by blue/green phases before the swap.
    async fn temp_route_maps(&self) -> Result<Vec<String>, InfraError>;

    /// Persist worker-assigned routes into the final (`temp == false`) or
    /// temporary (`temp == true`) list.
    async fn save_route_maps(&self, routes: &[String], temp: bool) -> Result<(), InfraError>;
}

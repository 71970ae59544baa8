// ABOUTME: Library root for windlass - the rollout-orchestration core.
// ABOUTME: Drives setup, resize, and blue/green route swaps for one workflow phase.

pub mod context;
pub mod manifest;
pub mod rollout;
pub mod scaling;
pub mod types;

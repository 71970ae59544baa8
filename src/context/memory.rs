// ABOUTME: In-memory ContextStore backed by a hash map.
// ABOUTME: Used by tests and single-process embeddings of the core.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{ContextError, ContextStore, Scope};
use crate::types::WorkflowExecutionId;

type Key = (String, Scope, String);

/// Hash-map-backed store; point lookups only, like the real backends.
#[derive(Debug, Default)]
pub struct InMemoryContextStore {
    entries: RwLock<HashMap<Key, serde_json::Value>>,
}

impl InMemoryContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(execution: &WorkflowExecutionId, scope: Scope, name: &str) -> Key {
        (execution.as_str().to_string(), scope, name.to_string())
    }
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    async fn put(
        &self,
        execution: &WorkflowExecutionId,
        scope: Scope,
        name: &str,
        value: serde_json::Value,
    ) -> Result<(), ContextError> {
        self.entries
            .write()
            .insert(Self::key(execution, scope, name), value);
        Ok(())
    }

    async fn get(
        &self,
        execution: &WorkflowExecutionId,
        scope: Scope,
        name: &str,
    ) -> Result<Option<serde_json::Value>, ContextError> {
        Ok(self
            .entries
            .read()
            .get(&Self::key(execution, scope, name))
            .cloned())
    }
}

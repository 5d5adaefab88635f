//! Store configuration.
//!
//! Configuration is a plain serde structure so hosts can keep it alongside
//! their own settings. Every field has a default; an empty JSON object is a
//! valid configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What a store does when a listener panics while being notified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenerErrorPolicy {
    /// Log the failure and return it to the caller of the bound method.
    #[default]
    Surface,
    /// Log the failure only.
    Log,
}

/// Options accepted by [`StoreBuilder`](crate::store::StoreBuilder).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Stable identity used as the container part of action types.
    ///
    /// Action tracing is only enabled for stores that have one.
    pub guid: Option<String>,

    /// Policy for listener panics on `state_changed` and `action_dispatched`.
    pub listener_errors: ListenerErrorPolicy,

    /// Queue `dispatch` calls issued while a reducer is running and replay
    /// them once the outermost reducer has committed.
    pub queue_nested_dispatch: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            guid: None,
            listener_errors: ListenerErrorPolicy::Surface,
            queue_nested_dispatch: true,
        }
    }
}

impl StoreConfig {
    /// Parse a configuration from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

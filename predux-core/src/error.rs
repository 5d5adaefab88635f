//! Error types shared by the store, the signal bus and the binding layer.

use thiserror::Error;

use crate::reactive::ListenerId;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

/// A single listener that panicked during [`Signal::emit`](crate::reactive::Signal::emit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerFailure {
    /// The registration that failed.
    pub listener: ListenerId,
    /// The panic payload, if it was a string.
    pub message: String,
}

/// Failures collected over one emission.
///
/// Every listener still ran; this only reports the ones that panicked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} of {} listener(s) failed during emit", failures.len(), invoked)]
pub struct EmitError {
    /// Number of listeners invoked during the emission.
    pub invoked: usize,
    /// The listeners that panicked, in invocation order.
    pub failures: Vec<ListenerFailure>,
}

/// Errors produced by a [`Store`](crate::store::Store) and its bound methods.
#[derive(Debug, Error)]
pub enum StoreError {
    /// State was replaced or read in-window while no window was open.
    #[error("state is locked: `{operation}` is only legal inside a reducer or selector")]
    StateLocked { operation: &'static str },

    /// A method name cannot be used as part of an action type.
    #[error("invalid method name {name:?}: {reason}")]
    InvalidMethodName { name: String, reason: &'static str },

    /// Two reducers were registered under the same name.
    #[error("a reducer named `{0}` is already registered")]
    DuplicateReducer(String),

    /// No reducer is registered for the dispatched action type.
    #[error("no reducer registered for action `{0}`")]
    UnknownAction(String),

    /// The action was addressed to a different container.
    #[error("action `{action}` does not belong to container `{container}`")]
    ForeignAction { action: String, container: String },

    /// The action payload did not match the reducer's argument type.
    #[error("payload for `{action}` could not be decoded: {source}")]
    Payload {
        action: String,
        #[source]
        source: serde_json::Error,
    },

    /// Reducer arguments could not be encoded into a trace record.
    #[error("arguments for `{action}` could not be encoded: {source}")]
    Encode {
        action: String,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration document could not be parsed.
    #[error("invalid store configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// An async thunk was spawned outside of a tokio runtime.
    #[error("no async runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    /// One or more listeners failed while being notified.
    #[error(transparent)]
    Listeners(#[from] EmitError),
}

impl StoreError {
    /// True for errors raised at setup time rather than during dispatch.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            StoreError::InvalidMethodName { .. }
                | StoreError::DuplicateReducer(_)
                | StoreError::Config(_)
        )
    }
}

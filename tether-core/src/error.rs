//! Error types shared by the stores and storage backends.

/// Errors raised while building stores, dispatching actions, or talking to
/// a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Persisted text under `key` could not be decoded.
    #[error("malformed persisted state under {key:?}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The in-memory state could not be encoded for `key`.
    #[error("cannot encode state for {key:?}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The storage backend refused a write.
    #[error("storage write to {key:?} failed: {reason}")]
    Storage { key: String, reason: String },

    /// I/O error from a file-backed storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A fallible reducer rejected the action.
    #[error("reducer rejected action: {0}")]
    Reducer(Box<dyn std::error::Error + Send + Sync>),

    /// A configured coercion names a field the state does not have.
    #[error("no field named {0:?} in the initial state")]
    UnknownField(String),
}

/// Result alias for state operations.
pub type StateResult<T> = Result<T, StateError>;

use thiserror::Error;

/// Custom error type for store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Type not found: {0}")]
    TypeNotFound(String),

    #[error("Stream not found: {0}")]
    StreamNotFound(String),

    #[error("Behavior not found: {0}")]
    BehaviorNotFound(String),

    #[error("View not found: {0}")]
    ViewNotFound(String),

    #[error("No value at key {key} in stream {stream}")]
    KeyNotFound { stream: String, key: i64 },

    #[error("Key {key} already exists in stream {stream}")]
    DuplicateKey { stream: String, key: i64 },

    /// A get-or-create call named an existing entity with a different definition.
    #[error("Conflicting definition for {kind} {id}")]
    DefinitionConflict { kind: &'static str, id: String },

    #[error("Type {type_id} is still referenced by stream {stream_id}")]
    TypeInUse { type_id: String, stream_id: String },

    #[error("Invalid key window: start={start}, end={end}")]
    InvalidWindow { start: i64, end: i64 },

    #[error("Serialization Error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("Configuration Error: {0}")]
    ConfigError(String),
}

// Implement conversion from lock poison errors for convenience
impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        StoreError::LockError(format!("Mutex/RwLock poisoned: {}", err))
    }
}

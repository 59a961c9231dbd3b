use std::time::Duration;

/// Failures while acquiring a position. All of them are recoverable: callers fall
/// back to the last known location and let the user retry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("location unavailable: {0}")]
    Unavailable(String),

    #[error("timed out after {0:?} waiting for a location fix")]
    Timeout(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistenceError {
    #[error("failed to read {key}: {reason}")]
    ReadFailed { key: String, reason: String },

    #[error("failed to write {key}: {reason}")]
    WriteFailed { key: String, reason: String },

    #[error("failed to encode {key}: {reason}")]
    Encode { key: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store has not finished hydrating from durable storage yet.
    #[error("safety store is not initialized")]
    NotInitialized,
}

//! Error types shared by adapters and storage backends.

use thiserror::Error;

// =============================================================================
// Adapter Errors
// =============================================================================

/// Errors raised while talking to a chat back-end.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    /// The back-end rejected or failed to deliver a message.
    #[error("failed to send message: {0}")]
    SendFailed(String),

    /// The adapter has been shut down and accepts no more messages.
    #[error("adapter '{adapter}' is closed")]
    Closed {
        /// Name of the closed adapter.
        adapter: String,
    },

    /// Internal adapter error.
    #[error("adapter error: {0}")]
    Internal(String),
}

impl AdapterError {
    /// Creates a send failure.
    pub fn send_failed(msg: impl Into<String>) -> Self {
        Self::SendFailed(msg.into())
    }

    /// Creates a closed error for the named adapter.
    pub fn closed(adapter: impl Into<String>) -> Self {
        Self::Closed {
            adapter: adapter.into(),
        }
    }

    /// Creates an internal adapter error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

// =============================================================================
// Store Errors
// =============================================================================

/// Errors raised by [`Storer`](crate::store::Storer) implementations and the
/// property layer built on top of them.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A path had no segments.
    #[error("empty storage path")]
    EmptyPath,

    /// A stored key could not be decoded back into a path.
    #[error("malformed storage key '{0}'")]
    MalformedKey(String),

    /// A write was attempted against [`Scope::Unknown`](crate::store::Scope::Unknown).
    #[error("cannot store properties in an unknown scope")]
    UnknownScope,

    /// The backing store failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Creates a backend error.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while assembling or running a bot.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A built-in handler could not be registered.
    #[error("Failed to set up router: {0}")]
    Router(#[from] hark_framework::MuxError),

    /// The alias command clashed with an existing command.
    #[error("Failed to set up aliases: {0}")]
    Alias(#[from] hark_framework::CommandError),

    /// Binding or serving the webhook listener failed.
    #[error("Webhook server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("No adapters registered")]
    NoAdapters,
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

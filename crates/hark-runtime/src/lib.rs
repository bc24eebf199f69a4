//! Hark Runtime - configuration, logging and the dispatch loop.
//!
//! This crate provides:
//! - Layered configuration with figment ([`ConfigLoader`], [`HarkConfig`])
//! - Logging setup ([`LoggingBuilder`], [`logging::init_from_config`])
//! - The dispatch loop feeding adapters into a router ([`Bot`])
//! - Runtime orchestration with signal handling and the webhook listener
//!   ([`HarkRuntime`])
//!
//! ```ignore
//! use hark_runtime::HarkRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = HarkRuntime::new()?;
//!     runtime.mux().add_command(hark_framework::ping())?;
//!     runtime.add_adapter(Arc::new(MyAdapter::connect().await?));
//!
//!     // Run until Ctrl+C
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod bot;
pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use bot::Bot;
pub use config::{
    BotConfig, ConfigError, ConfigLoader, ConfigResult, HarkConfig, LoggingConfig, WebhookConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{HarkRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros, for `use hark_runtime::prelude::*`.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}

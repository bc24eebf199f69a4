//! Configuration for hark bots.
//!
//! Settings are layered with figment: defaults, then profile and main
//! configuration files, then `HARK_*` environment variables, then anything
//! merged in code. See [`ConfigLoader`].

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile};
pub use schema::{
    BotConfig, HarkConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig,
    SpanEventConfig, WebhookConfig,
};
pub use validation::validate_config;

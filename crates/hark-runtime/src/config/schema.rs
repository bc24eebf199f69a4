//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use hark_framework::ALIAS_PREFIX;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HarkConfig {
    /// The bot's identity and built-in commands.
    #[serde(default)]
    pub bot: BotConfig,

    /// The HTTP listener serving webhooks.
    #[serde(default)]
    pub webhook: WebhookConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl HarkConfig {
    /// Checks values a deserializer cannot.
    pub fn validate(&self) -> super::ConfigResult<()> {
        super::validate_config(self)
    }
}

// =============================================================================
// Bot
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Router name. Also the first segment of webhook paths and of the
    /// store keys handlers write.
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Shown at the top of `help`.
    #[serde(default)]
    pub description: String,

    /// Store prefix under which aliases are kept.
    #[serde(default = "default_alias_prefix")]
    pub alias_prefix: String,

    /// Register the `help` command.
    #[serde(default = "default_true")]
    pub help: bool,

    /// Register the `alias` command and expand aliases.
    #[serde(default = "default_true")]
    pub aliases: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            description: String::new(),
            alias_prefix: default_alias_prefix(),
            help: true,
            aliases: true,
        }
    }
}

fn default_bot_name() -> String {
    "bot".to_string()
}

fn default_alias_prefix() -> String {
    ALIAS_PREFIX.to_string()
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Webhook
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Start the HTTP listener.
    #[serde(default)]
    pub enabled: bool,

    /// Socket address to bind.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Public URL webhook URLs are built from.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: default_listen(),
            base_url: default_base_url(),
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080/".to_string()
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// One JSON object per line. Needs the `json-log` feature; without it
    /// the full layout is used.
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// How often the log file is rolled over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Daily,
    Hourly,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log file, used when `output` is `file`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub rotation: LogRotation,

    /// Per-module levels, e.g. `hark_framework = "debug"`.
    #[serde(default)]
    pub filters: BTreeMap<String, LogLevel>,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line in each record.
    #[serde(default)]
    pub file_location: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HarkConfig::default();
        assert_eq!(config.bot.name, "bot");
        assert_eq!(config.bot.alias_prefix, "aliases");
        assert!(config.bot.help && config.bot.aliases);
        assert!(!config.webhook.enabled);
        assert_eq!(config.webhook.listen, "127.0.0.1:8080");
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn test_level_conversions() {
        assert_eq!(LogLevel::Warn.as_str(), "warn");
        assert_eq!(LogLevel::Debug.to_tracing_level(), tracing::Level::DEBUG);
        assert_eq!(LogLevel::Trace.to_string(), "trace");
    }
}

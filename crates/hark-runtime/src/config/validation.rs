//! Configuration validation utilities.

use std::net::SocketAddr;

use url::Url;

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotConfig, HarkConfig, WebhookConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &HarkConfig) -> ConfigResult<()> {
    validate_bot_config(&config.bot)?;
    validate_webhook_config(&config.webhook)?;
    Ok(())
}

fn validate_bot_config(bot: &BotConfig) -> ConfigResult<()> {
    if bot.name.trim().is_empty() {
        return Err(ConfigError::validation("Bot name must not be empty"));
    }
    if bot.name.contains(['/', '{', '}', '*']) {
        return Err(ConfigError::validation(format!(
            "Bot name must not contain '/', '{{', '}}' or '*': {}",
            bot.name
        )));
    }
    if bot.aliases && bot.alias_prefix.trim().is_empty() {
        return Err(ConfigError::validation("Alias prefix must not be empty"));
    }
    Ok(())
}

fn validate_webhook_config(webhook: &WebhookConfig) -> ConfigResult<()> {
    webhook
        .listen
        .parse::<SocketAddr>()
        .map_err(|e| ConfigError::invalid_address(&webhook.listen, e.to_string()))?;

    let url = Url::parse(&webhook.base_url)
        .map_err(|e| ConfigError::invalid_url(&webhook.base_url, e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::invalid_url(
            &webhook.base_url,
            "must be an absolute http(s) URL",
        ));
    }
    Ok(())
}

use thiserror::Error;

use super::Config;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.bot_token().is_none_or(str::is_empty) {
            return Err(ConfigError::InvalidConfig(
                "auth.bot_token cannot be empty (set DISCORD_TOKEN)".to_string(),
            ));
        }

        let prefix = &self.bot.command_prefix;
        if prefix.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "bot.command_prefix cannot be empty".to_string(),
            ));
        }
        if prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidConfig(
                "bot.command_prefix cannot contain whitespace".to_string(),
            ));
        }

        if self.bot.state_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "bot.state_path cannot be empty".to_string(),
            ));
        }

        if let Err(err) = url::Url::parse(&self.instagram.api_base_url) {
            return Err(ConfigError::InvalidConfig(format!(
                "instagram.api_base_url is not a valid url: {err}"
            )));
        }

        if self.instagram.user_id.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "instagram.user_id cannot be empty".to_string(),
            ));
        }

        if self.instagram.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "instagram.request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

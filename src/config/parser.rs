use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::ConfigError;

/// Lower bound on the wait between two polls of the content source.
pub const MIN_POLL_INTERVAL_SECS: u64 = 150;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub instagram: InstagramConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub bot_token: Option<SecretString>,
}

impl AuthConfig {
    pub fn bot_token(&self) -> Option<&str> {
        self.bot_token.as_ref().map(|token| token.expose_secret())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    #[serde(default = "default_display_name")]
    pub display_name: String,
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            command_prefix: default_command_prefix(),
            display_name: default_display_name(),
            state_path: default_state_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl TrackingConfig {
    /// Wait applied before every poll, never shorter than the floor.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(MIN_POLL_INTERVAL_SECS))
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InstagramConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_instagram_user_id")]
    pub user_id: String,
    #[serde(default)]
    pub access_token: Option<SecretString>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl InstagramConfig {
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_ref().map(|token| token.expose_secret())
    }
}

impl Default for InstagramConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            user_id: default_instagram_user_id(),
            access_token: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Reads the settings file, or falls back to defaults when it does not
    /// exist, then applies environment overrides and validates.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::parse_file(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(value) = env_value(&["DISCORD_TOKEN", "TOKEN"]) {
            self.auth.bot_token = Some(SecretString::from(value));
        }
        if let Some(value) = env_value(&["INSTAGRAM_ACCESS_TOKEN"]) {
            self.instagram.access_token = Some(SecretString::from(value));
        }
        if let Some(value) = env_value(&["INSTAGRAM_USER_ID"]) {
            self.instagram.user_id = value;
        }
        if let Some(value) = env_value(&["STATE_PATH"]) {
            self.bot.state_path = PathBuf::from(value);
        }
    }
}

fn env_value(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.is_empty())
}

fn default_command_prefix() -> String {
    "!".to_string()
}

fn default_display_name() -> String {
    "ThompsonBot".to_string()
}

fn default_state_path() -> PathBuf {
    PathBuf::from("config.json")
}

fn default_poll_interval_secs() -> u64 {
    300
}

fn default_api_base_url() -> String {
    "https://graph.instagram.com".to_string()
}

fn default_instagram_user_id() -> String {
    "me".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

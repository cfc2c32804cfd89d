pub use self::parser::{Config, InstagramConfig, LogFormat, LoggingConfig};
pub use self::validator::ConfigError;

mod parser;
mod validator;

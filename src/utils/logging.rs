use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{LogFormat, LoggingConfig};

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.level)));

    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn default_directive(level: &str) -> String {
    format!("{level},serenity=warn,tracing::span=warn")
}

#[cfg(test)]
mod tests {
    use super::default_directive;

    #[test]
    fn default_directive_quiets_gateway_noise() {
        assert_eq!(default_directive("debug"), "debug,serenity=warn,tracing::span=warn");
    }
}

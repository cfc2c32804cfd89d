use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use super::{CommandDescriptor, CommandHandler, UserInputError};
use crate::bot::Bot;
use crate::discord::IncomingMessage;

/// `tracking [on|off]`: reports or toggles Instagram tracking.
pub struct ToggleTracking;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackingRequest {
    Status,
    Set(bool),
}

impl ToggleTracking {
    pub fn descriptor(prefix: &str) -> CommandDescriptor {
        CommandDescriptor::new(
            "tracking",
            format!(
                "{prefix}tracking [on|off]\nToggle news tracking from instagram on or off. \
                 With no arguments, request the tracking status."
            ),
            ToggleTracking,
        )
    }

    fn parse_args(prefix: &str, args: &[&str]) -> Result<TrackingRequest, UserInputError> {
        match args {
            [] => Ok(TrackingRequest::Status),
            [value] if value.eq_ignore_ascii_case("on") => Ok(TrackingRequest::Set(true)),
            [value] if value.eq_ignore_ascii_case("off") => Ok(TrackingRequest::Set(false)),
            [_] => Err(UserInputError::TrackingArgument {
                prefix: prefix.to_string(),
            }),
            _ => Err(UserInputError::InvalidArguments),
        }
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

#[async_trait]
impl CommandHandler for ToggleTracking {
    async fn run(&self, bot: &Arc<Bot>, message: &IncomingMessage, args: &[&str]) -> Result<()> {
        match Self::parse_args(bot.commands().prefix(), args) {
            Ok(TrackingRequest::Status) => {
                info!("user {} requested tracking status", message.author_tag);
                let enabled = bot.tracking_enabled().await;
                bot.reply(message, &format!("Tracking is currently {}.", on_off(enabled)))
                    .await
            }
            Ok(TrackingRequest::Set(enabled)) => {
                bot.set_tracking(enabled).await?;
                info!("tracking turned {} by {}", on_off(enabled), message.author_tag);
                bot.reply(message, &format!("Tracking is now {}.", on_off(enabled)))
                    .await
            }
            Err(err) => {
                warn!("invalid arguments to 'tracking': {err}");
                bot.reply(message, &err.to_string()).await
            }
        }
    }
}

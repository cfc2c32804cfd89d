use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use super::{CommandDescriptor, CommandHandler, UserInputError};
use crate::bot::Bot;
use crate::discord::IncomingMessage;
use crate::parsers::{channel_mention, parse_channel_mention};
use crate::state::{COMMANDS_ROLE, NEWS_ROLE};

/// `command_channel <#channel>`: the only channel commands are accepted from.
pub struct SetCommandsChannel;

impl SetCommandsChannel {
    pub fn descriptor() -> CommandDescriptor {
        CommandDescriptor::new(
            "command_channel",
            "Set the channel in which the bot will receive commands.",
            SetCommandsChannel,
        )
    }

    fn parse_args(args: &[&str]) -> Result<u64, UserInputError> {
        let [mention] = args else {
            return Err(UserInputError::InvalidArguments);
        };
        parse_channel_mention(mention).ok_or(UserInputError::ChannelMentionRequired)
    }
}

#[async_trait]
impl CommandHandler for SetCommandsChannel {
    async fn run(&self, bot: &Arc<Bot>, message: &IncomingMessage, args: &[&str]) -> Result<()> {
        let channel_id = match Self::parse_args(args) {
            Ok(channel_id) => channel_id,
            Err(err) => {
                warn!("invalid arguments to 'command_channel': {err}");
                return bot.reply(message, &err.to_string()).await;
            }
        };

        bot.add_channel(channel_id, COMMANDS_ROLE).await?;
        info!("commands channel set to {}", channel_id);
        bot.reply(
            message,
            &format!(
                "Bot now operates commands only on {}.",
                channel_mention(channel_id)
            ),
        )
        .await
    }
}

/// `news_channel <#channel> ...`: where Instagram posts are relayed.
pub struct SetNewsChannel;

impl SetNewsChannel {
    pub fn descriptor() -> CommandDescriptor {
        CommandDescriptor::new(
            "news_channel",
            "Configure the channel where the bot will post news from instagram.",
            SetNewsChannel,
        )
    }

    fn parse_args(prefix: &str, args: &[&str]) -> Result<u64, UserInputError> {
        args.first()
            .and_then(|mention| parse_channel_mention(mention))
            .ok_or_else(|| UserInputError::MissingChannelMention {
                prefix: prefix.to_string(),
                command: "news_channel",
            })
    }
}

#[async_trait]
impl CommandHandler for SetNewsChannel {
    async fn run(&self, bot: &Arc<Bot>, message: &IncomingMessage, args: &[&str]) -> Result<()> {
        let channel_id = match Self::parse_args(bot.commands().prefix(), args) {
            Ok(channel_id) => channel_id,
            Err(err) => {
                warn!("invalid arguments to 'news_channel': {err}");
                return bot.reply(message, &err.to_string()).await;
            }
        };

        info!("setting channel '{}' to be {} ...", NEWS_ROLE, channel_id);
        bot.add_channel(channel_id, NEWS_ROLE).await?;
        bot.reply(
            message,
            &format!("News will now be sent to {}.", channel_mention(channel_id)),
        )
        .await
    }
}

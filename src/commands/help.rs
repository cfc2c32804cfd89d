use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::{CommandDescriptor, CommandHandler};
use crate::bot::Bot;
use crate::discord::IncomingMessage;

/// Lists every registered command. Arguments are ignored.
pub struct Help;

impl Help {
    pub fn descriptor() -> CommandDescriptor {
        CommandDescriptor::new("help", "Show the help message.", Help)
    }
}

#[async_trait]
impl CommandHandler for Help {
    async fn run(&self, bot: &Arc<Bot>, message: &IncomingMessage, _args: &[&str]) -> Result<()> {
        let text = bot.commands().help_text(bot.display_name());
        bot.reply(message, &text).await
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{TestHarness, message_in};

    #[tokio::test]
    async fn help_lists_every_command() {
        let harness = TestHarness::new();
        let bot = harness.bot();

        bot.handle_message(&message_in(1, "!help")).await.expect("handle");

        let replies = harness.gateway.replies();
        assert_eq!(replies.len(), 1);
        let help = &replies[0];
        assert!(help.starts_with("Command help for bot 'ThompsonBot':\n"));
        let positions: Vec<usize> = ["!help:", "!command_channel:", "!news_channel:", "!tracking:"]
            .iter()
            .map(|name| help.find(name).unwrap_or_else(|| panic!("missing {name} in {help}")))
            .collect();
        assert!(
            positions.windows(2).all(|pair| pair[0] < pair[1]),
            "commands out of registration order: {help}"
        );
    }

    #[tokio::test]
    async fn help_ignores_arguments() {
        let harness = TestHarness::new();
        let bot = harness.bot();

        bot.handle_message(&message_in(1, "!help")).await.expect("handle");
        bot.handle_message(&message_in(1, "!help me please")).await.expect("handle");

        let replies = harness.gateway.replies();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0], replies[1]);
    }
}

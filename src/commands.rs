use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::bot::Bot;
use crate::discord::IncomingMessage;
use crate::parsers::parse_prefixed_command;

pub mod channel;
pub mod help;
pub mod tracking;

pub use self::channel::{SetCommandsChannel, SetNewsChannel};
pub use self::help::Help;
pub use self::tracking::ToggleTracking;

/// Malformed command input. The `Display` text is what the user gets back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserInputError {
    #[error("Invalid arguments.")]
    InvalidArguments,
    #[error("Argument 1 must mention a channel.")]
    ChannelMentionRequired,
    #[error("{prefix}{command} requires a channel mention as first argument.")]
    MissingChannelMention { prefix: String, command: &'static str },
    #[error("{prefix}tracking requires 'on' or 'off' as first argument.")]
    TrackingArgument { prefix: String },
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Validates `args` itself and replies to the user on bad input.
    async fn run(&self, bot: &Arc<Bot>, message: &IncomingMessage, args: &[&str]) -> Result<()>;
}

#[derive(Clone)]
pub struct CommandDescriptor {
    pub name: String,
    pub description: String,
    handler: Arc<dyn CommandHandler>,
}

impl CommandDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: impl CommandHandler + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            handler: Arc::new(handler),
        }
    }
}

impl std::fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Not a command, or not from a channel the bot listens to.
    Ignored,
    /// Prefixed but unknown; the sender got the invalid command notice.
    Rejected,
    Handled(String),
}

/// Commands in registration order. Built once at startup and read-only
/// afterwards.
#[derive(Debug)]
pub struct CommandRegistry {
    prefix: String,
    commands: Vec<CommandDescriptor>,
}

impl CommandRegistry {
    /// A registry holding only `help`, which is always present.
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut registry = Self {
            prefix: prefix.into(),
            commands: Vec::new(),
        };
        registry.register(Help::descriptor());
        registry
    }

    pub fn with_builtin(prefix: impl Into<String>) -> Self {
        let mut registry = Self::new(prefix);
        let prefix = registry.prefix.clone();
        registry.register(SetCommandsChannel::descriptor());
        registry.register(SetNewsChannel::descriptor());
        registry.register(ToggleTracking::descriptor(&prefix));
        registry
    }

    /// Appends the descriptor, or replaces the one with the same name in
    /// place.
    pub fn register(&mut self, descriptor: CommandDescriptor) {
        match self.commands.iter_mut().find(|c| c.name == descriptor.name) {
            Some(existing) => {
                debug!("command '{}' re-registered, replacing handler", descriptor.name);
                *existing = descriptor;
            }
            None => self.commands.push(descriptor),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&CommandDescriptor> {
        self.commands.iter().find(|c| c.name == name)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &CommandDescriptor> {
        self.commands.iter()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn invalid_command_notice(&self) -> String {
        format!(
            "Invalid command. Enter '{}help' for more info.",
            self.prefix
        )
    }

    pub fn help_text(&self, display_name: &str) -> String {
        let mut text = format!("Command help for bot '{display_name}':\n");
        for descriptor in self.descriptors() {
            text.push_str(&format!(
                "{}{}: {}\n",
                self.prefix, descriptor.name, descriptor.description
            ));
        }
        text
    }

    /// Routes `message` to its handler. The dispatcher never looks at the
    /// arguments and never persists anything.
    pub async fn dispatch(&self, bot: &Arc<Bot>, message: &IncomingMessage) -> Result<DispatchOutcome> {
        let Some(parsed) = parse_prefixed_command(&message.content, &self.prefix) else {
            return Ok(DispatchOutcome::Ignored);
        };

        let Some(descriptor) = self.lookup(parsed.name) else {
            info!(
                "user {} sent unknown command '{}'",
                message.author_tag, parsed.name
            );
            bot.reply(message, &self.invalid_command_notice()).await?;
            return Ok(DispatchOutcome::Rejected);
        };

        info!(
            "user {} sent command '{}'",
            message.author_tag, message.content
        );
        descriptor.handler.run(bot, message, &parsed.args).await?;
        Ok(DispatchOutcome::Handled(descriptor.name.clone()))
    }
}

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::commands::{CommandRegistry, DispatchOutcome};
use crate::config::Config;
use crate::discord::{ChatGateway, IncomingMessage};
use crate::instagram::PostSource;
use crate::state::{COMMANDS_ROLE, ChannelRegistry, ConfigurationSnapshot, StateError, StateStore};
use crate::tracking::{Tracker, TrackingState};

/// Mutable state shared by command handlers and the tracking loop.
#[derive(Debug, Default)]
pub struct BotState {
    pub channels: ChannelRegistry,
    pub tracking: TrackingState,
}

impl BotState {
    fn snapshot(&self) -> ConfigurationSnapshot {
        ConfigurationSnapshot {
            channels: self.channels.clone(),
            tracking: self.tracking.enabled,
        }
    }
}

/// Owns the channel registry and tracking state and routes gateway events.
pub struct Bot {
    commands: CommandRegistry,
    display_name: String,
    poll_interval: Duration,
    gateway: Arc<dyn ChatGateway>,
    source: Arc<dyn PostSource>,
    store: StateStore,
    state: Mutex<BotState>,
    ready: AtomicBool,
    user_id: AtomicU64,
}

impl Bot {
    /// Builds the bot with the built-in commands and loads the state file,
    /// bootstrapping it when missing.
    pub fn new(
        config: &Config,
        store: StateStore,
        gateway: Arc<dyn ChatGateway>,
        source: Arc<dyn PostSource>,
    ) -> Result<Self, StateError> {
        let commands = CommandRegistry::with_builtin(&config.bot.command_prefix);
        Self::with_commands(config, commands, store, gateway, source)
    }

    pub fn with_commands(
        config: &Config,
        commands: CommandRegistry,
        store: StateStore,
        gateway: Arc<dyn ChatGateway>,
        source: Arc<dyn PostSource>,
    ) -> Result<Self, StateError> {
        let snapshot = store.load()?;
        info!(
            "loaded state from {} channels={} tracking={}",
            store.path().display(),
            snapshot.channels.len(),
            snapshot.tracking
        );

        Ok(Self {
            commands,
            display_name: config.bot.display_name.clone(),
            poll_interval: config.tracking.poll_interval(),
            gateway,
            source,
            store,
            state: Mutex::new(BotState {
                channels: snapshot.channels,
                tracking: TrackingState::new(snapshot.tracking),
            }),
            ready: AtomicBool::new(false),
            user_id: AtomicU64::new(0),
        })
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn gateway(&self) -> &dyn ChatGateway {
        self.gateway.as_ref()
    }

    pub fn source(&self) -> &dyn PostSource {
        self.source.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub(crate) async fn lock_state(&self) -> MutexGuard<'_, BotState> {
        self.state.lock().await
    }

    /// Re-reads the state file. The last-seen post is kept, it is never
    /// persisted.
    pub async fn load_config(&self) -> Result<(), StateError> {
        let snapshot = self.store.load()?;
        let mut state = self.state.lock().await;
        state.channels = snapshot.channels;
        state.tracking.enabled = snapshot.tracking;
        Ok(())
    }

    /// Writes the current state to disk. The write happens under the state
    /// lock, so saves never interleave.
    pub async fn save_config(&self) -> Result<(), StateError> {
        let state = self.state.lock().await;
        self.store.save(&state.snapshot())?;
        info!("successfully saved config to '{}'", self.store.path().display());
        Ok(())
    }

    pub async fn add_channel(&self, channel_id: u64, role: &str) -> Result<(), StateError> {
        let previous = self.state.lock().await.channels.add_channel(channel_id, role);
        if let Some(previous) = previous {
            debug!("channel role '{}' moved from {} to {}", role, previous, channel_id);
        }
        self.save_config().await
    }

    pub async fn channel(&self, role: &str) -> Option<u64> {
        self.state.lock().await.channels.get(role)
    }

    pub async fn tracking_enabled(&self) -> bool {
        self.state.lock().await.tracking.enabled
    }

    /// Sets the tracking flag, persists it, and starts the loop when enabling.
    /// Disabling takes effect the next time the loop wakes up.
    pub async fn set_tracking(self: &Arc<Self>, enabled: bool) -> Result<(), StateError> {
        self.state.lock().await.tracking.enabled = enabled;
        self.save_config().await?;
        if enabled {
            self.start_tracking().await;
        }
        Ok(())
    }

    /// Spawns the tracking loop unless the gateway is not ready yet, tracking
    /// is disabled, or a loop is already alive. Returns whether one was spawned.
    pub async fn start_tracking(self: &Arc<Self>) -> bool {
        if !self.is_ready() {
            debug!("tracking start deferred until the gateway is ready");
            return false;
        }

        {
            let mut state = self.state.lock().await;
            if !state.tracking.enabled || state.tracking.is_running() {
                return false;
            }
            state.tracking.mark_running();
        }

        let tracker = Tracker::new(self.clone());
        tokio::spawn(tracker.run());
        true
    }

    pub async fn on_ready(self: &Arc<Self>, user_id: u64) {
        self.user_id.store(user_id, Ordering::Release);
        self.ready.store(true, Ordering::Release);
        info!("Ready!");

        if let Err(err) = self.load_config().await {
            warn!("failed to reload state on ready, keeping current state: {err}");
        }

        if self.tracking_enabled().await {
            self.start_tracking().await;
        }
    }

    /// Entry point for every received message.
    pub async fn handle_message(self: &Arc<Self>, message: &IncomingMessage) -> Result<DispatchOutcome> {
        if message.author_id == self.user_id.load(Ordering::Acquire) {
            return Ok(DispatchOutcome::Ignored);
        }

        debug!(
            "received '{}' from user '{}', channel {}",
            message.content, message.author_tag, message.channel_id
        );

        if let Some(commands_channel) = self.channel(COMMANDS_ROLE).await {
            if message.channel_id != commands_channel {
                return Ok(DispatchOutcome::Ignored);
            }
        }

        self.commands.dispatch(self, message).await
    }

    pub async fn reply(&self, message: &IncomingMessage, content: &str) -> Result<()> {
        if let Err(err) = self.gateway.reply(message, content).await {
            warn!("failed to reply to {}: {err:#}", message.author_tag);
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::commands::DispatchOutcome;
    use crate::state::{COMMANDS_ROLE, NEWS_ROLE, StateStore};
    use crate::test_support::{BOT_USER_ID, TestHarness, message_in};

    #[tokio::test]
    async fn missing_state_file_starts_empty_and_is_written() {
        let harness = TestHarness::new();

        let bot = harness.bot();

        assert!(harness.state_path().exists());
        assert_eq!(bot.channel(NEWS_ROLE).await, None);
        assert!(!bot.tracking_enabled().await);
    }

    #[tokio::test]
    async fn add_channel_is_last_write_wins_and_saves_each_time() {
        let harness = TestHarness::new();
        let bot = harness.bot();

        bot.add_channel(111, NEWS_ROLE).await.expect("add");
        assert_eq!(harness.saved_snapshot().channels.get(NEWS_ROLE), Some(111));

        bot.add_channel(222, NEWS_ROLE).await.expect("add");
        assert_eq!(harness.saved_snapshot().channels.get(NEWS_ROLE), Some(222));
        assert_eq!(bot.channel(NEWS_ROLE).await, Some(222));
    }

    #[tokio::test]
    async fn save_then_load_reproduces_state() {
        let harness = TestHarness::new();
        let bot = harness.bot();
        bot.add_channel(123, NEWS_ROLE).await.expect("add news");
        bot.add_channel(456, COMMANDS_ROLE).await.expect("add commands");
        bot.set_tracking(true).await.expect("enable tracking");

        let reloaded = harness.bot_from(StateStore::new(harness.state_path()));

        assert_eq!(reloaded.channel(NEWS_ROLE).await, Some(123));
        assert_eq!(reloaded.channel(COMMANDS_ROLE).await, Some(456));
        assert!(reloaded.tracking_enabled().await);
    }

    #[tokio::test]
    async fn load_config_picks_up_external_changes() {
        let harness = TestHarness::new();
        let bot = harness.bot();
        std::fs::write(harness.state_path(), r#"{"channels":{"news":7},"tracking":true}"#)
            .expect("write state");

        bot.load_config().await.expect("load");

        assert_eq!(bot.channel(NEWS_ROLE).await, Some(7));
        assert!(bot.tracking_enabled().await);
    }

    #[tokio::test]
    async fn own_messages_are_ignored() {
        let harness = TestHarness::new();
        let bot = harness.bot();
        bot.on_ready(BOT_USER_ID).await;

        let mut message = message_in(10, "!help");
        message.author_id = BOT_USER_ID;

        let outcome = bot.handle_message(&message).await.expect("handle");

        assert_eq!(outcome, DispatchOutcome::Ignored);
        assert!(harness.gateway.replies().is_empty());
    }

    #[tokio::test]
    async fn commands_channel_gates_other_channels() {
        let harness = TestHarness::new();
        let bot = harness.bot();
        bot.add_channel(10, COMMANDS_ROLE).await.expect("add");

        let elsewhere = bot
            .handle_message(&message_in(11, "!help"))
            .await
            .expect("handle");
        assert_eq!(elsewhere, DispatchOutcome::Ignored);

        let here = bot
            .handle_message(&message_in(10, "!help"))
            .await
            .expect("handle");
        assert_eq!(here, DispatchOutcome::Handled("help".to_string()));
        assert_eq!(harness.gateway.replies().len(), 1);
    }

    #[tokio::test]
    async fn tracking_does_not_start_before_ready() {
        let harness = TestHarness::new();
        let bot: Arc<_> = harness.bot();

        bot.set_tracking(true).await.expect("enable");

        assert!(!bot.start_tracking().await);
        assert!(!bot.lock_state().await.tracking.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn ready_starts_tracking_when_enabled_in_config() {
        let harness = TestHarness::new();
        std::fs::write(harness.state_path(), r#"{"channels":{},"tracking":true}"#)
            .expect("write state");
        let bot = harness.bot();

        bot.on_ready(BOT_USER_ID).await;

        assert!(bot.is_ready());
        assert!(bot.lock_state().await.tracking.is_running());
        assert!(!bot.start_tracking().await, "a second loop must not be spawned");
    }

    #[tokio::test]
    async fn save_config_writes_current_state() {
        let harness = TestHarness::new();
        let bot = harness.bot();
        {
            let mut state = bot.lock_state().await;
            state.channels.add_channel(5, NEWS_ROLE);
            state.tracking.enabled = true;
        }
        assert_eq!(harness.saved_snapshot().channels.get(NEWS_ROLE), None);

        bot.save_config().await.expect("save");

        let saved = harness.saved_snapshot();
        assert_eq!(saved.channels.get(NEWS_ROLE), Some(5));
        assert!(saved.tracking);
    }

    #[tokio::test(start_paused = true)]
    async fn ready_reloads_the_state_file() {
        let harness = TestHarness::new();
        let bot = harness.bot();
        std::fs::write(harness.state_path(), r#"{"channels":{"news":9},"tracking":true}"#)
            .expect("write state");

        bot.on_ready(BOT_USER_ID).await;

        assert_eq!(bot.channel(NEWS_ROLE).await, Some(9));
        assert!(bot.lock_state().await.tracking.is_running());
    }
}

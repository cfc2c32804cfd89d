use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use parking_lot::RwLock as SyncRwLock;
use serenity::all::{
    ChannelId, Client as SerenityClient, Context as SerenityContext, CreateAllowedMentions,
    CreateMessage, EventHandler as SerenityEventHandler, GatewayIntents, Http,
    Message as SerenityMessage, MessageId, Ready,
};
use tokio::sync::{Mutex as AsyncMutex, RwLock, oneshot};
use tracing::{debug, error, info};

use crate::bot::Bot;

const INITIAL_LOGIN_RETRY_SECONDS: u64 = 2;
const MAX_LOGIN_RETRY_SECONDS: u64 = 300;
const READY_TIMEOUT_SECONDS: u64 = 30;

/// Longest message content the chat service accepts, in chars.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// A received chat message, detached from the gateway's model types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub id: u64,
    pub channel_id: u64,
    pub author_id: u64,
    pub author_tag: String,
    pub content: String,
}

impl IncomingMessage {
    fn from_serenity(msg: &SerenityMessage) -> Self {
        Self {
            id: msg.id.get(),
            channel_id: msg.channel_id.get(),
            author_id: msg.author.id.get(),
            author_tag: msg.author.tag(),
            content: msg.content.clone(),
        }
    }
}

/// Outbound side of the chat gateway.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Posts `content` to a channel and returns the new message id.
    async fn send_message(&self, channel_id: u64, content: &str) -> Result<u64>;

    /// Replies to `message` without pinging its author.
    async fn reply(&self, message: &IncomingMessage, content: &str) -> Result<u64>;
}

#[derive(Clone)]
pub struct DiscordClient {
    token: Arc<str>,
    login_state: Arc<AsyncMutex<DiscordLoginState>>,
    bot: Arc<SyncRwLock<Option<Arc<Bot>>>>,
    http: Arc<RwLock<Option<Arc<Http>>>>,
}

#[derive(Default)]
struct DiscordLoginState {
    is_logged_in: bool,
    gateway_task: Option<tokio::task::JoinHandle<()>>,
    gateway_abort: Option<tokio::task::AbortHandle>,
}

struct GatewayHandler {
    ready_sender: AsyncMutex<Option<oneshot::Sender<()>>>,
    bot: Arc<SyncRwLock<Option<Arc<Bot>>>>,
}

impl GatewayHandler {
    fn bot(&self) -> Option<Arc<Bot>> {
        self.bot.read().clone()
    }
}

#[serenity::async_trait]
impl SerenityEventHandler for GatewayHandler {
    async fn ready(&self, _ctx: SerenityContext, ready: Ready) {
        info!(
            "discord gateway ready as {} ({})",
            ready.user.name, ready.user.id
        );
        if let Some(sender) = self.ready_sender.lock().await.take() {
            let _ = sender.send(());
        }

        match self.bot() {
            Some(bot) => bot.on_ready(ready.user.id.get()).await,
            None => debug!("gateway ready before bot binding"),
        }
    }

    async fn message(&self, _ctx: SerenityContext, msg: SerenityMessage) {
        let Some(bot) = self.bot() else {
            debug!("ignoring discord message before bot binding");
            return;
        };

        let incoming = IncomingMessage::from_serenity(&msg);
        if let Err(err) = bot.handle_message(&incoming).await {
            error!(
                "failed to handle discord message channel_id={} message_id={}: {err:#}",
                incoming.channel_id, incoming.id
            );
        }
    }
}

impl DiscordClient {
    pub fn new(token: impl Into<Arc<str>>) -> Self {
        info!("initializing discord client");
        Self {
            token: token.into(),
            login_state: Arc::new(AsyncMutex::new(DiscordLoginState::default())),
            bot: Arc::new(SyncRwLock::new(None)),
            http: Arc::new(RwLock::new(None)),
        }
    }

    pub fn set_bot(&self, bot: Arc<Bot>) {
        *self.bot.write() = Some(bot);
    }

    pub async fn login(&self) -> Result<()> {
        let mut state = self.login_state.lock().await;
        if state.is_logged_in {
            return Ok(());
        }

        let intents = GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT;

        let (ready_tx, ready_rx) = oneshot::channel();
        let event_handler = GatewayHandler {
            ready_sender: AsyncMutex::new(Some(ready_tx)),
            bot: self.bot.clone(),
        };

        let mut gateway_client = SerenityClient::builder(self.token.as_ref(), intents)
            .event_handler(event_handler)
            .await
            .map_err(|err| anyhow!("failed to build discord gateway client: {err}"))?;

        *self.http.write().await = Some(gateway_client.http.clone());

        let gateway_task = tokio::spawn(async move {
            if let Err(err) = gateway_client.start().await {
                error!("discord gateway stopped: {err}");
            }
        });

        match tokio::time::timeout(Duration::from_secs(READY_TIMEOUT_SECONDS), ready_rx).await {
            Ok(Ok(())) => {
                state.is_logged_in = true;
                state.gateway_abort = Some(gateway_task.abort_handle());
                state.gateway_task = Some(gateway_task);
                info!("discord bot login succeeded and gateway is connected");
                Ok(())
            }
            Ok(Err(_)) => {
                gateway_task.abort();
                Err(anyhow!("discord gateway exited before receiving Ready event"))
            }
            Err(_) => {
                gateway_task.abort();
                Err(anyhow!("timed out waiting for discord Ready event"))
            }
        }
    }

    pub async fn start(&self) -> Result<()> {
        let mut retry_seconds = INITIAL_LOGIN_RETRY_SECONDS;

        loop {
            match self.login().await {
                Ok(()) => {
                    info!("discord client is ready");
                    return Ok(());
                }
                Err(err) => {
                    error!(
                        "failed to start discord client: {err}. retrying in {} seconds",
                        retry_seconds
                    );
                    tokio::time::sleep(Duration::from_secs(retry_seconds)).await;
                    retry_seconds = (retry_seconds * 2).min(MAX_LOGIN_RETRY_SECONDS);
                }
            }
        }
    }

    /// Resolves once the gateway task ends on its own.
    pub async fn wait(&self) -> Result<()> {
        let task = self.login_state.lock().await.gateway_task.take();
        let Some(task) = task else {
            bail!("discord gateway is not running");
        };
        task.await
            .map_err(|err| anyhow!("discord gateway task join error: {err}"))?;
        let mut state = self.login_state.lock().await;
        state.is_logged_in = false;
        state.gateway_abort = None;
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        let mut state = self.login_state.lock().await;
        if !state.is_logged_in {
            return Ok(());
        }

        let abort = state.gateway_abort.take();
        if let Some(gateway_task) = state.gateway_task.take() {
            gateway_task.abort();
            match gateway_task.await {
                Ok(()) => info!("discord gateway task exited"),
                Err(join_err) if join_err.is_cancelled() => {
                    info!("discord gateway task aborted")
                }
                Err(join_err) => {
                    error!("discord gateway task join error: {join_err}");
                }
            }
        } else if let Some(abort) = abort {
            // `wait` owns the join handle.
            abort.abort();
            info!("discord gateway task aborted");
        }

        state.is_logged_in = false;
        info!("discord client stopped");
        Ok(())
    }

    async fn http(&self) -> Result<Arc<Http>> {
        self.http
            .read()
            .await
            .clone()
            .ok_or_else(|| anyhow!("discord http client not available"))
    }
}

#[async_trait]
impl ChatGateway for DiscordClient {
    async fn send_message(&self, channel_id: u64, content: &str) -> Result<u64> {
        let http = self.http().await?;
        let channel = to_channel_id(channel_id)?;

        let message = channel
            .send_message(http.as_ref(), CreateMessage::new().content(content))
            .await
            .map_err(|e| anyhow!("failed to send message to channel {channel_id}: {e}"))?;

        debug!("sent message to channel {}, message_id={}", channel_id, message.id);
        Ok(message.id.get())
    }

    async fn reply(&self, message: &IncomingMessage, content: &str) -> Result<u64> {
        let http = self.http().await?;
        let channel = to_channel_id(message.channel_id)?;
        let reference = MessageId::new(message.id);

        let builder = CreateMessage::new()
            .content(content)
            .reference_message((channel, reference))
            .allowed_mentions(CreateAllowedMentions::new().replied_user(false));

        let sent = channel
            .send_message(http.as_ref(), builder)
            .await
            .map_err(|e| anyhow!("failed to reply to message {}: {e}", message.id))?;

        debug!(
            "replied in channel {} to message_id={}, message_id={}",
            message.channel_id, message.id, sent.id
        );
        Ok(sent.id.get())
    }
}

fn to_channel_id(channel_id: u64) -> Result<ChannelId> {
    if channel_id == 0 {
        bail!("invalid channel id: {channel_id}");
    }
    Ok(ChannelId::new(channel_id))
}

#[cfg(test)]
mod tests {
    use super::to_channel_id;

    #[test]
    fn zero_channel_id_is_rejected() {
        assert!(to_channel_id(0).is_err());
    }

    #[test]
    fn non_zero_channel_id_is_accepted() {
        assert_eq!(to_channel_id(42).expect("channel id").get(), 42);
    }
}

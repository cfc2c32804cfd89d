//! Fakes and fixtures shared by unit tests.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use anyhow::{Result, bail};
use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use crate::bot::Bot;
use crate::commands::CommandRegistry;
use crate::config::Config;
use crate::discord::{ChatGateway, IncomingMessage, MAX_MESSAGE_CHARS};
use crate::instagram::{PollError, Post, PostSource};
use crate::state::{ConfigurationSnapshot, StateStore};

pub const BOT_USER_ID: u64 = 1_000;
const AUTHOR_ID: u64 = 2_000;

pub fn message_in(channel_id: u64, content: &str) -> IncomingMessage {
    static NEXT_ID: AtomicU64 = AtomicU64::new(1);
    IncomingMessage {
        id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
        channel_id,
        author_id: AUTHOR_ID,
        author_tag: "tester#0001".to_string(),
        content: content.to_string(),
    }
}

pub fn post(id: &str) -> Post {
    Post {
        id: id.to_string(),
        caption: format!("caption {id}"),
        media_url: format!("https://cdn.example/{id}.jpg"),
        permalink: Some(format!("https://instagram.example/p/{id}")),
        timestamp: None,
    }
}

/// Records outbound traffic instead of talking to a chat service.
#[derive(Default)]
pub struct FakeGateway {
    sent: Mutex<Vec<(u64, String)>>,
    replies: Mutex<Vec<String>>,
    fail: AtomicBool,
    next_id: AtomicU64,
}

impl FakeGateway {
    pub fn fail_sends(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(u64, String)> {
        self.sent.lock().clone()
    }

    pub fn replies(&self) -> Vec<String> {
        self.replies.lock().clone()
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl ChatGateway for FakeGateway {
    async fn send_message(&self, channel_id: u64, content: &str) -> Result<u64> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("send to channel {channel_id} refused");
        }
        if content.chars().count() > MAX_MESSAGE_CHARS {
            bail!("message to channel {channel_id} too large");
        }
        self.sent.lock().push((channel_id, content.to_string()));
        Ok(self.next_id())
    }

    async fn reply(&self, _message: &IncomingMessage, content: &str) -> Result<u64> {
        self.replies.lock().push(content.to_string());
        Ok(self.next_id())
    }
}

/// Hands out queued poll results, then reports an empty feed.
#[derive(Default)]
pub struct FakeSource {
    queue: Mutex<VecDeque<Result<Post, PollError>>>,
    polls: AtomicUsize,
}

impl FakeSource {
    pub fn push(&self, post: Post) {
        self.queue.lock().push_back(Ok(post));
    }

    pub fn push_all(&self, posts: impl IntoIterator<Item = Post>) {
        self.queue.lock().extend(posts.into_iter().map(Ok));
    }

    pub fn push_error(&self, err: PollError) {
        self.queue.lock().push_back(Err(err));
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PostSource for FakeSource {
    async fn latest_post(&self) -> Result<Post, PollError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.queue.lock().pop_front().unwrap_or(Err(PollError::Empty))
    }
}

pub struct TestHarness {
    dir: TempDir,
    pub gateway: Arc<FakeGateway>,
    pub source: Arc<FakeSource>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("temp dir"),
            gateway: Arc::new(FakeGateway::default()),
            source: Arc::new(FakeSource::default()),
        }
    }

    pub fn config(&self) -> Config {
        let mut config: Config = serde_yaml::from_str("{}").expect("default config");
        config.bot.state_path = self.state_path();
        config
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.path().join("config.json")
    }

    pub fn bot(&self) -> Arc<Bot> {
        self.bot_from(StateStore::new(self.state_path()))
    }

    pub fn bot_from(&self, store: StateStore) -> Arc<Bot> {
        let config = self.config();
        let commands = CommandRegistry::with_builtin(&config.bot.command_prefix);
        self.build(&config, commands, store)
    }

    pub fn bot_with_commands(&self, commands: CommandRegistry) -> Arc<Bot> {
        let config = self.config();
        self.build(&config, commands, StateStore::new(self.state_path()))
    }

    pub fn saved_snapshot(&self) -> ConfigurationSnapshot {
        let raw = std::fs::read_to_string(self.state_path()).expect("state file");
        serde_json::from_str(&raw).expect("state json")
    }

    fn build(&self, config: &Config, commands: CommandRegistry, store: StateStore) -> Arc<Bot> {
        let bot = Bot::with_commands(
            config,
            commands,
            store,
            self.gateway.clone(),
            self.source.clone(),
        )
        .expect("bot");
        Arc::new(bot)
    }
}

use std::sync::Arc;

use anyhow::{Result, anyhow};
use tracing::{debug, error, info, warn};

use crate::bot::Bot;
use crate::discord::MAX_MESSAGE_CHARS;
use crate::instagram::Post;
use crate::state::NEWS_ROLE;

/// `enabled` is the persisted switch. `running` tells whether a loop task is
/// alive, and `last_seen` is the last post handed to the news channel.
#[derive(Debug, Default)]
pub struct TrackingState {
    pub enabled: bool,
    running: bool,
    last_seen: Option<Post>,
}

impl TrackingState {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            running: false,
            last_seen: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn last_seen(&self) -> Option<&Post> {
        self.last_seen.as_ref()
    }

    pub(crate) fn mark_running(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Tracking was switched off; the loop ends.
    Disabled,
    /// Same post as last time, nothing sent.
    Unchanged,
    Posted,
    /// Transient content-source failure, retried next cycle.
    Skipped,
    /// Delivery or polling failed for good; tracking is now off.
    Failed,
}

impl CycleOutcome {
    fn ends_loop(self) -> bool {
        matches!(self, CycleOutcome::Disabled | CycleOutcome::Failed)
    }
}

/// Polls the content source and relays new posts to the news channel.
pub struct Tracker {
    bot: Arc<Bot>,
}

impl Tracker {
    pub fn new(bot: Arc<Bot>) -> Self {
        Self { bot }
    }

    pub async fn run(self) {
        let interval = self.bot.poll_interval();
        info!("tracking started, polling every {}s", interval.as_secs());

        loop {
            tokio::time::sleep(interval).await;
            let outcome = self.cycle().await;
            debug!("tracking cycle finished: {:?}", outcome);
            if outcome.ends_loop() {
                break;
            }
        }

        info!("tracking stopped");
    }

    /// One poll-compare-post step.
    pub async fn cycle(&self) -> CycleOutcome {
        if !self.still_enabled().await {
            return CycleOutcome::Disabled;
        }

        let post = match self.bot.source().latest_post().await {
            Ok(post) => post,
            Err(err) if err.is_transient() => {
                warn!("polling instagram failed, skipping this cycle: {err}");
                return CycleOutcome::Skipped;
            }
            Err(err) => {
                error!("exception caught while polling instagram posts: {err}");
                self.halt().await;
                return CycleOutcome::Failed;
            }
        };

        let news_channel = {
            let mut state = self.bot.lock_state().await;
            if !state.tracking.enabled {
                state.tracking.stop();
                return CycleOutcome::Disabled;
            }
            if state.tracking.last_seen() == Some(&post) {
                return CycleOutcome::Unchanged;
            }
            state.tracking.last_seen = Some(post.clone());
            state.channels.get(NEWS_ROLE)
        };

        match self.deliver(news_channel, &post).await {
            Ok(()) => {
                info!(
                    "relayed instagram post {} ({}, published {}) to the news channel",
                    post.id,
                    post.permalink.as_deref().unwrap_or("no permalink"),
                    post.timestamp.as_deref().unwrap_or("unknown"),
                );
                CycleOutcome::Posted
            }
            Err(err) => {
                error!(
                    "exception caught while tracking instagram posts (post {}): {err:#}",
                    post.id
                );
                self.halt().await;
                CycleOutcome::Failed
            }
        }
    }

    async fn still_enabled(&self) -> bool {
        let mut state = self.bot.lock_state().await;
        if !state.tracking.enabled {
            state.tracking.stop();
            return false;
        }
        true
    }

    /// Media URL first, then the caption, each split to fit one chat message.
    /// Empty parts are not sent.
    async fn deliver(&self, news_channel: Option<u64>, post: &Post) -> Result<()> {
        let channel_id = news_channel.ok_or_else(|| {
            anyhow!("unknown channel '{NEWS_ROLE}', configure it with the news_channel command")
        })?;

        for content in [post.media_url.as_str(), post.caption.as_str()] {
            for chunk in split_message(content, MAX_MESSAGE_CHARS) {
                self.bot.gateway().send_message(channel_id, chunk).await?;
            }
        }
        Ok(())
    }

    /// Turns tracking off until someone enables it again.
    async fn halt(&self) {
        {
            let mut state = self.bot.lock_state().await;
            state.tracking.enabled = false;
            state.tracking.stop();
        }
        if let Err(err) = self.bot.save_config().await {
            error!("failed to persist tracking shutdown: {err}");
        }
    }
}

/// Cuts `text` into pieces of at most `limit` chars, on char boundaries.
fn split_message(text: &str, limit: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let end = rest
            .char_indices()
            .nth(limit)
            .map_or(rest.len(), |(idx, _)| idx);
        let (chunk, tail) = rest.split_at(end);
        chunks.push(chunk);
        rest = tail;
    }
    chunks
}

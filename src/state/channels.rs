use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Role of the channel the bot accepts commands from.
pub const COMMANDS_ROLE: &str = "commands";
/// Role of the channel Instagram posts are relayed to.
pub const NEWS_ROLE: &str = "news";

/// Role name to channel id. Role names are case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelRegistry {
    channels: BTreeMap<String, u64>,
}

impl ChannelRegistry {
    /// Maps `role` to `channel_id`, returning the id it replaced.
    pub fn add_channel(&mut self, channel_id: u64, role: &str) -> Option<u64> {
        self.channels.insert(role.to_string(), channel_id)
    }

    pub fn get(&self, role: &str) -> Option<u64> {
        self.channels.get(role).copied()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{ChannelRegistry, NEWS_ROLE};

    #[test]
    fn add_channel_overwrites_previous_mapping() {
        let mut registry = ChannelRegistry::default();

        assert_eq!(registry.add_channel(1, NEWS_ROLE), None);
        assert_eq!(registry.add_channel(2, NEWS_ROLE), Some(1));

        assert_eq!(registry.get(NEWS_ROLE), Some(2));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn role_names_are_case_sensitive() {
        let mut registry = ChannelRegistry::default();
        registry.add_channel(5, "news");

        assert_eq!(registry.get("News"), None);
        assert_eq!(registry.get("news"), Some(5));
    }

    #[test]
    fn serializes_as_plain_object() {
        let mut registry = ChannelRegistry::default();
        registry.add_channel(123, "news");
        registry.add_channel(456, "commands");

        let json = serde_json::to_string(&registry).expect("serialize");
        assert_eq!(json, r#"{"commands":456,"news":123}"#);
    }
}

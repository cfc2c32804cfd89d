pub use self::channels::{COMMANDS_ROLE, ChannelRegistry, NEWS_ROLE};
pub use self::store::{ConfigurationSnapshot, StateError, StateStore};

mod channels;
mod store;

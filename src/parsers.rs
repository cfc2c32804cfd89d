pub mod command_parser;
pub mod mention;

pub use command_parser::parse_prefixed_command;
pub use mention::{channel_mention, parse_channel_mention};

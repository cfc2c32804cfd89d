/// Extracts the channel id from a `<#123>` mention token.
///
/// Zero is rejected as well, since no Discord snowflake can be zero.
pub fn parse_channel_mention(token: &str) -> Option<u64> {
    let digits = token.strip_prefix("<#")?.strip_suffix('>')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u64>().ok().filter(|id| *id != 0)
}

pub fn channel_mention(channel_id: u64) -> String {
    format!("<#{channel_id}>")
}

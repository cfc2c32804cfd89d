#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand<'a> {
    pub name: &'a str,
    pub args: Vec<&'a str>,
}

/// Splits `content` on whitespace into a command name and its arguments.
///
/// Returns `None` when the first token does not carry `prefix`, which is how
/// regular chat is told apart from commands. A bare prefix yields an empty
/// name so the caller can reject it like any other unknown command.
pub fn parse_prefixed_command<'a>(content: &'a str, prefix: &str) -> Option<ParsedCommand<'a>> {
    let mut tokens = content.split_whitespace();
    let name = tokens.next()?.strip_prefix(prefix)?;
    Some(ParsedCommand {
        name,
        args: tokens.collect(),
    })
}

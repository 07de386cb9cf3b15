#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Help,
    History(Option<usize>),
    Clear,
    Trace,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParseError {
    message: String,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub(crate) fn message(&self) -> &str {
        &self.message
    }
}

pub(crate) const HELP_TEXT: &str = "Available commands:\n  /help          Show this command list\n  /history [n]   Show the conversation so far (or the last n messages)\n  /clear         Start a new conversation\n  /trace         Show path to the current trace file\n  /exit          Leave the chat (also /quit)";

pub(crate) fn parse_command(line: &str) -> Result<Command, ParseError> {
    if !line.starts_with('/') {
        return Err(ParseError::new("not a command"));
    }

    let trimmed = line.trim();
    let command_text = &trimmed[1..];
    let mut parts = command_text.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or("").to_ascii_lowercase();
    if name.is_empty() {
        return Err(ParseError::new("empty command. Try /help"));
    }
    let rest = parts.next().map(str::trim).unwrap_or("");

    match name.as_str() {
        "help" => expect_no_args(rest, Command::Help, "usage: /help"),
        "history" => parse_history(rest),
        "clear" => expect_no_args(rest, Command::Clear, "usage: /clear"),
        "trace" => expect_no_args(rest, Command::Trace, "usage: /trace"),
        "exit" | "quit" => expect_no_args(rest, Command::Exit, "usage: /exit"),
        _ => Err(ParseError::new(format!(
            "unknown command '/{name}'. Try /help"
        ))),
    }
}

/// A command is `/name` where the first word holds no further slash, so
/// paths like `/etc/hosts` go to the model. `//` escapes a leading slash.
pub(crate) fn is_command_line(line: &str) -> bool {
    let Some(rest) = line.strip_prefix('/') else {
        return false;
    };
    if rest.starts_with('/') {
        return false;
    }
    let name = rest.split(char::is_whitespace).next().unwrap_or("");
    !name.contains('/')
}

/// Text to send for a non-command line, with a `//` escape reduced to `/`.
pub(crate) fn message_text(line: &str) -> &str {
    if line.starts_with("//") { &line[1..] } else { line }
}

fn expect_no_args(rest: &str, command: Command, usage: &str) -> Result<Command, ParseError> {
    if rest.is_empty() {
        Ok(command)
    } else {
        Err(ParseError::new(usage))
    }
}

fn parse_history(rest: &str) -> Result<Command, ParseError> {
    if rest.is_empty() {
        return Ok(Command::History(None));
    }

    let value = rest
        .parse::<usize>()
        .map_err(|_| ParseError::new("usage: /history [n]"))?;
    if value == 0 {
        return Err(ParseError::new("usage: /history [n] (n must be >= 1)"));
    }

    Ok(Command::History(Some(value)))
}

use super::commands::{Command, HELP_TEXT, is_command_line, message_text, parse_command};
use super::display::format_segments;
use super::theme::Theme;
use crate::config::ThemeToken;
use crate::orchestrator::Orchestrator;
use crate::payload::Role;
use crate::render::render;
use crate::tools::Tool;
use crate::tools::chat::{Conversation, GREETING, send_message};
use crate::trace::{SessionTrace, TraceEvent};
use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

const PROMPT: &str = "you> ";

pub(crate) struct ChatSession<'a> {
    orchestrator: &'a Orchestrator,
    theme: Theme,
    trace: Option<SessionTrace>,
    conversation: Conversation,
}

impl<'a> ChatSession<'a> {
    pub(crate) fn new(
        orchestrator: &'a Orchestrator,
        theme: Theme,
        trace: Option<SessionTrace>,
    ) -> Self {
        Self {
            orchestrator,
            theme,
            trace,
            conversation: Conversation::new(),
        }
    }

    /// Reads lines until EOF or `/exit`. Failed turns are reported and the
    /// session keeps going with its history intact.
    pub(crate) async fn run<R, W>(&mut self, input: R, out: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();
        writeln!(
            out,
            "{}",
            self.theme.paint(
                ThemeToken::SystemInfo,
                format!(
                    "{}: {} Type /help for commands.",
                    Tool::Chat.title(),
                    Tool::Chat.description()
                )
            )
        )?;
        writeln!(out, "{}", self.theme.paint(ThemeToken::ModelMessage, GREETING))?;

        loop {
            write!(out, "{}", self.theme.paint(ThemeToken::Prompt, PROMPT))?;
            out.flush()?;

            let Some(line) = lines.next_line().await? else {
                writeln!(out)?;
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if is_command_line(line) {
                if !self.handle_command(line, out)? {
                    break;
                }
                continue;
            }

            self.handle_message(message_text(line), out).await?;
        }

        Ok(())
    }

    /// Returns `false` when the session should end.
    fn handle_command<W: Write>(&mut self, line: &str, out: &mut W) -> Result<bool> {
        let command = match parse_command(line) {
            Ok(command) => command,
            Err(err) => {
                writeln!(out, "{}", self.theme.paint(ThemeToken::SystemError, err.message()))?;
                return Ok(true);
            }
        };

        match command {
            Command::Help => {
                writeln!(out, "{}", self.theme.paint(ThemeToken::SystemInfo, HELP_TEXT))?;
            }
            Command::History(limit) => self.print_history(limit, out)?,
            Command::Clear => {
                self.conversation = Conversation::new();
                writeln!(
                    out,
                    "{}",
                    self.theme.paint(ThemeToken::SystemInfo, "Started a new conversation.")
                )?;
            }
            Command::Trace => {
                let message = match &self.trace {
                    Some(trace) => format!("Trace file: {}", trace.file_path().display()),
                    None => {
                        "Tracing is off. Restart with --trace to record this session.".to_string()
                    }
                };
                writeln!(out, "{}", self.theme.paint(ThemeToken::SystemInfo, message))?;
            }
            Command::Exit => return Ok(false),
        }

        Ok(true)
    }

    fn print_history<W: Write>(&self, limit: Option<usize>, out: &mut W) -> Result<()> {
        let messages = self.conversation.messages();
        if messages.is_empty() {
            writeln!(out, "{}", self.theme.paint(ThemeToken::SystemInfo, "No messages yet."))?;
            return Ok(());
        }

        let skip = limit.map_or(0, |limit| messages.len().saturating_sub(limit));
        for message in &messages[skip..] {
            let (label, token) = match message.role {
                Role::User => ("you", ThemeToken::UserMessage),
                Role::Model => ("gbit", ThemeToken::ModelMessage),
            };
            writeln!(
                out,
                "{} {}",
                self.theme.paint(token, format!("{label}:")),
                message.text
            )?;
        }
        Ok(())
    }

    async fn handle_message<W: Write>(&mut self, line: &str, out: &mut W) -> Result<()> {
        if let Some(trace) = &self.trace {
            trace.record(TraceEvent::ToolInput {
                tool: Tool::Chat,
                text: line,
            });
        }

        let conversation = std::mem::take(&mut self.conversation);
        let turn = send_message(self.orchestrator, conversation, line).await;
        self.conversation = turn.conversation;

        match turn.reply {
            Ok(reply) => {
                if let Some(trace) = &self.trace {
                    trace.record(TraceEvent::ToolOutput {
                        tool: Tool::Chat,
                        text: &reply,
                    });
                }
                write!(out, "{}", format_segments(&self.theme, &render(Some(&reply))))?;
            }
            Err(err) => {
                if let Some(trace) = &self.trace {
                    trace.record(TraceEvent::Failure {
                        text: &err.to_string(),
                    });
                }
                writeln!(
                    out,
                    "{}",
                    self.theme.paint(ThemeToken::SystemError, format!("error: {err}"))
                )?;
            }
        }
        Ok(())
    }
}

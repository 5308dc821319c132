//! Line-based conversation through the [`AccessGate`].
//!
//! Stands in for a chat transport: every input line is one message from a
//! single requester, every reply is written back followed by a blank line.

use std::io::{BufRead, Write};

use anyhow::Result;
use wiseacre_core::{AccessGate, replies};
use wiseacre_types::RequesterId;

pub struct ChatSession<'a> {
    gate: &'a AccessGate,
    requester: RequesterId,
    display_name: Option<String>,
}

impl<'a> ChatSession<'a> {
    pub fn new(gate: &'a AccessGate, requester: RequesterId, display_name: Option<String>) -> Self {
        Self {
            gate,
            requester,
            display_name,
        }
    }

    /// Reply to one message, or `None` when the session should end.
    pub fn handle(&self, message: &str) -> Option<String> {
        let text = message.trim();
        let (command, rest) = text
            .split_once(char::is_whitespace)
            .map_or((text, ""), |(cmd, rest)| (cmd, rest.trim()));

        let reply = match command {
            "/quit" | "/exit" => return None,
            "/start" => replies::WELCOME.to_string(),
            "/logout" => {
                self.gate.sign_out(self.requester);
                replies::signed_out()
            }
            "/schedule" | "/расписание" => self.gate.reply_to_schedule(self.requester, rest),
            cmd if cmd.starts_with('/') => replies::unknown_command(),
            _ if self.gate.is_authenticated(self.requester) => {
                self.gate.reply_to_schedule(self.requester, text)
            }
            _ => self.gate.reply_to_credential(
                self.requester,
                self.display_name.as_deref(),
                text,
            ),
        };
        Some(reply)
    }

    /// Drive the session until `/quit` or end of input.
    pub fn run(&self, input: impl BufRead, mut output: impl Write) -> Result<()> {
        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match self.handle(&line) {
                Some(reply) => {
                    writeln!(output, "{reply}\n")?;
                    output.flush()?;
                }
                None => break,
            }
        }
        Ok(())
    }
}

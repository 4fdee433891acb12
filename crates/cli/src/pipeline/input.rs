//! Line-oriented message input.

use contracts::{Message, MsgPriority};

use crate::error::{CliError, Result};

/// Sender recorded on messages produced by the CLI
pub const CLI_SENDER: &str = "messenger-cli";

/// Parse one `priority|subject|body` line
///
/// The body is optional; `|` inside the body is kept verbatim.
pub fn parse_line(line_no: usize, line: &str) -> Result<Message> {
    let mut parts = line.splitn(3, '|');

    let priority_raw = parts.next().unwrap_or_default();
    let priority = MsgPriority::parse(priority_raw).ok_or_else(|| {
        CliError::invalid_input(line_no, format!("unknown priority '{}'", priority_raw.trim()))
    })?;

    let subject = parts
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CliError::invalid_input(line_no, "missing subject"))?;

    let body = parts.next().unwrap_or_default().to_string();

    Ok(Message::new(priority, subject, body).with_from(CLI_SENDER))
}

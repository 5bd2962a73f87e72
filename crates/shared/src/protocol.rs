//! Message scripts: the on-disk form of a message source.
//!
//! Two encodings are accepted. JSON scripts are an array of tagged messages
//! (`[{"type": "set", "payload": 128512}, {"type": "print"}]`). Text scripts
//! hold one statement per line:
//!
//! ```text
//! # comments and blank lines are skipped
//! set 128512
//! print
//! increment 803
//! ```

use std::{fmt, fs, path::Path, str::FromStr};

use crate::{domain::Message, error::ScriptError};

/// The statement sequence from the statements/messages/reducers walk-through.
pub fn demo_script() -> Vec<Message> {
    vec![
        Message::Set(128512),
        Message::Print,
        Message::Increment(803),
        Message::Print,
        Message::Set(10066329),
        Message::Print,
        Message::Set(128527),
        Message::Print,
        Message::Increment(14),
        Message::Print,
    ]
}

pub fn parse_script(raw: &str) -> Result<Vec<Message>, ScriptError> {
    if raw.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(raw)?);
    }

    let mut messages = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        if let Some(message) = parse_statement(idx + 1, line)? {
            messages.push(message);
        }
    }
    Ok(messages)
}

pub fn read_script(path: &Path) -> Result<Vec<Message>, ScriptError> {
    let raw = fs::read_to_string(path).map_err(|source| ScriptError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_script(&raw)
}

pub fn render_script(messages: &[Message]) -> String {
    let mut out = String::new();
    for message in messages {
        out.push_str(&message.to_string());
        out.push('\n');
    }
    out
}

fn parse_statement(line: usize, raw: &str) -> Result<Option<Message>, ScriptError> {
    let statement = match raw.split_once('#') {
        Some((before, _)) => before,
        None => raw,
    }
    .trim();
    if statement.is_empty() {
        return Ok(None);
    }

    let mut parts = statement.split_whitespace();
    let command = parts.next().unwrap_or_default().to_ascii_lowercase();
    let arguments: Vec<&str> = parts.collect();

    let message = match command.as_str() {
        "print" => {
            if !arguments.is_empty() {
                return Err(ScriptError::UnexpectedArgument { line, command });
            }
            Message::Print
        }
        "increment" | "inc" => Message::Increment(parse_argument(line, &command, &arguments)?),
        "set" => Message::Set(parse_argument(line, &command, &arguments)?),
        _ => return Err(ScriptError::UnknownCommand { line, command }),
    };
    Ok(Some(message))
}

/// Exactly one integer argument.
fn parse_argument(line: usize, command: &str, arguments: &[&str]) -> Result<i64, ScriptError> {
    let value = match arguments {
        [] => {
            return Err(ScriptError::MissingArgument {
                line,
                command: command.to_string(),
            })
        }
        [value] => *value,
        [_, ..] => {
            return Err(ScriptError::UnexpectedArgument {
                line,
                command: command.to_string(),
            })
        }
    };
    value.parse::<i64>().map_err(|_| ScriptError::InvalidArgument {
        line,
        value: value.to_string(),
    })
}

impl FromStr for Message {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_statement(1, s)?.ok_or(ScriptError::EmptyStatement)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Print => f.write_str("print"),
            Message::Increment(amount) => write!(f, "increment {amount}"),
            Message::Set(value) => write!(f, "set {value}"),
        }
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;

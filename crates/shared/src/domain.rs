use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One unit of input to a reducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Message {
    Print,
    Increment(i64),
    Set(i64),
}

impl Message {
    pub fn name(&self) -> &'static str {
        match self {
            Message::Print => "print",
            Message::Increment(_) => "increment",
            Message::Set(_) => "set",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReducerId(pub Uuid);

impl ReducerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReducerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReducerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Where a reducer runs relative to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Direct calls on the caller's thread.
    #[default]
    Sync,
    /// Dedicated tokio task fed through an async queue.
    Actor,
    /// Dedicated OS thread fed through a blocking queue.
    Worker,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Sync => "sync",
            ExecutionMode::Actor => "actor",
            ExecutionMode::Worker => "worker",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "sync" => Ok(ExecutionMode::Sync),
            "actor" => Ok(ExecutionMode::Actor),
            "worker" => Ok(ExecutionMode::Worker),
            _ => Err(format!(
                "unknown execution mode '{s}' (expected sync, actor or worker)"
            )),
        }
    }
}

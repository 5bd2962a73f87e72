use std::path::PathBuf;

use thiserror::Error;

/// Failures while reading a message script.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("invalid json script: {0}")]
    Json(#[from] serde_json::Error),
    #[error("line {line}: unknown command '{command}'")]
    UnknownCommand { line: usize, command: String },
    #[error("line {line}: '{command}' requires an integer argument")]
    MissingArgument { line: usize, command: String },
    #[error("line {line}: '{value}' is not a valid integer")]
    InvalidArgument { line: usize, value: String },
    #[error("line {line}: too many arguments for '{command}'")]
    UnexpectedArgument { line: usize, command: String },
    #[error("statement is empty")]
    EmptyStatement,
    #[error("failed to read script '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Plumbing failures between a caller and a running reducer. Message handling
/// itself never fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("reducer is no longer accepting messages")]
    Closed,
    #[error("reducer queue is full")]
    Full,
    #[error("worker startup failure: {0}")]
    WorkerStartup(String),
    #[error("worker thread panicked")]
    WorkerPanicked,
    #[error("reducer task failed: {0}")]
    ActorFailed(String),
}

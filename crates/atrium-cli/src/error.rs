use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] atrium_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Checklist has no item at index {index} (it has {len} items)")]
    InvalidIndex { index: usize, len: usize },
    #[error("Cannot {action} item {index}: {reason}")]
    InvalidChecklistAction {
        action: &'static str,
        index: usize,
        reason: &'static str,
    },
    #[error("Configuration error: {0}")]
    Config(String),
}

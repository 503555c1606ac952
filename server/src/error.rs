//! Error types for the typerace server

use crate::registry::ConnectionId;
use thiserror::Error;

/// Rejections from the player registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("connection {0} is already registered")]
    DuplicateConnection(ConnectionId),
    #[error("name \"{0}\" is already in use")]
    DuplicateName(String),
    #[error("no player named \"{0}\"")]
    UnknownPlayer(String),
}

#[derive(Debug, Error)]
pub enum WordBankError {
    #[error("word bank is empty")]
    Empty,
    #[error("requested {requested} words but the bank only holds {available}")]
    NotEnoughWords { requested: usize, available: usize },
    #[error("failed to read word file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("win threshold must be at least 1")]
    ZeroThreshold,
    #[error("sequence length must be at least 1")]
    EmptySequence,
    #[error("win threshold {threshold} exceeds the sequence length {sequence_length}")]
    ThresholdExceedsSequence {
        threshold: u32,
        sequence_length: usize,
    },
    #[error("sequence length {sequence_length} exceeds the {available} words in the bank")]
    NotEnoughWords {
        sequence_length: usize,
        available: usize,
    },
}

/// Errors confined to a single session event. They are logged and dropped.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    WordBank(#[from] WordBankError),
    #[error("player \"{0}\" has no cursor in the current match")]
    NoCursor(String),
    #[error("player \"{name}\" reached the end of the {length}-word sequence")]
    SequenceExhausted { name: String, length: usize },
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind: {0}")]
    Bind(#[from] std::io::Error),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("invalid settings: {0}")]
    Settings(#[from] SettingsError),
}

//! Text protocol spoken between the typerace server and its terminal clients.
//!
//! Every frame is a single UTF-8 text message. Clients send commands, answers
//! and the initial join message; the server answers with free-form lines plus
//! a handful of machine-readable markers the client folds into its local stats.

use std::fmt;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8080;
pub const MAX_NAME_LEN: usize = 24;

pub const JOIN_PREFIX: &str = "/join ";
pub const SCORE_MARKER: &str = "/score";
pub const ERRORS_MARKER: &str = "/errors";
pub const STATS_MARKER: &str = "/stats";
pub const WORD_PREFIX: &str = "Type: ";

/// Standard "going away" code, used for a voluntary `/leave`.
pub const CLOSE_LEAVE: u16 = 1001;
pub const CLOSE_FAULT: u16 = 4001;
pub const CLOSE_NAME_IN_USE: u16 = 4002;
pub const CLOSE_DUPLICATE_CONNECTION: u16 = 4003;
pub const CLOSE_INVALID_NAME: u16 = 4004;

/// Lobby commands. Matching is case-insensitive and accepts the Portuguese aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ready,
    Leave,
    Wait,
    ResumeWaiting,
}

impl Command {
    pub fn parse(text: &str) -> Option<Command> {
        match text.trim().to_lowercase().as_str() {
            "/ready" | "/pronto" => Some(Command::Ready),
            "/leave" | "/sair" => Some(Command::Leave),
            "/wait" | "/aguardar" => Some(Command::Wait),
            "/resume-waiting" | "/parar-de-aguardar" => Some(Command::ResumeWaiting),
            _ => None,
        }
    }
}

/// One line received from the server, classified for the client display
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerLine {
    Score(u32),
    Errors(u32),
    ShowStats,
    Text(String),
}

impl ServerLine {
    pub fn parse(line: &str) -> ServerLine {
        if line == STATS_MARKER {
            return ServerLine::ShowStats;
        }
        if let Some(value) = marker_value(line, SCORE_MARKER) {
            return ServerLine::Score(value);
        }
        if let Some(value) = marker_value(line, ERRORS_MARKER) {
            return ServerLine::Errors(value);
        }
        ServerLine::Text(line.to_string())
    }
}

impl fmt::Display for ServerLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerLine::Score(score) => write!(f, "{} {}", SCORE_MARKER, score),
            ServerLine::Errors(errors) => write!(f, "{} {}", ERRORS_MARKER, errors),
            ServerLine::ShowStats => f.write_str(STATS_MARKER),
            ServerLine::Text(text) => f.write_str(text),
        }
    }
}

fn marker_value(line: &str, marker: &str) -> Option<u32> {
    line.strip_prefix(marker)?
        .strip_prefix(' ')?
        .parse()
        .ok()
}

pub fn word_line(word: &str) -> String {
    format!("{}{}", WORD_PREFIX, word)
}

pub fn join_message(name: &str) -> String {
    format!("{}{}", JOIN_PREFIX, name)
}

/// Extracts the raw name from a join message. The prefix is case-insensitive.
pub fn parse_join(text: &str) -> Option<&str> {
    let prefix = text.get(..JOIN_PREFIX.len())?;
    if prefix.eq_ignore_ascii_case(JOIN_PREFIX) {
        Some(&text[JOIN_PREFIX.len()..])
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("name must not be empty")]
    Empty,
    #[error("name must be at most {} characters", MAX_NAME_LEN)]
    TooLong,
    #[error("name must not contain spaces or control characters")]
    InvalidCharacter,
}

/// A validated, case-sensitive player name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn parse(raw: &str) -> Result<DisplayName, NameError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(NameError::Empty);
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(NameError::TooLong);
        }
        if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(NameError::InvalidCharacter);
        }
        Ok(DisplayName(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

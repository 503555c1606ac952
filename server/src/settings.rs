//! Match tuning knobs

use crate::error::SettingsError;
use crate::word_bank::WordBank;
use std::time::Duration;

/// Fewest registered players that can start a countdown
pub const MIN_PLAYERS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSettings {
    /// Words drawn for each match
    pub sequence_length: usize,
    /// Correct words needed to win
    pub win_threshold: u32,
    /// Numbers announced before the match starts
    pub countdown_steps: u32,
    /// Delay between countdown announcements
    pub step_delay: Duration,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            sequence_length: 10,
            win_threshold: 10,
            countdown_steps: 5,
            step_delay: Duration::from_secs(1),
        }
    }
}

impl MatchSettings {
    /// Checks the settings against each other and against the word bank.
    ///
    /// A player's cursor always equals their score, so a threshold no larger
    /// than the sequence guarantees the winner is found before anyone runs
    /// out of words.
    pub fn validate(&self, bank: &WordBank) -> Result<(), SettingsError> {
        if self.win_threshold == 0 {
            return Err(SettingsError::ZeroThreshold);
        }
        if self.sequence_length == 0 {
            return Err(SettingsError::EmptySequence);
        }
        if self.win_threshold as usize > self.sequence_length {
            return Err(SettingsError::ThresholdExceedsSequence {
                threshold: self.win_threshold,
                sequence_length: self.sequence_length,
            });
        }
        if self.sequence_length > bank.len() {
            return Err(SettingsError::NotEnoughWords {
                sequence_length: self.sequence_length,
                available: bank.len(),
            });
        }
        Ok(())
    }
}

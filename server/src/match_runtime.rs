//! Answer validation while a match is running
//!
//! Every player races through the same word sequence on their own cursor.
//! A correct answer scores a point and reveals the next word; a wrong one
//! counts an error and the player retries the same word.

use crate::error::{RegistryError, SessionError};
use crate::registry::LobbyState;
use crate::session::{Outbox, Phase, Session};
use log::{error, info};
use shared::{word_line, ServerLine};

impl Session {
    /// Draws a fresh sequence and starts the match
    pub(crate) fn start_match(&mut self, out: &mut Outbox) -> Result<(), SessionError> {
        let words = match self.bank.draw(self.settings.sequence_length, &mut self.rng) {
            Ok(words) => words,
            Err(e) => {
                error!("Could not draw match words: {}", e);
                self.cancel_countdown("The match could not start. Try again.", out);
                return Err(e.into());
            }
        };
        self.begin_match(words, out);
        Ok(())
    }

    /// Puts every registered player into a match over `words`
    pub(crate) fn begin_match(&mut self, words: Vec<String>, out: &mut Outbox) {
        self.sequence = words;
        self.phase = Phase::InProgress;

        for player in self.registry.all_mut() {
            player.reset_progress();
            player.lobby_state = LobbyState::InMatch;
            player.cursor = Some(0);
        }

        info!(
            "Match started with {} players over {} words",
            self.registry.len(),
            self.sequence.len()
        );
        out.broadcast(format!(
            "Match started! First to {} points wins.",
            self.settings.win_threshold
        ));
        if let Some(first) = self.sequence.first() {
            out.broadcast(word_line(first));
        }
    }

    /// Lets a player who joined mid-match race from the first word
    pub(crate) fn admit_late_player(
        &mut self,
        name: &str,
        out: &mut Outbox,
    ) -> Result<(), SessionError> {
        self.registry.set_in_match(name)?;
        let player = self
            .registry
            .get_mut(name)
            .ok_or_else(|| RegistryError::UnknownPlayer(name.to_string()))?;
        player.cursor = Some(0);

        out.send(player.connection, "A match is in progress. Jump in!");
        if let Some(first) = self.sequence.first() {
            out.send(player.connection, word_line(first));
        }
        Ok(())
    }

    /// Checks one answer against the word under the player's cursor
    pub(crate) fn submit_answer(
        &mut self,
        name: &str,
        text: &str,
        out: &mut Outbox,
    ) -> Result<(), SessionError> {
        let threshold = self.settings.win_threshold;
        let player = self
            .registry
            .get_mut(name)
            .ok_or_else(|| RegistryError::UnknownPlayer(name.to_string()))?;
        let cursor = player
            .cursor
            .ok_or_else(|| SessionError::NoCursor(name.to_string()))?;
        let expected = self
            .sequence
            .get(cursor)
            .ok_or_else(|| SessionError::SequenceExhausted {
                name: name.to_string(),
                length: self.sequence.len(),
            })?;

        if text != expected {
            player.errors += 1;
            out.send(player.connection, ServerLine::Errors(player.errors).to_string());
            out.send(player.connection, "Incorrect word. Try again!");
            return Ok(());
        }

        player.score += 1;
        out.send(player.connection, ServerLine::Score(player.score).to_string());

        if player.score >= threshold {
            self.resolve_match(name, out);
            return Ok(());
        }

        let next = cursor + 1;
        player.cursor = Some(next);
        match self.sequence.get(next) {
            Some(word) => {
                out.send(player.connection, word_line(word));
                Ok(())
            }
            None => Err(SessionError::SequenceExhausted {
                name: name.to_string(),
                length: self.sequence.len(),
            }),
        }
    }
}

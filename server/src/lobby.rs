//! Lobby commands and the pre-match countdown
//!
//! Readiness is aggregated here. Once at least two players are registered and
//! all of them are ready, a countdown starts: an announcement, then one number
//! per step, each one step delay apart. Every step is a scheduled tick, so
//! joins, leaves and `/wait` requests are processed between steps. A pending
//! `/wait` is honoured at the next tick; a join cancels at once. A hold lasts
//! until the next player joins or someone sends `/resume-waiting`.

use crate::error::SessionError;
use crate::registry::ConnectionId;
use crate::session::{Countdown, Outbox, Phase, Session};
use crate::settings::MIN_PLAYERS;
use log::{debug, info};
use shared::{Command, CLOSE_LEAVE};

impl Session {
    pub(crate) fn apply_command(
        &mut self,
        name: &str,
        connection: ConnectionId,
        command: Command,
        out: &mut Outbox,
    ) -> Result<(), SessionError> {
        match command {
            Command::Ready => self.mark_ready(name, out),
            Command::Leave => {
                info!("{} asked to leave", name);
                out.send(connection, "Bye!");
                out.close(connection, CLOSE_LEAVE, "Player request");
                Ok(())
            }
            Command::Wait => {
                self.hold = true;
                self.registry.reset_all_to_waiting();
                info!("{} paused the lobby", name);
                out.broadcast(format!(
                    "{} asked to wait for the next player. Everyone must send /ready again.",
                    name
                ));
                Ok(())
            }
            Command::ResumeWaiting => {
                if !self.hold {
                    return Ok(());
                }
                self.hold = false;
                info!("{} resumed the lobby", name);
                out.broadcast(format!("{} stopped waiting for the next player.", name));
                if self.phase == Phase::Lobby && self.can_count_down() {
                    self.start_countdown(out);
                }
                Ok(())
            }
        }
    }

    fn mark_ready(&mut self, name: &str, out: &mut Outbox) -> Result<(), SessionError> {
        if !self.registry.set_ready(name)? {
            debug!("{} is already ready", name);
            return Ok(());
        }

        out.broadcast(format!("{} is ready to start.", name));

        if self.phase != Phase::Lobby {
            return Ok(());
        }
        if self.registry.len() < MIN_PLAYERS {
            out.broadcast("At least two players are needed to start a match.");
        } else if self.registry.all_ready() {
            if self.hold {
                out.broadcast(
                    "Everyone is ready, but the lobby is waiting for another player. Send /resume-waiting to start now.",
                );
            } else {
                self.start_countdown(out);
            }
        }
        Ok(())
    }

    pub(crate) fn start_countdown(&mut self, out: &mut Outbox) {
        let generation = self.next_generation;
        self.next_generation += 1;

        self.countdown = Some(Countdown {
            generation,
            remaining: self.settings.countdown_steps,
        });
        self.phase = Phase::CountingDown;

        info!("Countdown {} started", generation);
        out.broadcast("Starting match in:");
        out.schedule(generation, self.settings.step_delay);
    }

    pub(crate) fn cancel_countdown(&mut self, message: impl Into<String>, out: &mut Outbox) {
        if let Some(countdown) = self.countdown.take() {
            info!("Countdown {} cancelled", countdown.generation);
        }
        self.phase = Phase::Lobby;
        out.broadcast(message);
    }

    /// Advances the countdown by one step, or starts the match after the last
    pub(crate) fn on_countdown_tick(
        &mut self,
        generation: u64,
        out: &mut Outbox,
    ) -> Result<(), SessionError> {
        let countdown = match self.countdown {
            Some(countdown)
                if countdown.generation == generation && self.phase == Phase::CountingDown =>
            {
                countdown
            }
            _ => {
                debug!("Ignoring stale countdown tick {}", generation);
                return Ok(());
            }
        };

        if self.hold {
            self.cancel_countdown(
                "Countdown interrupted; waiting for the next player.",
                out,
            );
            return Ok(());
        }
        if !self.can_count_down() {
            self.cancel_countdown("Countdown interrupted.", out);
            return Ok(());
        }

        if countdown.remaining == 0 {
            self.countdown = None;
            return self.start_match(out);
        }

        out.broadcast(countdown.remaining.to_string());
        self.countdown = Some(Countdown {
            generation,
            remaining: countdown.remaining - 1,
        });
        out.schedule(generation, self.settings.step_delay);
        Ok(())
    }
}

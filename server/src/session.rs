//! Match session orchestrator
//!
//! The session is the single owner of the player registry, the word bank and
//! the current match sequence. The transport feeds it one [`SessionEvent`] at
//! a time and performs the [`Effect`]s it returns; nothing else mutates
//! session state, so applying events one by one serializes every transition.
//!
//! The lobby commands and countdown live in `lobby`, answer handling in
//! `match_runtime`, and end-of-match ranking in `leaderboard`.

use crate::error::{RegistryError, SessionError, SettingsError};
use crate::registry::{ConnectionId, LobbyState, PlayerRegistry};
use crate::settings::{MatchSettings, MIN_PLAYERS};
use crate::word_bank::WordBank;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{
    Command, DisplayName, CLOSE_DUPLICATE_CONNECTION, CLOSE_FAULT, CLOSE_INVALID_NAME,
    CLOSE_NAME_IN_USE,
};
use std::time::Duration;

/// Session-wide stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lobby,
    CountingDown,
    InProgress,
}

/// Inbound events from the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Join {
        connection: ConnectionId,
        name: String,
    },
    Message {
        connection: ConnectionId,
        text: String,
    },
    Close {
        connection: ConnectionId,
    },
    Fault {
        connection: ConnectionId,
        reason: String,
    },
    CountdownTick {
        generation: u64,
    },
}

/// Side effects the transport must carry out, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Send {
        to: ConnectionId,
        text: String,
    },
    /// Deliver to every registered player
    Broadcast {
        text: String,
    },
    Close {
        to: ConnectionId,
        code: u16,
        reason: String,
    },
    /// Post `CountdownTick { generation }` back after `delay`
    ScheduleTick {
        generation: u64,
        delay: Duration,
    },
}

/// Collects effects while an event is being applied
#[derive(Debug, Default)]
pub struct Outbox {
    effects: Vec<Effect>,
}

impl Outbox {
    pub fn send(&mut self, to: ConnectionId, text: impl Into<String>) {
        self.effects.push(Effect::Send {
            to,
            text: text.into(),
        });
    }

    pub fn broadcast(&mut self, text: impl Into<String>) {
        self.effects.push(Effect::Broadcast { text: text.into() });
    }

    pub fn close(&mut self, to: ConnectionId, code: u16, reason: impl Into<String>) {
        self.effects.push(Effect::Close {
            to,
            code,
            reason: reason.into(),
        });
    }

    pub fn schedule(&mut self, generation: u64, delay: Duration) {
        self.effects.push(Effect::ScheduleTick { generation, delay });
    }

    pub fn into_effects(self) -> Vec<Effect> {
        self.effects
    }
}

/// A countdown in flight. Ticks carrying another generation are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Countdown {
    pub(crate) generation: u64,
    pub(crate) remaining: u32,
}

pub struct Session {
    pub(crate) settings: MatchSettings,
    pub(crate) registry: PlayerRegistry,
    pub(crate) bank: WordBank,
    pub(crate) sequence: Vec<String>,
    pub(crate) phase: Phase,
    /// Set by `/wait`: readiness alone will not start a countdown
    pub(crate) hold: bool,
    pub(crate) countdown: Option<Countdown>,
    pub(crate) next_generation: u64,
    pub(crate) rng: StdRng,
}

impl Session {
    pub fn new(settings: MatchSettings, bank: WordBank) -> Result<Self, SettingsError> {
        Self::with_rng(settings, bank, StdRng::from_entropy())
    }

    /// Same as [`Session::new`] with reproducible word draws
    pub fn with_seed(
        settings: MatchSettings,
        bank: WordBank,
        seed: u64,
    ) -> Result<Self, SettingsError> {
        Self::with_rng(settings, bank, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        settings: MatchSettings,
        bank: WordBank,
        rng: StdRng,
    ) -> Result<Self, SettingsError> {
        settings.validate(&bank)?;

        Ok(Self {
            settings,
            registry: PlayerRegistry::new(),
            bank,
            sequence: Vec::new(),
            phase: Phase::Lobby,
            hold: false,
            countdown: None,
            next_generation: 0,
            rng,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &MatchSettings {
        &self.settings
    }

    /// Word sequence of the current or most recent match
    pub fn sequence(&self) -> &[String] {
        &self.sequence
    }

    pub fn is_holding(&self) -> bool {
        self.hold
    }

    /// Connections of registered players, the audience of every broadcast
    pub fn connections(&self) -> Vec<ConnectionId> {
        self.registry.connections()
    }

    /// Applies one event and returns the effects it produced.
    ///
    /// An error aborts only the event that raised it; state is checked
    /// before it is mutated so the session stays consistent.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<Effect> {
        let mut out = Outbox::default();

        let result = match event {
            SessionEvent::Join { connection, name } => self.on_join(connection, &name, &mut out),
            SessionEvent::Message { connection, text } => {
                self.on_message(connection, &text, &mut out)
            }
            SessionEvent::Close { connection } => self.on_close(connection, &mut out),
            SessionEvent::Fault { connection, reason } => {
                self.on_fault(connection, &reason, &mut out)
            }
            SessionEvent::CountdownTick { generation } => {
                self.on_countdown_tick(generation, &mut out)
            }
        };

        if let Err(e) = result {
            warn!("Dropped session event: {}", e);
        }

        out.into_effects()
    }

    fn on_join(
        &mut self,
        connection: ConnectionId,
        raw_name: &str,
        out: &mut Outbox,
    ) -> Result<(), SessionError> {
        if self.registry.find_by_connection(connection).is_some() {
            self.reject_duplicate_connection(connection, out);
            return Ok(());
        }

        let name = match DisplayName::parse(raw_name) {
            Ok(name) => name,
            Err(e) => {
                info!("Rejected join on {}: {}", connection, e);
                out.send(connection, format!("Invalid name: {}.", e));
                out.close(connection, CLOSE_INVALID_NAME, "Invalid name");
                return Ok(());
            }
        };

        match self.registry.register(name.clone(), connection) {
            Ok(()) => {}
            Err(RegistryError::DuplicateConnection(_)) => {
                self.reject_duplicate_connection(connection, out);
                return Ok(());
            }
            Err(RegistryError::DuplicateName(taken)) => {
                info!("Name {} already in use, rejecting {}", taken, connection);
                out.send(
                    connection,
                    format!("The name \"{}\" is already in use. Try again.", taken),
                );
                out.close(connection, CLOSE_NAME_IN_USE, "Name already in use");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        self.send_welcome(connection, out);
        out.broadcast(format!("{} joined the lobby.", name));
        out.broadcast(self.head_count());

        // The player the lobby was waiting for has arrived
        if self.hold {
            self.hold = false;
            info!("{} joined; lobby no longer waiting", name);
            out.broadcast("No longer waiting for another player.");
        }

        match self.phase {
            Phase::CountingDown => {
                self.cancel_countdown(
                    format!("Countdown cancelled: {} just joined.", name),
                    out,
                );
            }
            Phase::InProgress => self.admit_late_player(name.as_str(), out)?,
            Phase::Lobby => {}
        }

        Ok(())
    }

    fn on_message(
        &mut self,
        connection: ConnectionId,
        text: &str,
        out: &mut Outbox,
    ) -> Result<(), SessionError> {
        let name = match self.registry.find_by_connection(connection) {
            Some(player) => player.name.to_string(),
            None => {
                out.send(connection, "Join first with /join <name>.");
                return Ok(());
            }
        };

        if self.phase == Phase::InProgress {
            return self.submit_answer(&name, text, out);
        }

        match Command::parse(text) {
            Some(command) => self.apply_command(&name, connection, command, out),
            None if text.trim_start().starts_with('/') => {
                out.send(
                    connection,
                    "Unknown command. Use /ready, /wait, /resume-waiting or /leave.",
                );
                Ok(())
            }
            None => {
                debug!("Ignoring lobby chatter from {}", name);
                Ok(())
            }
        }
    }

    fn on_close(&mut self, connection: ConnectionId, out: &mut Outbox) -> Result<(), SessionError> {
        let name = match self.registry.find_by_connection(connection) {
            Some(player) => player.name.to_string(),
            None => {
                debug!("Connection {} closed before joining", connection);
                return Ok(());
            }
        };

        self.registry.unregister(&name);
        out.broadcast(format!("{} left.", name));
        out.broadcast(self.head_count());

        match self.phase {
            Phase::CountingDown if self.registry.len() < MIN_PLAYERS => {
                self.cancel_countdown("Countdown cancelled: not enough players.", out);
            }
            Phase::InProgress if self.registry.is_empty() => {
                info!("Everyone left; match abandoned");
                self.phase = Phase::Lobby;
            }
            Phase::Lobby if !self.hold && self.can_count_down() => {
                self.start_countdown(out);
            }
            _ => {}
        }

        Ok(())
    }

    fn on_fault(
        &mut self,
        connection: ConnectionId,
        reason: &str,
        out: &mut Outbox,
    ) -> Result<(), SessionError> {
        warn!("Fault on connection {}: {}", connection, reason);
        out.close(connection, CLOSE_FAULT, format!("Fault: {}", reason));
        Ok(())
    }

    fn reject_duplicate_connection(&self, connection: ConnectionId, out: &mut Outbox) {
        info!("Duplicate join on {}", connection);
        out.send(connection, "Duplicate connection. Disconnecting.");
        out.close(connection, CLOSE_DUPLICATE_CONNECTION, "Duplicate connection");
    }

    fn send_welcome(&self, connection: ConnectionId, out: &mut Outbox) {
        let threshold = self.settings.win_threshold;
        for line in [
            "-------".to_string(),
            "Welcome to Typerace!".to_string(),
            "- RULES -".to_string(),
            "Once the match starts every player receives the same words in the same order."
                .to_string(),
            "Type each word exactly as shown to score a point and get the next one.".to_string(),
            format!("The first player to reach {} points wins!", threshold),
            "- COMMANDS -".to_string(),
            "/ready (/pronto): the countdown starts once everyone is ready".to_string(),
            "/wait (/aguardar): hold the countdown until another player joins".to_string(),
            "/resume-waiting (/parar-de-aguardar): stop holding".to_string(),
            "/leave (/sair): leave the server".to_string(),
            "-------".to_string(),
        ] {
            out.send(connection, line);
        }
    }

    fn head_count(&self) -> String {
        match self.registry.len() {
            1 => "1 player connected.".to_string(),
            n => format!("{} players connected.", n),
        }
    }

    /// True when enough players are registered and all of them are ready
    pub(crate) fn can_count_down(&self) -> bool {
        self.registry.len() >= MIN_PLAYERS && self.registry.all_ready()
    }

    /// Only a running match may have players in the `InMatch` state, and
    /// while it runs every player must be in it.
    pub fn invariants_hold(&self) -> bool {
        let mut states = self.registry.all().iter().map(|p| p.lobby_state);
        match self.phase {
            Phase::InProgress => states.all(|s| s == LobbyState::InMatch),
            Phase::Lobby | Phase::CountingDown => states.all(|s| s != LobbyState::InMatch),
        }
    }
}

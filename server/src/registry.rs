//! Player registry for the typerace server
//!
//! This module tracks every player who completed the join handshake:
//! - Identity (display name) and the connection used to reach them
//! - Lobby readiness (waiting, ready, in a match)
//! - Per-match progress: cursor into the shared word sequence, score and errors
//!
//! Players are kept in join order so that every iteration over the registry,
//! including leaderboard tie display, is deterministic.

use crate::error::RegistryError;
use log::info;
use shared::DisplayName;
use std::fmt;

/// Opaque handle the transport assigns to each accepted connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single player's readiness stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyState {
    Waiting,
    Ready,
    InMatch,
}

/// A registered player and their progress in the current match
#[derive(Debug, Clone)]
pub struct Player {
    /// Unique, case-sensitive display name
    pub name: DisplayName,
    /// Connection used for sending and identity comparison
    pub connection: ConnectionId,
    pub lobby_state: LobbyState,
    /// Index into the match word sequence; `None` until a match starts
    pub cursor: Option<usize>,
    /// Correct words typed in the current match
    pub score: u32,
    /// Wrong attempts in the current match
    pub errors: u32,
}

impl Player {
    /// Creates a waiting player with no match progress
    pub fn new(name: DisplayName, connection: ConnectionId) -> Self {
        Self {
            name,
            connection,
            lobby_state: LobbyState::Waiting,
            cursor: None,
            score: 0,
            errors: 0,
        }
    }

    /// Clears cursor, score and error count back to their initial values
    pub fn reset_progress(&mut self) {
        self.cursor = None;
        self.score = 0;
        self.errors = 0;
    }
}

/// Manages all joined players
///
/// The registry enforces the two identity rules of the lobby: a connection
/// may hold at most one player, and a display name may be held by at most one
/// connection. All mutation goes through the session orchestrator.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: Vec<Player>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to add a player
    ///
    /// Fails with `DuplicateConnection` when the same connection already joined
    /// (a re-entrant join) and with `DuplicateName` when another connection
    /// holds the name. On success the player starts out waiting.
    pub fn register(
        &mut self,
        name: DisplayName,
        connection: ConnectionId,
    ) -> Result<(), RegistryError> {
        if self.players.iter().any(|p| p.connection == connection) {
            return Err(RegistryError::DuplicateConnection(connection));
        }
        if self.players.iter().any(|p| p.name == name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }

        info!("Player {} registered on connection {}", name, connection);
        self.players.push(Player::new(name, connection));
        Ok(())
    }

    /// Removes a player. Returns the removed record, or `None` if already gone.
    pub fn unregister(&mut self, name: &str) -> Option<Player> {
        let index = self.players.iter().position(|p| p.name.as_str() == name)?;
        let player = self.players.remove(index);
        info!("Player {} unregistered", player.name);
        Some(player)
    }

    pub fn get(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name.as_str() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.name.as_str() == name)
    }

    pub fn find_by_connection(&self, connection: ConnectionId) -> Option<&Player> {
        self.players.iter().find(|p| p.connection == connection)
    }

    /// All players in join order
    pub fn all(&self) -> &[Player] {
        &self.players
    }

    pub fn all_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.iter_mut()
    }

    pub fn connections(&self) -> Vec<ConnectionId> {
        self.players.iter().map(|p| p.connection).collect()
    }

    /// Moves a waiting player to ready
    ///
    /// Returns `Ok(true)` on the transition and `Ok(false)` when the player was
    /// not waiting (already ready or in a match), which callers treat as a no-op.
    pub fn set_ready(&mut self, name: &str) -> Result<bool, RegistryError> {
        let player = self
            .get_mut(name)
            .ok_or_else(|| RegistryError::UnknownPlayer(name.to_string()))?;

        if player.lobby_state != LobbyState::Waiting {
            return Ok(false);
        }
        player.lobby_state = LobbyState::Ready;
        Ok(true)
    }

    pub fn set_in_match(&mut self, name: &str) -> Result<(), RegistryError> {
        let player = self
            .get_mut(name)
            .ok_or_else(|| RegistryError::UnknownPlayer(name.to_string()))?;
        player.lobby_state = LobbyState::InMatch;
        Ok(())
    }

    pub fn reset_all_to_waiting(&mut self) {
        for player in &mut self.players {
            player.lobby_state = LobbyState::Waiting;
        }
    }

    /// True when at least one player is registered and every player is ready
    pub fn all_ready(&self) -> bool {
        !self.players.is_empty()
            && self
                .players
                .iter()
                .all(|p| p.lobby_state == LobbyState::Ready)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(raw: &str) -> DisplayName {
        DisplayName::parse(raw).unwrap()
    }

    #[test]
    fn test_player_creation() {
        let player = Player::new(name("ana"), ConnectionId(1));

        assert_eq!(player.name.as_str(), "ana");
        assert_eq!(player.connection, ConnectionId(1));
        assert_eq!(player.lobby_state, LobbyState::Waiting);
        assert_eq!(player.cursor, None);
        assert_eq!(player.score, 0);
        assert_eq!(player.errors, 0);
    }

    #[test]
    fn test_player_reset_progress() {
        let mut player = Player::new(name("ana"), ConnectionId(1));
        player.cursor = Some(4);
        player.score = 4;
        player.errors = 2;

        player.reset_progress();

        assert_eq!(player.cursor, None);
        assert_eq!(player.score, 0);
        assert_eq!(player.errors, 0);
    }

    #[test]
    fn test_register_players() {
        let mut registry = PlayerRegistry::new();
        assert!(registry.is_empty());

        registry.register(name("ana"), ConnectionId(1)).unwrap();
        registry.register(name("bea"), ConnectionId(2)).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.get("ana").is_some());
        assert!(registry.get("bea").is_some());
    }

    #[test]
    fn test_register_duplicate_name() {
        let mut registry = PlayerRegistry::new();
        registry.register(name("ana"), ConnectionId(1)).unwrap();

        let result = registry.register(name("ana"), ConnectionId(2));

        assert_eq!(result, Err(RegistryError::DuplicateName("ana".to_string())));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("ana").unwrap().connection, ConnectionId(1));
    }

    #[test]
    fn test_register_duplicate_connection() {
        let mut registry = PlayerRegistry::new();
        registry.register(name("ana"), ConnectionId(1)).unwrap();

        let same_name = registry.register(name("ana"), ConnectionId(1));
        let other_name = registry.register(name("bea"), ConnectionId(1));

        assert_eq!(
            same_name,
            Err(RegistryError::DuplicateConnection(ConnectionId(1)))
        );
        assert_eq!(
            other_name,
            Err(RegistryError::DuplicateConnection(ConnectionId(1)))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_names_differing_in_case_are_distinct() {
        let mut registry = PlayerRegistry::new();
        registry.register(name("ana"), ConnectionId(1)).unwrap();
        registry.register(name("Ana"), ConnectionId(2)).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("Ana").unwrap().connection, ConnectionId(2));
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let mut registry = PlayerRegistry::new();
        registry.register(name("ana"), ConnectionId(1)).unwrap();

        assert!(registry.unregister("ana").is_some());
        assert!(registry.unregister("ana").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_find_by_connection() {
        let mut registry = PlayerRegistry::new();
        registry.register(name("ana"), ConnectionId(1)).unwrap();
        registry.register(name("bea"), ConnectionId(2)).unwrap();

        let found = registry.find_by_connection(ConnectionId(2)).unwrap();
        assert_eq!(found.name.as_str(), "bea");
        assert!(registry.find_by_connection(ConnectionId(99)).is_none());
    }

    #[test]
    fn test_iteration_follows_join_order() {
        let mut registry = PlayerRegistry::new();
        for (i, raw) in ["carla", "ana", "bea"].iter().enumerate() {
            registry.register(name(raw), ConnectionId(i as u64)).unwrap();
        }
        registry.unregister("ana");
        registry.register(name("ana"), ConnectionId(10)).unwrap();

        let order: Vec<&str> = registry.all().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(order, vec!["carla", "bea", "ana"]);
        assert_eq!(
            registry.connections(),
            vec![ConnectionId(0), ConnectionId(2), ConnectionId(10)]
        );
    }

    #[test]
    fn test_set_ready_only_from_waiting() {
        let mut registry = PlayerRegistry::new();
        registry.register(name("ana"), ConnectionId(1)).unwrap();

        assert_eq!(registry.set_ready("ana"), Ok(true));
        assert_eq!(registry.set_ready("ana"), Ok(false));

        registry.set_in_match("ana").unwrap();
        assert_eq!(registry.set_ready("ana"), Ok(false));
        assert_eq!(registry.get("ana").unwrap().lobby_state, LobbyState::InMatch);
    }

    #[test]
    fn test_set_ready_unknown_player() {
        let mut registry = PlayerRegistry::new();
        assert_eq!(
            registry.set_ready("ghost"),
            Err(RegistryError::UnknownPlayer("ghost".to_string()))
        );
    }

    #[test]
    fn test_all_ready() {
        let mut registry = PlayerRegistry::new();
        assert!(!registry.all_ready());

        registry.register(name("ana"), ConnectionId(1)).unwrap();
        registry.register(name("bea"), ConnectionId(2)).unwrap();
        registry.set_ready("ana").unwrap();
        assert!(!registry.all_ready());

        registry.set_ready("bea").unwrap();
        assert!(registry.all_ready());

        registry.reset_all_to_waiting();
        assert!(!registry.all_ready());
        assert!(registry
            .all()
            .iter()
            .all(|p| p.lobby_state == LobbyState::Waiting));
    }
}

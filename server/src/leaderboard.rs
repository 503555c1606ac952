//! End-of-match ranking and reset

use crate::registry::Player;
use crate::session::{Outbox, Phase, Session};
use log::info;
use shared::ServerLine;

/// One leaderboard row, snapshotted before scores are reset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    pub rank: usize,
    pub name: String,
    pub score: u32,
    pub errors: u32,
}

impl Standing {
    pub fn line(&self) -> String {
        let unit = if self.score == 1 { "point" } else { "points" };
        format!("{}. {} - {} {}", self.rank, self.name, self.score, unit)
    }
}

/// Ranks players by score, highest first. Equal scores keep registry order.
pub fn rank(players: &[Player]) -> Vec<Standing> {
    let mut ordered: Vec<&Player> = players.iter().collect();
    ordered.sort_by(|a, b| b.score.cmp(&a.score));

    ordered
        .into_iter()
        .enumerate()
        .map(|(i, p)| Standing {
            rank: i + 1,
            name: p.name.to_string(),
            score: p.score,
            errors: p.errors,
        })
        .collect()
}

impl Session {
    /// Ends the match won by `winner` and returns everyone to the lobby
    pub(crate) fn resolve_match(&mut self, winner: &str, out: &mut Outbox) {
        self.phase = Phase::Lobby;
        self.hold = false;
        self.registry.reset_all_to_waiting();

        let standings = rank(self.registry.all());
        info!(
            "{} won; final scores: {}",
            winner,
            standings
                .iter()
                .map(|s| format!("{}={} ({} errors)", s.name, s.score, s.errors))
                .collect::<Vec<_>>()
                .join(", ")
        );

        out.broadcast("************************************");
        out.broadcast(format!("{} won the match!", winner));
        for player in self.registry.all() {
            out.send(player.connection, ServerLine::ShowStats.to_string());
        }
        out.broadcast("Leaderboard:");
        for standing in &standings {
            out.broadcast(standing.line());
        }
        out.broadcast("Send /ready to play again.");

        for player in self.registry.all_mut() {
            player.reset_progress();
        }
    }
}

//! # Typerace Server Library
//!
//! This library provides the authoritative server for the multiplayer typing
//! race. Players connect over WebSocket, gather in a lobby, count down
//! together and then race through a shared sequence of words. The first
//! player to reach the win threshold ends the match and everyone returns to
//! the lobby for the next one.
//!
//! ## Architecture Design
//!
//! ### Single Event Loop
//! All session state lives in one [`session::Session`] owned by the main
//! server loop. Connection tasks and countdown timers never touch it
//! directly; they post [`session::SessionEvent`]s into one channel and the
//! loop applies them in arrival order. Each event returns a list of
//! [`session::Effect`]s (sends, broadcasts, closes and timer requests)
//! which the loop then performs.
//!
//! ### Countdown Generations
//! A countdown is a chain of scheduled ticks. Every countdown gets a fresh
//! generation number and ticks carrying any other generation are ignored,
//! so cancelling only needs to forget the current generation.
//!
//! ## Module Organization
//!
//! ### Registry Module (`registry`)
//! Players keyed by display name, with their connection, lobby state,
//! cursor and per-match score.
//!
//! ### Word Bank Module (`word_bank`)
//! The word catalog and random draws of distinct words for each match.
//!
//! ### Session Module (`session`)
//! Event dispatch, joins, disconnects and phase bookkeeping. Lobby commands
//! and the countdown live in `lobby`, answer handling in `match_runtime`
//! and ranking in `leaderboard`.
//!
//! ### Network Module (`network`)
//! WebSocket acceptor, per-connection reader and writer tasks, and the main
//! loop that applies session effects.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use server::session::Session;
//! use server::settings::MatchSettings;
//! use server::word_bank::WordBank;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::new(MatchSettings::default(), WordBank::builtin())?;
//!     let server = Server::bind("127.0.0.1:8080", session).await?;
//!
//!     // Accepts players and runs matches until the process stops
//!     server.run().await;
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod leaderboard;
mod lobby;
pub mod match_runtime;
pub mod network;
pub mod registry;
pub mod session;
pub mod settings;
pub mod word_bank;

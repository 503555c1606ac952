//! # Typerace Client Library
//!
//! Terminal client for the typing race. It reads lines from the keyboard,
//! forwards them to the server over WebSocket and prints whatever the server
//! sends back.
//!
//! ## Module Organization
//!
//! ### Input Module (`input`)
//! Async line reader over stdin that drops blank lines.
//!
//! ### Network Module (`network`)
//! Connection handling: the join handshake, the read/forward loop and how
//! the session ended, so the binary can retry with another name when the
//! server refuses one.
//!
//! ### Rendering Module (`rendering`)
//! Prints server lines, highlights the current word and keeps the player's
//! own correct/error totals from the server's score markers.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::input::InputManager;
//! use client::network::Client;
//! use client::rendering::Renderer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut input = InputManager::stdin();
//!     let mut renderer = Renderer::stdout();
//!
//!     let client = Client::connect("ws://127.0.0.1:8080", "ana").await?;
//!     let end = client.run(&mut input, &mut renderer).await?;
//!     println!("Session ended with {:?}", end.code);
//!
//!     Ok(())
//! }
//! ```

pub mod input;
pub mod network;
pub mod rendering;

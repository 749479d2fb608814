//! # Sabotage Server Library
//!
//! This library provides the authoritative server for role abilities and
//! sabotage. Clients only ever send requests; the server validates them,
//! mutates the canonical state and broadcasts what changed to everyone.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Validation
//! Every request is checked against the current match phase, the player's
//! role, whether they are alive, and the cooldown or progress bounds that
//! apply. A rejected request changes nothing and is never broadcast.
//!
//! ### Timed Transitions
//! Ability windows, cooldowns, sabotage progress and target recovery all
//! advance on the server tick. Nothing is driven by client clocks.
//!
//! ### Change Broadcasting
//! Accepted transitions are broadcast in the order they happened so every
//! observer can apply them to its own mirror.
//!
//! ## Module Organization
//!
//! - `timer`: cancellable one-shot timers polled by the tick
//! - `target`: sabotageable traps and structures with auto-recovery
//! - `ability`: per-player ability state machine and role behaviors
//! - `sabotage`: per-player sabotage sessions and their resolution
//! - `collaborators`: phase gate, alive state and health seams
//! - `game`: the authoritative world tying the above together
//! - `client_manager`: connections and per-client request queues
//! - `network`: UDP tasks and the tick loop
//! - `config`: gameplay tunables assembled by the binary
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::GameConfig;
//! use server::network::Server;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(
//!         "127.0.0.1:8080",
//!         Duration::from_millis(33),
//!         16,
//!         GameConfig::default(),
//!     )
//!     .await?;
//!
//!     // Receives packets, queues requests, ticks the world and broadcasts
//!     // changes until the process is stopped.
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod ability;
pub mod client_manager;
pub mod collaborators;
pub mod config;
pub mod game;
pub mod network;
pub mod sabotage;
pub mod target;
pub mod timer;

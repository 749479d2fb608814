//! # Sabotage Client Library
//!
//! Headless observer for the sabotage server. The client never mutates
//! gameplay state on its own authority: it sends requests, applies the
//! broadcasts that come back, and tracks its own sabotage attempt locally
//! for presentation.
//!
//! ## Module Organization
//!
//! ### Mirror Module (`mirror`)
//! Read-only copy of the authoritative world built from the join snapshot and
//! every broadcast since. Applying a broadcast twice is a no-op.
//!
//! ### Interaction Module (`interaction`)
//! Local sabotage tracker: continuous target discovery while idle, local
//! progress while interacting, and typed listeners for candidate, progress
//! and result events.
//!
//! ### Network Module (`network`)
//! UDP connection to the server, console commands and the client tick.

pub mod interaction;
pub mod mirror;
pub mod network;

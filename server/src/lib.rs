//! # Snake Game Server Library
//!
//! Authoritative server for the multiplayer snake game. It owns the
//! canonical world state, merges asynchronous player input at tick
//! boundaries, resolves movement, collision and growth deterministically,
//! and broadcasts the result to every connected session.
//!
//! ## Architecture
//!
//! ### Single-Owner Game Loop
//! All world mutation happens inside one loop task that owns the
//! [`game::GameState`]. Connection tasks never touch the world; they send
//! events into the loop over a channel and drain per-session outbound
//! queues. This removes the need for any lock around the simulation.
//!
//! ### Line-Oriented TCP Protocol
//! Clients speak a newline-terminated text protocol (`JOIN`, `INPUT`,
//! `LEVEL`, `QUIT` inbound; `WELCOME`, `STATE`, `BOARD`, `SCORES`, `ERR`
//! outbound) defined in the `shared` crate, with the `STATE` payload as a
//! structured JSON snapshot produced by a single encoder.
//!
//! ### Fixed-Rate Ticking
//! The tick period derives from the current level's tick rate. Each tick
//! applies the newest staged direction per session, advances the world by
//! one step, and fans the serialized snapshot out to all sessions. A level
//! change reschedules the timer and broadcasts the new map immediately.
//!
//! ## Module Organization
//!
//! - [`game`] — the simulation engine: snakes, fruit, scores, the step
//!   algorithm and the render/snapshot queries.
//! - [`level`] — embedded level maps with tick-rate and fruit metadata.
//! - [`session`] — session registry: outbound channels, staged-direction
//!   slots, monotonic player-id assignment.
//! - [`network`] — the orchestrator: accept loop, per-session I/O tasks
//!   and the tick loop.

pub mod game;
pub mod level;
pub mod network;
pub mod session;

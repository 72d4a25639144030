//! # Snake Arena Server Library
//!
//! Authoritative server for a multiplayer snake arena. It owns the only copy
//! of the world, advances it on a fixed tick, and streams snapshots of it to
//! every connected client.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Clients only send steering tokens. Movement, collisions, scoring and food
//! all happen here, once per tick, in a fixed order (session registration
//! order), so a given seed and input sequence always produces the same world.
//!
//! ### Session Management
//! Each TCP connection goes through a short lifecycle:
//! - Handshake: one line carrying the display name
//! - Join: capacity check, spawn on a free cell, first snapshot
//! - Input: one steering token per line until the client goes away
//! - Leave: the snake is removed from the world unconditionally
//!
//! ### State Broadcasting
//! After every tick the world is encoded once and pushed into each session's
//! bounded outbox. A per-session writer task drains the outbox into the
//! socket, so slow clients drop frames instead of slowing the tick.
//!
//! ## Architecture Design
//!
//! ### One Lock, Atomic Operations
//! All mutable state (snakes, food, connection registry, RNG) lives behind a
//! single mutex in [`world::SharedWorld`]. Joining, leaving, steering and
//! ticking each take it exactly once. Socket I/O never happens under it.
//!
//! ### Task Per Connection
//! The accept loop spawns one task per client. Those tasks block on reads
//! and only ever change their own snake's pending heading. The tick task is
//! the only place positions change.
//!
//! ### Line Framing
//! Every message in both directions is a single newline-terminated line, so
//! TCP coalescing or splitting never merges or cuts logical messages.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! Pure, synchronous world rules: arena bounds, snakes, food, spawning and
//! the per-tick movement and collision pass.
//!
//! ### Client Manager Module (`client_manager`)
//! Session id allocation, capacity limit and the outbox of every session.
//!
//! ### World Module (`world`)
//! The lock around the game state and the client registry.
//!
//! ### Broadcast Module (`broadcast`)
//! Non-blocking fan-out of encoded snapshots.
//!
//! ### Network Module (`network`)
//! Listener, connection handler and tick loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use snake_server::config::ServerConfig;
//! use snake_server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::new(ServerConfig {
//!         port: 5555,
//!         ..ServerConfig::default()
//!     })
//!     .await?;
//!
//!     // Ticks the world and serves clients until the process is stopped
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod client_manager;
pub mod config;
pub mod error;
pub mod game;
pub mod network;
pub mod world;

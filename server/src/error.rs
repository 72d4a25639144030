//! Error types for configuration, joining and per-connection handling.

use std::io;
use thiserror::Error;

/// Rejected server configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("arena {width}x{height} is too small, each side needs at least {min} cells")]
    ArenaTooSmall { width: i32, height: i32, min: i32 },

    #[error("max_foods {max_foods} exceeds the {interior} interior cells")]
    TooMuchFood { max_foods: usize, interior: usize },

    #[error("tick duration must be non-zero")]
    ZeroTick,

    #[error("max_players must be at least 1")]
    NoPlayerSlots,
}

/// Reasons a handshaked client could not be placed in the world.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JoinError {
    #[error("server is full")]
    ServerFull,

    #[error("no free spawn cell found")]
    NoSpawnCell,
}

/// Terminates one connection handler. Never fatal to the server.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("client sent no name before the handshake deadline")]
    HandshakeTimeout,

    #[error("connection closed before a name arrived")]
    NoHandshake,

    #[error("empty name")]
    EmptyName,

    #[error("name longer than {0} characters")]
    NameTooLong(usize),

    #[error("name is not valid UTF-8")]
    InvalidEncoding,

    #[error("join rejected: {0}")]
    Join(#[from] JoinError),

    #[error("no input within the idle timeout")]
    IdleTimeout,

    #[error("input line longer than {0} bytes")]
    LineTooLong(u64),
}

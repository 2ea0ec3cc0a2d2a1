//! Error types for the session layer.

use buzzer_protocol::{PlayerId, RoomCode};

/// Errors that can occur while binding connections to rooms.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The connection is already host of, or playing in, a room.
    /// A connection belongs to at most one room at a time.
    #[error("player {0} is already in room {1}")]
    AlreadyBound(PlayerId, RoomCode),
}

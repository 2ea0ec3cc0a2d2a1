//! Error types for the room layer.

use buzzer_protocol::RoomCode;

/// Errors from talking to a room actor.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No live room has this code.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The room's actor has stopped (the room was closed while the
    /// request was in flight).
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),
}

/// Why a `join-room` request was refused.
///
/// These are the only errors a client ever sees. [`JoinError::localized`]
/// gives the text shown to the player; `Display` is for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("room not found")]
    RoomNotFound,

    #[error("room is full")]
    RoomFull,

    /// No team, or something other than `red` / `blue`.
    #[error("invalid team selection")]
    InvalidTeam,

    #[error("team is full")]
    TeamFull,

    /// The connection is already host of, or playing in, a room.
    #[error("already in a room")]
    AlreadyJoined,
}

impl JoinError {
    /// The player-facing message, in the game's language.
    pub fn localized(&self) -> &'static str {
        match self {
            Self::RoomNotFound => "الغرفة مو موجودة",
            Self::RoomFull => "الغرفة ممتلئة",
            Self::InvalidTeam => "اختر فريق",
            Self::TeamFull => "الفريق ممتلئ",
            Self::AlreadyJoined => "أنت موجود في غرفة",
        }
    }
}

impl From<RoomError> for JoinError {
    /// A room that vanished mid-join looks, to the player, like one that
    /// never existed.
    fn from(_: RoomError) -> Self {
        Self::RoomNotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_error_localized_messages_are_distinct() {
        let all = [
            JoinError::RoomNotFound,
            JoinError::RoomFull,
            JoinError::InvalidTeam,
            JoinError::TeamFull,
            JoinError::AlreadyJoined,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.localized(), b.localized());
            }
        }
    }

    #[test]
    fn test_room_error_maps_to_room_not_found() {
        let code = RoomCode::parse("A7F3").unwrap();
        assert_eq!(
            JoinError::from(RoomError::Unavailable(code)),
            JoinError::RoomNotFound
        );
    }
}

//! Session types: what a connection is bound to.

use buzzer_protocol::{PlayerId, RoomCode, Team};

/// What a connection may do inside its room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Created the room; the only one allowed to run rounds.
    Host,
    /// Joined the room on a team; the only kind of member that may buzz.
    Player(Team),
}

/// A connection's binding to a room.
///
/// Created when a connection creates or joins a room and removed when it
/// leaves, disconnects, or the room closes. Immutable in between: a
/// player never switches room or team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub player_id: PlayerId,
    pub room_code: RoomCode,
    pub name: String,
    pub role: Role,
}

impl Session {
    /// A session for the connection that created `room_code`.
    pub fn host(player_id: PlayerId, room_code: RoomCode, name: impl Into<String>) -> Self {
        Self {
            player_id,
            room_code,
            name: name.into(),
            role: Role::Host,
        }
    }

    /// A session for a connection that joined `room_code` on `team`.
    pub fn player(
        player_id: PlayerId,
        room_code: RoomCode,
        name: impl Into<String>,
        team: Team,
    ) -> Self {
        Self {
            player_id,
            room_code,
            name: name.into(),
            role: Role::Player(team),
        }
    }

    pub fn is_host(&self) -> bool {
        matches!(self.role, Role::Host)
    }

    /// The player's team, or `None` for the host.
    pub fn team(&self) -> Option<Team> {
        match self.role {
            Role::Host => None,
            Role::Player(team) => Some(team),
        }
    }
}

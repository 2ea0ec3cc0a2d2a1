//! Core protocol types for Buzzer's wire format.
//!
//! Every type here is something that travels between a browser client and
//! the server. Names on the wire are kebab-case (`join-room`,
//! `player-buzzed`) and payload fields are camelCase (`roomCode`,
//! `playerName`), which is what the JavaScript client reads and writes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The socket-held identity of a host or player.
///
/// Derived from the connection the client is speaking on; there is no
/// login. Serialized as a plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// Characters a room code is drawn from. Excludes `0/O` and `1/I` so a
/// code read aloud or off a TV screen can't be mistyped.
pub const ROOM_CODE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Number of characters in a room code.
pub const ROOM_CODE_LEN: usize = 4;

/// A 4-character room identifier, e.g. `A7F3`.
///
/// Always upper case and drawn from [`ROOM_CODE_ALPHABET`]; the only ways
/// to get one are [`RoomCode::parse`] and [`RoomCode::from_indices`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Normalizes user input (trim + upper case) and validates it.
    ///
    /// Returns `None` for anything that can't be a live room's code.
    pub fn parse(input: &str) -> Option<Self> {
        let code = input.trim().to_ascii_uppercase();
        let valid = code.len() == ROOM_CODE_LEN
            && code.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b));
        valid.then_some(Self(code))
    }

    /// Builds a code from alphabet positions. Indices wrap around the
    /// alphabet, so any `usize` is accepted.
    pub fn from_indices(indices: [usize; ROOM_CODE_LEN]) -> Self {
        let code = indices
            .iter()
            .map(|i| ROOM_CODE_ALPHABET[i % ROOM_CODE_ALPHABET.len()] as char)
            .collect();
        Self(code)
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RoomCode {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
            .ok_or_else(|| ProtocolError::InvalidMessage(format!("invalid room code {value:?}")))
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

// ---------------------------------------------------------------------------
// Teams and scores
// ---------------------------------------------------------------------------

/// One of the two competing teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Red,
    Blue,
}

impl Team {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Blue => "blue",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Team {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "red" => Ok(Self::Red),
            "blue" => Ok(Self::Blue),
            other => Err(ProtocolError::InvalidMessage(format!("unknown team {other:?}"))),
        }
    }
}

/// Points per team. Only ever incremented, one at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    pub red: u32,
    pub blue: u32,
}

impl Scores {
    pub fn get(&self, team: Team) -> u32 {
        match team {
            Team::Red => self.red,
            Team::Blue => self.blue,
        }
    }

    /// Adds one point to `team`.
    pub fn award(&mut self, team: Team) {
        match team {
            Team::Red => self.red += 1,
            Team::Blue => self.blue += 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Room state as seen by clients
// ---------------------------------------------------------------------------

/// An opaque reference to a round image: a URL such as
/// `/uploads/A7F3/img_1.png` or an inline `data:` URI. The server never
/// looks inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(pub String);

impl From<&str> for ImageRef {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A player as shown in the lobby and scoreboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub team: Team,
}

/// Players grouped by team, each list in join order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRosters {
    pub red: Vec<PlayerView>,
    pub blue: Vec<PlayerView>,
}

/// Payload of `room-update`: everything a client needs to redraw the
/// lobby. Also what a reconnecting client is re-synced from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub players: Vec<PlayerView>,
    pub teams: TeamRosters,
    pub scores: Scores,
    pub started: bool,
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// An action a client asks the server to perform.
///
/// Adjacently tagged: `{"name": "join-room", "data": {"roomCode": "A7F3", ...}}`.
/// Events without a payload (`buzz`, `skip-round`, ...) may omit `data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Open a new room with the sender as host.
    CreateRoom {
        #[serde(default)]
        name: Option<String>,
    },

    /// Join a room as a player on the chosen team. `team` stays a raw
    /// string so an unknown value is reported as a bad team selection
    /// rather than an undecodable frame.
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        #[serde(default)]
        name: Option<String>,
        room_code: String,
        #[serde(default)]
        team: Option<String>,
    },

    /// Ask whether a room exists and how full each team is.
    #[serde(rename_all = "camelCase")]
    CheckRoom { room_code: String },

    /// Host: install the next round's images and answer without showing
    /// them to anyone yet.
    StageRound {
        answer: String,
        images: Vec<ImageRef>,
    },

    /// Host: launch the staged round. When `answer` and `images` are both
    /// given the round is staged and launched in one step.
    StartRound {
        #[serde(default)]
        answer: Option<String>,
        #[serde(default)]
        images: Option<Vec<ImageRef>>,
    },

    /// Player: claim the right to answer.
    Buzz,

    /// Host: rule on the current buzz.
    Judge { correct: bool },

    /// Host: let a blocked team buzz again.
    UnblockTeam { team: Team },

    /// Host: reveal the answer without awarding a point.
    SkipRound,

    /// Host: discard the current round and get ready for the next one.
    NewRound,

    /// Leave the room. Same effect as disconnecting.
    LeaveRoom,

    /// Keep-alive.
    #[serde(rename_all = "camelCase")]
    Heartbeat { client_time: u64 },
}

impl ClientEvent {
    /// The event's wire name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "create-room",
            Self::JoinRoom { .. } => "join-room",
            Self::CheckRoom { .. } => "check-room",
            Self::StageRound { .. } => "stage-round",
            Self::StartRound { .. } => "start-round",
            Self::Buzz => "buzz",
            Self::Judge { .. } => "judge",
            Self::UnblockTeam { .. } => "unblock-team",
            Self::SkipRound => "skip-round",
            Self::NewRound => "new-round",
            Self::LeaveRoom => "leave-room",
            Self::Heartbeat { .. } => "heartbeat",
        }
    }
}

/// A client frame: one event plus an optional acknowledgment id. When
/// `ack` is set and the event has a reply, the server answers with a
/// [`Payload::Ack`] carrying the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack: Option<u64>,
    pub event: ClientEvent,
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// A broadcast delivered to every member of a room (host included).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Roster or scores changed.
    RoomUpdate(RoomSnapshot),

    #[serde(rename_all = "camelCase")]
    RoundStarted {
        round_number: u32,
        images: Vec<ImageRef>,
        image_count: usize,
    },

    #[serde(rename_all = "camelCase")]
    PlayerBuzzed { player_name: String, team: Team },

    /// The buzzing player was right; the round is over.
    #[serde(rename_all = "camelCase")]
    RoundResult {
        winner_team: Team,
        answer: String,
        scores: Scores,
        guesser: String,
    },

    /// The buzzing player was wrong; their team is blocked.
    #[serde(rename_all = "camelCase")]
    BuzzWrong { player_name: String, team: Team },

    TeamUnblocked { team: Team },

    RoundSkipped { answer: String, scores: Scores },

    /// `round_number` is the number the next launched round will get.
    #[serde(rename_all = "camelCase")]
    NewRoundReady { round_number: u32, scores: Scores },

    /// The host left; the room no longer exists.
    RoomClosed,
}

impl ServerEvent {
    /// The event's wire name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RoomUpdate(_) => "room-update",
            Self::RoundStarted { .. } => "round-started",
            Self::PlayerBuzzed { .. } => "player-buzzed",
            Self::RoundResult { .. } => "round-result",
            Self::BuzzWrong { .. } => "buzz-wrong",
            Self::TeamUnblocked { .. } => "team-unblocked",
            Self::RoundSkipped { .. } => "round-skipped",
            Self::NewRoundReady { .. } => "new-round-ready",
            Self::RoomClosed => "room-closed",
        }
    }
}

/// Reply to `create-room`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomAck {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_code: Option<RoomCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Reply to `join-room`. On failure `error` holds a message meant to be
/// shown to the player as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomAck {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<Team>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_code: Option<RoomCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JoinRoomAck {
    pub fn joined(team: Team, room_code: RoomCode) -> Self {
        Self {
            success: true,
            team: Some(team),
            room_code: Some(room_code),
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            team: None,
            room_code: None,
            error: Some(error.into()),
        }
    }
}

/// Reply to `check-room`. Counts are present only when the room exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRoomAck {
    pub exists: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub red_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blue_count: Option<usize>,
}

impl CheckRoomAck {
    pub fn missing() -> Self {
        Self {
            exists: false,
            red_count: None,
            blue_count: None,
        }
    }
}

/// Body of an acknowledgment, tagged with the event it answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data", rename_all = "kebab-case")]
pub enum AckBody {
    CreateRoom(CreateRoomAck),
    JoinRoom(JoinRoomAck),
    CheckRoom(CheckRoomAck),
}

/// The content of a server frame.
///
/// Tagged as `{"type": "event", "data": {...}}` so the client can route
/// acks, broadcasts and housekeeping without inspecting the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum Payload {
    /// First frame on every connection: the identity the server will use
    /// for this socket.
    #[serde(rename_all = "camelCase")]
    Hello { player_id: PlayerId, version: u32 },

    /// Reply to a request that carried an `ack` id.
    Ack { id: u64, body: AckBody },

    /// A room broadcast.
    Event(ServerEvent),

    #[serde(rename_all = "camelCase")]
    HeartbeatAck { client_time: u64, server_time: u64 },

    /// The last frame could not be understood. `code` follows HTTP
    /// conventions (400 = bad request).
    Error { code: u16, message: String },
}

/// The top-level server frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-connection counter, starting at 0 with `hello`.
    pub seq: u64,
    /// Milliseconds since the connection was accepted.
    pub timestamp: u64,
    pub payload: Payload,
}

// =========================================================================
// Tests
// =========================================================================

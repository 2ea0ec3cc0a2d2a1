//! Wire protocol for Buzzer.
//!
//! This crate defines the "language" browser clients and the server speak:
//!
//! - **Types** ([`Request`], [`ClientEvent`], [`ServerEvent`], [`Envelope`],
//!   ...): the structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those structures are
//!   converted to and from frame bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong while doing so.
//!
//! # Architecture
//!
//! ```text
//! Transport (frames) → Protocol (Request / Envelope) → Session + Room
//! ```
//!
//! The protocol layer knows nothing about connections or room rules.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    AckBody, CheckRoomAck, ClientEvent, CreateRoomAck, Envelope, ImageRef, JoinRoomAck, Payload,
    PlayerId, PlayerView, ROOM_CODE_ALPHABET, ROOM_CODE_LEN, Request, RoomCode, RoomSnapshot,
    Scores, ServerEvent, Team, TeamRosters,
};

/// Protocol version announced in the `hello` frame. Bumped whenever an
/// event's shape changes incompatibly.
pub const PROTOCOL_VERSION: u32 = 1;

//! Rooms for Buzzer: the registry, the room actor, and the round state
//! machine.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! [`Room`] and applies commands strictly one at a time.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: creates, finds and closes rooms by code
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`Room`]: roster, scores and the current [`Round`]
//! - [`RoundAction`]: a host or player request against the round
//! - [`RoundPhase`]: where the round lifecycle currently stands
//! - [`RoomConfig`]: capacity limits

mod code;
mod config;
mod error;
mod registry;
mod room;
mod round;
mod state;

pub use code::{random_room_code, unique_room_code};
pub use config::{RoomConfig, RoundPhase};
pub use error::{JoinError, RoomError};
pub use registry::RoomRegistry;
pub use room::{PlayerSender, RoomHandle, RoomInfo};
pub use round::{Buzz, BuzzRejected, Round, RoundAction};
pub use state::{DEFAULT_HOST_NAME, Player, Room};

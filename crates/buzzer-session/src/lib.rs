//! Player session management for Buzzer.
//!
//! A session is the explicit record of what a connection is bound to: which
//! room, under which name, and whether it hosts that room or plays on a
//! team. The connection handler owns a [`SessionManager`] and hands the
//! caller's [`Session`] to every room transition, so the room state machine
//! never has to look at connection objects.
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)     ← receives the caller's Session with each action
//!     ↕
//! Session Layer (this)   ← connection → {room, role, name}
//!     ↕
//! Protocol Layer (below) ← PlayerId, RoomCode, Team
//! ```

mod error;
mod manager;
mod session;

pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{Role, Session};

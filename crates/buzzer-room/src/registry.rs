//! Room registry: creates, finds and closes rooms by code.
//!
//! # Concurrency note
//!
//! The map sits behind its own `RwLock`, held only to look up, insert or
//! remove a handle. Anything that talks to a room actor clones the handle
//! first and awaits with the lock released, so one busy room never stalls
//! joins or checks against another.

use std::collections::HashMap;

use buzzer_protocol::{PlayerId, RoomCode};
use tokio::sync::RwLock;

use crate::code::unique_room_code;
use crate::room::spawn_room;
use crate::state::Player;
use crate::{JoinError, PlayerSender, RoomConfig, RoomError, RoomHandle, RoomInfo};

/// Every live room, keyed by code.
///
/// Owned by the server state; empty at startup. A room leaves the map
/// only through [`close_room`](Self::close_room). The registry knows
/// nothing about which connection is in which room; that is the session
/// layer's job.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: RwLock<HashMap<RoomCode, RoomHandle>>,
    config: RoomConfig,
}

impl RoomRegistry {
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Creates a room owned by `host` and returns its handle.
    ///
    /// The code is drawn until it doesn't collide with a live room.
    pub async fn create_room(
        &self,
        host: PlayerId,
        host_name: Option<&str>,
        sender: PlayerSender,
    ) -> RoomHandle {
        let mut rooms = self.rooms.write().await;
        let code = unique_room_code(&mut rand::rng(), |c| rooms.contains_key(c));
        let handle = spawn_room(code.clone(), host, host_name, sender, self.config.clone());
        rooms.insert(code.clone(), handle.clone());
        tracing::info!(room = %code, %host, rooms = rooms.len(), "room created");
        handle
    }

    /// Looks up a room. Accepts lower case input.
    pub async fn get_room(&self, code: &str) -> Option<RoomHandle> {
        let code = RoomCode::parse(code)?;
        self.rooms.read().await.get(&code).cloned()
    }

    /// Joins `player` to the room named by `code`.
    ///
    /// # Errors
    /// [`JoinError::RoomNotFound`] for an unknown or malformed code, or a
    /// room that closed while the join was in flight; otherwise whatever
    /// the room itself rejects the join with.
    pub async fn join_room(
        &self,
        code: &str,
        player: PlayerId,
        name: Option<String>,
        team: Option<String>,
        sender: PlayerSender,
    ) -> Result<(RoomHandle, Player), JoinError> {
        let handle = self.get_room(code).await.ok_or(JoinError::RoomNotFound)?;
        let joined = handle.join(player, name, team, sender).await?;
        Ok((handle, joined))
    }

    /// Current info for a room, or `None` if no such room is live.
    pub async fn check_room(&self, code: &str) -> Option<RoomInfo> {
        self.get_room(code).await?.get_info().await.ok()
    }

    /// Removes a room and tells its members it closed.
    ///
    /// The code is unregistered before the actor is told, so a join racing
    /// the close either lands first (and sees `room-closed`) or finds
    /// nothing. Returns `false` (and does nothing) if the code isn't
    /// registered.
    pub async fn close_room(&self, code: &RoomCode) -> bool {
        let (handle, remaining) = {
            let mut rooms = self.rooms.write().await;
            let Some(handle) = rooms.remove(code) else {
                return false;
            };
            (handle, rooms.len())
        };
        let _ = handle.close().await;
        tracing::info!(room = %code, rooms = remaining, "room closed");
        true
    }

    /// Takes a player out of a room, broadcasting the new roster.
    ///
    /// Returns `Ok(false)` if the player isn't a member.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if no live room has this code.
    pub async fn remove_player(&self, code: &RoomCode, player: PlayerId) -> Result<bool, RoomError> {
        let handle = self
            .rooms
            .read()
            .await
            .get(code)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        handle.leave(player).await
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

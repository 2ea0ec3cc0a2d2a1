//! Room actor: an isolated Tokio task that owns one [`Room`].
//!
//! Every join, leave, round action and the final close for a room go
//! through this task's command queue and are applied one at a time. That
//! ordering is the only thing standing between two simultaneous buzzes,
//! and it is enough: whichever command is dequeued first wins the lock.

use std::collections::HashMap;

use buzzer_protocol::{PlayerId, RoomCode, ServerEvent, Team};
use buzzer_session::Session;
use tokio::sync::{mpsc, oneshot};

use crate::round::RoundAction;
use crate::state::{Player, Room};
use crate::{JoinError, RoomConfig, RoomError, RoundPhase};

/// Channel a member's connection handler reads room broadcasts from.
pub type PlayerSender = mpsc::UnboundedSender<ServerEvent>;

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    Join {
        player_id: PlayerId,
        name: Option<String>,
        team: Option<String>,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<Player, JoinError>>,
    },

    /// Replies `true` if the player was a member.
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<bool>,
    },

    /// A round action from a member (fire-and-forget).
    Act { caller: Session, action: RoundAction },

    GetInfo { reply: oneshot::Sender<RoomInfo> },

    /// Tell every member the room is gone, then stop.
    Close,
}

/// A snapshot of room metadata.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub code: RoomCode,
    pub host: PlayerId,
    pub player_count: usize,
    pub red_count: usize,
    pub blue_count: usize,
    pub round_number: u32,
    pub started: bool,
    pub phase: RoundPhase,
}

/// Handle to a running room actor.
///
/// Cheap to clone. The registry holds one per room and each member's
/// connection handler keeps its own copy so round actions skip the
/// registry entirely.
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl std::fmt::Debug for RoomHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomHandle").field("code", &self.code).finish()
    }
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.code.clone())
    }

    /// Adds a player. On success every member, the new one included,
    /// receives a `room-update`.
    pub async fn join(
        &self,
        player_id: PlayerId,
        name: Option<String>,
        team: Option<String>,
        sender: PlayerSender,
    ) -> Result<Player, JoinError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Join {
                player_id,
                name,
                team,
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Removes a player. Returns `Ok(false)` if they weren't a member.
    pub async fn leave(&self, player_id: PlayerId) -> Result<bool, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Leave {
                player_id,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Queues a round action. Whatever it broadcasts is delivered through
    /// the members' senders, not returned here.
    pub async fn act(&self, caller: Session, action: RoundAction) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Act { caller, action })
            .await
            .map_err(|_| self.unavailable())
    }

    pub async fn get_info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::GetInfo { reply: reply_tx })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Broadcasts `room-closed` and stops the actor. Commands queued
    /// before this one are still processed.
    pub async fn close(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Close)
            .await
            .map_err(|_| self.unavailable())
    }
}

/// The actor itself. Runs inside a Tokio task.
struct RoomActor {
    room: Room,
    /// Broadcast targets, host included.
    members: HashMap<PlayerId, PlayerSender>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    async fn run(mut self) {
        tracing::info!(room = %self.room.code(), "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Join {
                    player_id,
                    name,
                    team,
                    sender,
                    reply,
                } => {
                    let result = self.handle_join(player_id, name, team, sender);
                    let _ = reply.send(result);
                }
                RoomCommand::Leave { player_id, reply } => {
                    let _ = reply.send(self.handle_leave(player_id));
                }
                RoomCommand::Act { caller, action } => {
                    if let Some(event) = self.room.apply(&caller, action) {
                        self.broadcast(event);
                    }
                }
                RoomCommand::GetInfo { reply } => {
                    let _ = reply.send(self.info());
                }
                RoomCommand::Close => {
                    self.broadcast(ServerEvent::RoomClosed);
                    break;
                }
            }
        }

        tracing::info!(room = %self.room.code(), "room actor stopped");
    }

    fn handle_join(
        &mut self,
        player_id: PlayerId,
        name: Option<String>,
        team: Option<String>,
        sender: PlayerSender,
    ) -> Result<Player, JoinError> {
        let player = self
            .room
            .join(player_id, name.as_deref(), team.as_deref())
            .inspect_err(|reason| {
                tracing::debug!(room = %self.room.code(), %player_id, %reason, "join rejected");
            })?;

        self.members.insert(player_id, sender);
        tracing::info!(
            room = %self.room.code(),
            %player_id,
            team = %player.team,
            players = self.room.players().len(),
            "player joined"
        );
        self.broadcast(ServerEvent::RoomUpdate(self.room.snapshot()));
        Ok(player)
    }

    fn handle_leave(&mut self, player_id: PlayerId) -> bool {
        let Some(player) = self.room.remove_player(player_id) else {
            return false;
        };
        self.members.remove(&player_id);
        tracing::info!(
            room = %self.room.code(),
            %player_id,
            team = %player.team,
            players = self.room.players().len(),
            "player left"
        );
        self.broadcast(ServerEvent::RoomUpdate(self.room.snapshot()));
        true
    }

    /// Sends `event` to every member. A member whose receiver is gone
    /// (mid-disconnect) is skipped.
    fn broadcast(&self, event: ServerEvent) {
        tracing::debug!(
            room = %self.room.code(),
            event = event.name(),
            members = self.members.len(),
            "broadcast"
        );
        for sender in self.members.values() {
            let _ = sender.send(event.clone());
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            code: self.room.code().clone(),
            host: self.room.host(),
            player_count: self.room.players().len(),
            red_count: self.room.team_count(Team::Red),
            blue_count: self.room.team_count(Team::Blue),
            round_number: self.room.round_number(),
            started: self.room.is_started(),
            phase: self.room.phase(),
        }
    }
}

/// Spawns a room actor owned by `host` and returns a handle to it.
///
/// The host's sender is registered up front so the host hears every
/// broadcast. `config.command_buffer` bounds the command queue.
pub(crate) fn spawn_room(
    code: RoomCode,
    host: PlayerId,
    host_name: Option<&str>,
    host_sender: PlayerSender,
    config: RoomConfig,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.command_buffer.max(1));

    let actor = RoomActor {
        room: Room::new(code.clone(), host, host_name, config),
        members: HashMap::from([(host, host_sender)]),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle { code, sender: tx }
}

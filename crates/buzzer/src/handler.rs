//! Per-connection handler: hello, request dispatch, and broadcast relay.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Send `hello` with the identity this socket will use
//!   2. Loop until the connection ends, draining room broadcasts before
//!      reading the next client frame, pinging the peer on a fixed interval
//!      and dropping it once nothing at all has arrived for `idle_timeout`
//!   3. On exit, release whatever room binding the connection still holds

use std::sync::Arc;

use buzzer_protocol::{
    AckBody, CheckRoomAck, ClientEvent, Codec, CreateRoomAck, Envelope, JoinRoomAck, Payload,
    PROTOCOL_VERSION, PlayerId, Request, ServerEvent, Team,
};
use buzzer_room::{DEFAULT_HOST_NAME, JoinError, PlayerSender, RoomHandle, RoundAction};
use buzzer_session::{Session, SessionError};
use buzzer_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use crate::server::ServerState;
use crate::{BuzzerError, ImageStore};

/// A connection's current room: its session plus a cached handle to the
/// room actor, so round actions never touch the registry.
#[derive(Clone)]
struct Binding {
    session: Session,
    room: RoomHandle,
}

/// Drop guard that releases the connection's room binding when the
/// handler exits, however it exits.
///
/// `Drop` is synchronous, so the async cleanup runs in a spawned task.
struct ConnectionGuard<S: ImageStore, C: Codec> {
    binding: Option<Binding>,
    state: Arc<ServerState<S, C>>,
}

impl<S: ImageStore, C: Codec> Drop for ConnectionGuard<S, C> {
    fn drop(&mut self) {
        if let Some(binding) = self.binding.take() {
            let state = Arc::clone(&self.state);
            tokio::spawn(async move { release(&state, binding).await });
        }
    }
}

/// Writes envelopes to one connection, numbering them as it goes.
struct Outbox<'a, C: Codec> {
    conn: &'a WebSocketConnection,
    codec: &'a C,
    seq: u64,
    start: Instant,
}

impl<C: Codec> Outbox<'_, C> {
    async fn send(&mut self, payload: Payload) -> Result<(), BuzzerError> {
        let envelope = Envelope {
            seq: next_seq(&mut self.seq),
            timestamp: self.start.elapsed().as_millis() as u64,
            payload,
        };
        let bytes = self.codec.encode(&envelope)?;
        self.conn.send(&bytes).await?;
        Ok(())
    }

    /// Sends an ack, but only if the request asked for one.
    async fn ack(&mut self, id: Option<u64>, body: AckBody) -> Result<(), BuzzerError> {
        match id {
            Some(id) => self.send(Payload::Ack { id, body }).await,
            None => Ok(()),
        }
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<S, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<S, C>>,
) -> Result<(), BuzzerError>
where
    S: ImageStore,
    C: Codec,
{
    let conn_id = conn.id();
    let player_id = PlayerId(conn_id.into_inner());
    tracing::debug!(%conn_id, %player_id, "handling new connection");

    let mut out = Outbox {
        conn: &conn,
        codec: &state.codec,
        seq: 0,
        start: Instant::now(),
    };
    out.send(Payload::Hello {
        player_id,
        version: PROTOCOL_VERSION,
    })
    .await?;

    let mut guard = ConnectionGuard {
        binding: None,
        state: Arc::clone(&state),
    };
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<ServerEvent>();
    let mut deadline = Instant::now() + state.idle_timeout;
    let mut pings =
        tokio::time::interval_at(Instant::now() + state.ping_interval, state.ping_interval);
    pings.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            // Broadcasts first: a `room-closed` already queued must be seen
            // before the next request is read.
            biased;

            Some(event) = events_rx.recv() => {
                if event == ServerEvent::RoomClosed {
                    if let Some(binding) = guard.binding.take() {
                        // A join can land just before its room closes, after
                        // the host's cleanup unbound the room's sessions.
                        state.sessions.lock().await.unbind(player_id);
                        tracing::debug!(%player_id, room = %binding.session.room_code, "room closed, binding dropped");
                    }
                }
                out.send(Payload::Event(event)).await?;
            }

            frame = conn.recv() => {
                let data = match frame {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%player_id, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%player_id, error = %e, "recv error");
                        break;
                    }
                };
                deadline = Instant::now() + state.idle_timeout;

                let request: Request = match state.codec.decode(&data) {
                    Ok(request) => request,
                    Err(e) => {
                        tracing::debug!(%player_id, error = %e, "failed to decode request");
                        out.send(Payload::Error {
                            code: 400,
                            message: format!("invalid request: {e}"),
                        })
                        .await?;
                        continue;
                    }
                };

                handle_request(&state, &mut out, &mut guard, player_id, &events_tx, request)
                    .await?;
            }

            _ = pings.tick() => {
                conn.ping().await?;
            }

            _ = tokio::time::sleep_until(deadline) => {
                // Pongs and other control frames keep the connection alive too.
                let seen = Instant::from_std(conn.last_seen()) + state.idle_timeout;
                if seen > Instant::now() {
                    deadline = seen;
                    continue;
                }
                tracing::info!(%player_id, "connection timed out");
                break;
            }
        }
    }

    // guard drops here → room binding released.
    Ok(())
}

/// Dispatches one client request.
async fn handle_request<S, C>(
    state: &ServerState<S, C>,
    out: &mut Outbox<'_, C>,
    guard: &mut ConnectionGuard<S, C>,
    player_id: PlayerId,
    events_tx: &PlayerSender,
    request: Request,
) -> Result<(), BuzzerError>
where
    S: ImageStore,
    C: Codec,
{
    let Request { ack, event } = request;
    tracing::trace!(%player_id, event = event.name(), "request");

    match event {
        ClientEvent::Heartbeat { client_time } => {
            out.send(Payload::HeartbeatAck {
                client_time,
                server_time: out.start.elapsed().as_millis() as u64,
            })
            .await?;
        }

        ClientEvent::CreateRoom { name } => {
            let result = match guard.binding {
                Some(_) => Err(JoinError::AlreadyJoined),
                None => create_room(state, player_id, name.as_deref(), events_tx)
                    .await
                    .map_err(|e| {
                        tracing::warn!(%player_id, error = %e, "create refused, stale session");
                        JoinError::AlreadyJoined
                    }),
            };
            let reply = match result {
                Ok(binding) => {
                    let code = binding.room.code().clone();
                    guard.binding = Some(binding);
                    CreateRoomAck {
                        success: true,
                        room_code: Some(code),
                        error: None,
                    }
                }
                Err(e) => CreateRoomAck {
                    success: false,
                    room_code: None,
                    error: Some(e.localized().to_string()),
                },
            };
            out.ack(ack, AckBody::CreateRoom(reply)).await?;
        }

        ClientEvent::JoinRoom {
            name,
            room_code,
            team,
        } => {
            let result = match guard.binding {
                Some(_) => Err(JoinError::AlreadyJoined),
                None => join_room(state, player_id, &room_code, name, team, events_tx).await,
            };
            let reply = match result {
                Ok((binding, team)) => {
                    let reply = JoinRoomAck::joined(team, binding.room.code().clone());
                    guard.binding = Some(binding);
                    reply
                }
                Err(e) => {
                    tracing::debug!(%player_id, room = %room_code, reason = %e, "join refused");
                    JoinRoomAck::rejected(e.localized())
                }
            };
            out.ack(ack, AckBody::JoinRoom(reply)).await?;
        }

        ClientEvent::CheckRoom { room_code } => {
            let info = state.rooms.check_room(&room_code).await;
            let reply = match info {
                Some(info) => CheckRoomAck {
                    exists: true,
                    red_count: Some(info.red_count),
                    blue_count: Some(info.blue_count),
                },
                None => CheckRoomAck::missing(),
            };
            out.ack(ack, AckBody::CheckRoom(reply)).await?;
        }

        ClientEvent::LeaveRoom => match guard.binding.take() {
            Some(binding) => release(state, binding).await,
            None => tracing::debug!(%player_id, "leave-room without a room, ignoring"),
        },

        round_event => {
            let Some(action) = round_action(round_event) else {
                return Ok(());
            };
            let Some(binding) = &guard.binding else {
                tracing::debug!(%player_id, "round action without a room, ignoring");
                return Ok(());
            };
            if let Err(e) = binding.room.act(binding.session.clone(), action).await {
                tracing::debug!(%player_id, error = %e, "room gone, dropping binding");
                guard.binding = None;
            }
        }
    }

    Ok(())
}

/// Maps the round-related client events onto room actions.
fn round_action(event: ClientEvent) -> Option<RoundAction> {
    let action = match event {
        ClientEvent::StageRound { answer, images } => RoundAction::Stage { answer, images },
        ClientEvent::StartRound { answer, images } => RoundAction::Start { answer, images },
        ClientEvent::Buzz => RoundAction::Buzz,
        ClientEvent::Judge { correct } => RoundAction::Judge { correct },
        ClientEvent::UnblockTeam { team } => RoundAction::UnblockTeam(team),
        ClientEvent::SkipRound => RoundAction::Skip,
        ClientEvent::NewRound => RoundAction::NewRound,
        _ => return None,
    };
    Some(action)
}

/// Opens a room hosted by this connection.
///
/// A session left behind for this connection refuses the create before
/// any room is spawned; if one shows up anyway the new room is closed
/// again rather than left without a host.
async fn create_room<S, C>(
    state: &ServerState<S, C>,
    player_id: PlayerId,
    name: Option<&str>,
    events_tx: &PlayerSender,
) -> Result<Binding, SessionError>
where
    S: ImageStore,
    C: Codec,
{
    if let Some(existing) = state.sessions.lock().await.get(&player_id) {
        return Err(SessionError::AlreadyBound(
            player_id,
            existing.room_code.clone(),
        ));
    }

    let room = state
        .rooms
        .create_room(player_id, name, events_tx.clone())
        .await;

    let host_name = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_HOST_NAME);
    let session = Session::host(player_id, room.code().clone(), host_name);
    let bound = state.sessions.lock().await.bind(session.clone()).map(|_| ());
    if let Err(e) = bound {
        state.rooms.close_room(room.code()).await;
        return Err(e);
    }

    Ok(Binding { session, room })
}

async fn join_room<S, C>(
    state: &ServerState<S, C>,
    player_id: PlayerId,
    room_code: &str,
    name: Option<String>,
    team: Option<String>,
    events_tx: &PlayerSender,
) -> Result<(Binding, Team), JoinError>
where
    S: ImageStore,
    C: Codec,
{
    let (room, player) = state
        .rooms
        .join_room(room_code, player_id, name, team, events_tx.clone())
        .await?;

    let team = player.team;
    let session = Session::player(player_id, room.code().clone(), player.name, team);
    let bound = state.sessions.lock().await.bind(session.clone()).map(|_| ());
    if let Err(e) = bound {
        tracing::warn!(%player_id, error = %e, "joined room while already bound");
        let _ = room.leave(player_id).await;
        return Err(JoinError::AlreadyJoined);
    }

    Ok((Binding { session, room }, team))
}

/// Undoes a binding. A host takes the whole room down with them; a
/// player just leaves it.
///
/// The room is unregistered before its sessions are dropped, so no join
/// can slip in behind the unbind.
async fn release<S, C>(state: &ServerState<S, C>, binding: Binding)
where
    S: ImageStore,
    C: Codec,
{
    let code = &binding.session.room_code;
    let player_id = binding.session.player_id;

    if binding.session.is_host() {
        state.rooms.close_room(code).await;
        let unbound = state.sessions.lock().await.unbind_room(code);
        state.images.release(code).await;
        let rooms = state.rooms.room_count().await;
        tracing::info!(
            room = %code,
            host = %player_id,
            members = unbound.len(),
            rooms,
            "host left, room closed"
        );
    } else {
        state.sessions.lock().await.unbind(player_id);
        match state.rooms.remove_player(code, player_id).await {
            Ok(_) => tracing::info!(room = %code, %player_id, "player left"),
            Err(e) => tracing::debug!(room = %code, error = %e, "leave after room closed"),
        }
    }
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}

//! Integration tests for the room system: registry + actor + round state.

use buzzer_protocol::{ImageRef, PlayerId, Scores, ServerEvent, Team};
use buzzer_room::{
    JoinError, PlayerSender, RoomConfig, RoomHandle, RoomRegistry, RoundAction, RoundPhase,
};
use buzzer_session::Session;
use tokio::sync::mpsc;

// =========================================================================
// Helpers
// =========================================================================

const HOST: PlayerId = PlayerId(1);

type Inbox = mpsc::UnboundedReceiver<ServerEvent>;

fn channel() -> (PlayerSender, Inbox) {
    mpsc::unbounded_channel()
}

/// Drains everything already delivered to `rx`.
fn drain(rx: &mut Inbox) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Waits until the actor has processed everything queued before this call.
async fn settle(room: &RoomHandle) {
    room.get_info().await.unwrap();
}

struct Table {
    registry: RoomRegistry,
    room: RoomHandle,
    host: Session,
    host_rx: Inbox,
}

impl Table {
    async fn new() -> Self {
        let registry = RoomRegistry::new(RoomConfig::default());
        let (tx, host_rx) = channel();
        let room = registry.create_room(HOST, Some("Host"), tx).await;
        let host = Session::host(HOST, room.code().clone(), "Host");
        Self {
            registry,
            room,
            host,
            host_rx,
        }
    }

    async fn join(&self, id: u64, name: &str, team: &str) -> Result<(Session, Inbox), JoinError> {
        let (tx, rx) = channel();
        let (_, player) = self
            .registry
            .join_room(
                self.room.code().as_str(),
                PlayerId(id),
                Some(name.into()),
                Some(team.into()),
                tx,
            )
            .await?;
        let session = Session::player(player.id, self.room.code().clone(), player.name, player.team);
        Ok((session, rx))
    }

    async fn host_act(&self, action: RoundAction) {
        self.room.act(self.host.clone(), action).await.unwrap();
    }

    async fn start(&self, answer: &str, count: usize) {
        let images = (0..count)
            .map(|i| ImageRef(format!("/uploads/{}/img_{i}.png", self.room.code())))
            .collect();
        self.host_act(RoundAction::Start {
            answer: Some(answer.into()),
            images: Some(images),
        })
        .await;
    }
}

// =========================================================================
// Registry + roster
// =========================================================================

#[tokio::test]
async fn test_create_rooms_get_distinct_codes() {
    let registry = RoomRegistry::default();
    let mut codes = Vec::new();
    for i in 1..=20 {
        let room = registry.create_room(PlayerId(i), None, channel().0).await;
        codes.push(room.code().clone());
    }

    let mut unique = codes.clone();
    unique.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    unique.dedup();
    assert_eq!(unique.len(), 20);
    assert_eq!(registry.room_count().await, 20);
}

#[tokio::test]
async fn test_join_broadcasts_room_update_to_everyone() {
    let mut table = Table::new().await;
    let (_a, mut a_rx) = table.join(2, "A", "red").await.unwrap();

    let expected = |events: Vec<ServerEvent>| match events.as_slice() {
        [ServerEvent::RoomUpdate(snap)] => {
            assert_eq!(snap.players.len(), 1);
            assert_eq!(snap.teams.red[0].name, "A");
            assert!(!snap.started);
        }
        other => panic!("expected one room-update, got {other:?}"),
    };
    expected(drain(&mut table.host_rx));
    expected(drain(&mut a_rx));
}

#[tokio::test]
async fn test_join_rejections_in_order() {
    let table = Table::new().await;
    table.join(2, "A", "red").await.unwrap();
    table.join(3, "B", "red").await.unwrap();

    assert_eq!(table.join(4, "C", "red").await.err(), Some(JoinError::TeamFull));
    assert_eq!(table.join(4, "C", "").await.err(), Some(JoinError::InvalidTeam));

    table.join(4, "C", "blue").await.unwrap();
    table.join(5, "D", "blue").await.unwrap();
    assert_eq!(table.join(6, "E", "blue").await.err(), Some(JoinError::RoomFull));
}

#[tokio::test]
async fn test_rejected_join_broadcasts_nothing() {
    let mut table = Table::new().await;
    assert!(table.join(2, "A", "purple").await.is_err());
    settle(&table.room).await;
    assert!(drain(&mut table.host_rx).is_empty());
}

#[tokio::test]
async fn test_remove_player_broadcasts_roster() {
    let mut table = Table::new().await;
    let (_a, _a_rx) = table.join(2, "A", "red").await.unwrap();
    let (_b, mut b_rx) = table.join(3, "B", "blue").await.unwrap();
    drain(&mut table.host_rx);
    drain(&mut b_rx);

    assert!(table.registry.remove_player(table.room.code(), PlayerId(2)).await.unwrap());

    for rx in [&mut table.host_rx, &mut b_rx] {
        match drain(rx).as_slice() {
            [ServerEvent::RoomUpdate(snap)] => {
                assert_eq!(snap.players.len(), 1);
                assert!(snap.teams.red.is_empty());
            }
            other => panic!("expected one room-update, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_close_room_notifies_all_members() {
    let mut table = Table::new().await;
    let (_a, mut a_rx) = table.join(2, "A", "red").await.unwrap();
    drain(&mut a_rx);
    drain(&mut table.host_rx);

    let code = table.room.code().clone();
    assert!(table.registry.close_room(&code).await);

    assert_eq!(a_rx.recv().await, Some(ServerEvent::RoomClosed));
    assert_eq!(table.host_rx.recv().await, Some(ServerEvent::RoomClosed));
    assert!(table.registry.check_room(code.as_str()).await.is_none());
    assert!(table.room.get_info().await.is_err());
}

#[tokio::test]
async fn test_join_racing_close_is_refused_or_notified() {
    for _ in 0..50 {
        let table = Table::new().await;
        let code = table.room.code().clone();

        let (joined, closed) = tokio::join!(
            table.join(2, "A", "red"),
            table.registry.close_room(&code)
        );
        assert!(closed);

        match joined {
            Ok((_, mut rx)) => loop {
                match rx.recv().await {
                    Some(ServerEvent::RoomClosed) => break,
                    Some(_) => continue,
                    None => panic!("member dropped without room-closed"),
                }
            },
            Err(e) => assert_eq!(e, JoinError::RoomNotFound),
        }
        assert!(table.registry.get_room(code.as_str()).await.is_none());
    }
}

// =========================================================================
// Round flow through the actor
// =========================================================================

#[tokio::test]
async fn test_buzz_then_correct_judgment_scenario() {
    let mut table = Table::new().await;
    let (a, mut a_rx) = table.join(2, "A", "red").await.unwrap();
    let (b, _b_rx) = table.join(3, "B", "blue").await.unwrap();

    table.start("قطة", 2).await;
    table.room.act(a, RoundAction::Buzz).await.unwrap();
    table.room.act(b, RoundAction::Buzz).await.unwrap();
    table.host_act(RoundAction::Judge { correct: true }).await;
    settle(&table.room).await;

    let events: Vec<_> = drain(&mut a_rx)
        .into_iter()
        .filter(|e| !matches!(e, ServerEvent::RoomUpdate(_)))
        .collect();
    assert_eq!(events.len(), 3, "{events:?}");
    assert!(matches!(events[0], ServerEvent::RoundStarted { round_number: 1, image_count: 2, .. }));
    assert_eq!(
        events[1],
        ServerEvent::PlayerBuzzed {
            player_name: "A".into(),
            team: Team::Red,
        }
    );
    assert_eq!(
        events[2],
        ServerEvent::RoundResult {
            winner_team: Team::Red,
            answer: "قطة".into(),
            scores: Scores { red: 1, blue: 0 },
            guesser: "A".into(),
        }
    );

    // Host saw the same stream.
    let host_events = drain(&mut table.host_rx);
    assert!(host_events.contains(&events[2]));

    let info = table.room.get_info().await.unwrap();
    assert_eq!(info.phase, RoundPhase::Resolved);
    assert!(info.started);
}

#[tokio::test]
async fn test_wrong_buzz_then_other_team_wins() {
    let mut table = Table::new().await;
    let (a, _a_rx) = table.join(2, "A", "red").await.unwrap();
    let (b, _b_rx) = table.join(3, "B", "blue").await.unwrap();
    table.start("x", 1).await;
    settle(&table.room).await;
    drain(&mut table.host_rx);

    table.room.act(a.clone(), RoundAction::Buzz).await.unwrap();
    table.host_act(RoundAction::Judge { correct: false }).await;
    table.room.act(a, RoundAction::Buzz).await.unwrap();
    table.room.act(b, RoundAction::Buzz).await.unwrap();
    table.host_act(RoundAction::Judge { correct: true }).await;
    settle(&table.room).await;

    let events = drain(&mut table.host_rx);
    let names: Vec<_> = events.iter().map(ServerEvent::name).collect();
    assert_eq!(
        names,
        ["player-buzzed", "buzz-wrong", "player-buzzed", "round-result"]
    );
    assert!(matches!(
        events[3],
        ServerEvent::RoundResult { winner_team: Team::Blue, scores: Scores { red: 0, blue: 1 }, .. }
    ));
}

#[tokio::test]
async fn test_staged_round_is_not_broadcast() {
    let mut table = Table::new().await;
    let (a, mut a_rx) = table.join(2, "A", "red").await.unwrap();
    drain(&mut a_rx);

    table
        .host_act(RoundAction::Stage {
            answer: "x".into(),
            images: vec!["/a.png".into()],
        })
        .await;
    table.room.act(a, RoundAction::Buzz).await.unwrap();
    settle(&table.room).await;

    assert!(drain(&mut a_rx).is_empty());
    let info = table.room.get_info().await.unwrap();
    assert_eq!(info.phase, RoundPhase::Staged);
    assert_eq!(info.round_number, 0);

    table
        .host_act(RoundAction::Start {
            answer: None,
            images: None,
        })
        .await;
    settle(&table.room).await;
    assert!(matches!(
        drain(&mut a_rx).as_slice(),
        [ServerEvent::RoundStarted { round_number: 1, .. }]
    ));
}

#[tokio::test]
async fn test_non_host_actions_are_silent() {
    let mut table = Table::new().await;
    let (a, mut a_rx) = table.join(2, "A", "red").await.unwrap();
    table.start("x", 1).await;
    table.room.act(a.clone(), RoundAction::Buzz).await.unwrap();
    settle(&table.room).await;
    drain(&mut a_rx);
    drain(&mut table.host_rx);

    for action in [
        RoundAction::Judge { correct: true },
        RoundAction::Skip,
        RoundAction::NewRound,
        RoundAction::UnblockTeam(Team::Red),
    ] {
        table.room.act(a.clone(), action).await.unwrap();
    }
    settle(&table.room).await;

    assert!(drain(&mut a_rx).is_empty());
    assert!(drain(&mut table.host_rx).is_empty());
    assert_eq!(table.room.get_info().await.unwrap().phase, RoundPhase::Buzzed);
}

#[tokio::test]
async fn test_skip_and_new_round() {
    let mut table = Table::new().await;
    table.start("x", 1).await;
    table.host_act(RoundAction::Skip).await;
    table.host_act(RoundAction::NewRound).await;
    settle(&table.room).await;

    let events = drain(&mut table.host_rx);
    assert_eq!(
        events[1..],
        [
            ServerEvent::RoundSkipped {
                answer: "x".into(),
                scores: Scores::default(),
            },
            ServerEvent::NewRoundReady {
                round_number: 2,
                scores: Scores::default(),
            },
        ]
    );
    assert_eq!(table.room.get_info().await.unwrap().phase, RoundPhase::NoRound);
}

// =========================================================================
// Concurrency
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_buzzes_have_exactly_one_winner() {
    for _ in 0..20 {
        let mut table = Table::new().await;
        let mut players = Vec::new();
        for (id, team) in [(2, "red"), (3, "red"), (4, "blue"), (5, "blue")] {
            players.push(table.join(id, &format!("P{id}"), team).await.unwrap().0);
        }
        table.start("x", 1).await;
        settle(&table.room).await;
        drain(&mut table.host_rx);

        let tasks: Vec<_> = players
            .into_iter()
            .map(|session| {
                let room = table.room.clone();
                tokio::spawn(async move { room.act(session, RoundAction::Buzz).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        settle(&table.room).await;

        let buzzes = drain(&mut table.host_rx)
            .into_iter()
            .filter(|e| matches!(e, ServerEvent::PlayerBuzzed { .. }))
            .count();
        assert_eq!(buzzes, 1);
        assert_eq!(table.room.get_info().await.unwrap().phase, RoundPhase::Buzzed);
    }
}

#[tokio::test]
async fn test_player_leaving_while_buzzed_keeps_lock() {
    let table = Table::new().await;
    let (a, _a_rx) = table.join(2, "A", "red").await.unwrap();
    table.start("x", 1).await;
    table.room.act(a, RoundAction::Buzz).await.unwrap();
    settle(&table.room).await;

    assert!(table.registry.remove_player(table.room.code(), PlayerId(2)).await.unwrap());
    assert_eq!(table.room.get_info().await.unwrap().phase, RoundPhase::Buzzed);

    table.host_act(RoundAction::Judge { correct: true }).await;
    assert_eq!(table.room.get_info().await.unwrap().phase, RoundPhase::Resolved);
}

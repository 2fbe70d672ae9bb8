//! End-to-end scenarios for the room session manager.

use crate::config::RoomConfig;
use crate::connection::ConnectionId;
use crate::error::RoomError;
use crate::room::{DeliveryError, EventSink, MoveRequest, Role, RoomOptions, RoomSessionManager};
use crate::rules::{ChessRules, RulesEngine};
use crate::stats::ServerStats;
use crate::store::{FileRoomStore, MemoryRoomStore, RoomStore};
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Captures every delivered frame so tests can assert on who received what.
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    frames: Mutex<Vec<(ConnectionId, Value)>>,
}

impl RecordingSink {
    pub(crate) fn events_for(&self, connection: ConnectionId) -> Vec<Value> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| *to == connection)
            .map(|(_, frame)| frame.clone())
            .collect()
    }

    pub(crate) fn event_names_for(&self, connection: ConnectionId) -> Vec<String> {
        self.events_for(connection)
            .iter()
            .map(|frame| frame["event"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    pub(crate) fn clear(&self) {
        self.frames.lock().unwrap().clear();
    }
}

impl EventSink for RecordingSink {
    fn deliver(&self, connection: ConnectionId, payload: Vec<u8>) -> Result<(), DeliveryError> {
        let frame: Value = serde_json::from_slice(&payload).map_err(|_| DeliveryError::Disconnected)?;
        self.frames.lock().unwrap().push((connection, frame));
        Ok(())
    }
}

struct Harness {
    rooms: Arc<RoomSessionManager>,
    sink: Arc<RecordingSink>,
    store: Arc<dyn RoomStore>,
}

fn harness_with_store(store: Arc<dyn RoomStore>) -> Harness {
    let sink = Arc::new(RecordingSink::default());
    let rooms = Arc::new(RoomSessionManager::new(
        store.clone(),
        Arc::new(ChessRules::new()),
        sink.clone(),
        RoomConfig::default(),
        Arc::new(ServerStats::new()),
    ));
    Harness { rooms, sink, store }
}

fn harness() -> Harness {
    harness_with_store(Arc::new(MemoryRoomStore::new()))
}

fn mv(from: &str, to: &str) -> MoveRequest {
    MoveRequest {
        from: from.to_string(),
        to: to.to_string(),
        promotion: None,
    }
}

/// Creates `r1` with connection 1 as first mover and 2 as second mover.
async fn seated_room(h: &Harness) {
    h.rooms.create_room(Some("r1"), RoomOptions::default()).await.unwrap();
    h.rooms.join_room("r1", 1, None).await.unwrap();
    h.rooms.join_room("r1", 2, None).await.unwrap();
}

#[tokio::test]
async fn test_create_join_move_disconnect_scenario() {
    let h = harness();

    let room_id = h.rooms.create_room(Some("r1"), RoomOptions::default()).await.unwrap();
    assert_eq!(room_id.as_str(), "r1");

    let a = h.rooms.join_room("r1", 1, Some("alice".to_string())).await.unwrap();
    assert_eq!(a.role, Role::FirstMover);
    let b = h.rooms.join_room("r1", 2, Some("bob".to_string())).await.unwrap();
    assert_eq!(b.role, Role::SecondMover);

    let e4 = h.rooms.submit_move("r1", 1, mv("e2", "e4")).await.unwrap();
    assert_eq!(e4.notation, "e4");
    assert_eq!(e4.ply, 1);
    assert_ne!(e4.position, a.position);

    // A cannot move twice in a row
    let again = h.rooms.submit_move("r1", 1, mv("d2", "d4")).await;
    assert!(matches!(again, Err(RoomError::NotYourTurn)));

    let e5 = h.rooms.submit_move("r1", 2, mv("e7", "e5")).await.unwrap();
    assert_eq!(e5.notation, "e5");

    h.rooms.handle_disconnect(1).await;

    let snapshot = h.rooms.get_room("r1").await.unwrap();
    assert!(snapshot.membership.seats.first_mover.is_none());
    assert_eq!(
        snapshot.membership.seats.second_mover.unwrap().identity.as_deref(),
        Some("bob")
    );
    assert!(!snapshot.is_finished);
    assert_eq!(snapshot.move_log, vec!["e4", "e5"]);
}

#[tokio::test]
async fn test_duplicate_room_is_rejected() {
    let h = harness();
    h.rooms.create_room(Some("r1"), RoomOptions::default()).await.unwrap();
    let again = h.rooms.create_room(Some("r1"), RoomOptions::default()).await;
    assert!(matches!(again, Err(RoomError::RoomAlreadyExists(id)) if id == "r1"));
}

#[tokio::test]
async fn test_missing_room() {
    let h = harness();
    assert!(matches!(h.rooms.join_room("ghost", 1, None).await, Err(RoomError::RoomNotFound(_))));
    assert!(matches!(
        h.rooms.submit_move("ghost", 1, mv("e2", "e4")).await,
        Err(RoomError::RoomNotFound(_))
    ));
    assert!(matches!(h.rooms.get_room("ghost").await, Err(RoomError::RoomNotFound(_))));
}

#[tokio::test]
async fn test_seats_then_observers() {
    let h = harness();
    h.rooms.create_room(Some("r1"), RoomOptions::default()).await.unwrap();

    let roles: Vec<Role> = {
        let mut roles = Vec::new();
        for connection in 1..=4 {
            roles.push(h.rooms.join_room("r1", connection, None).await.unwrap().role);
        }
        roles
    };
    assert_eq!(roles, vec![Role::FirstMover, Role::SecondMover, Role::Observer, Role::Observer]);

    let snapshot = h.rooms.get_room("r1").await.unwrap();
    assert_eq!(snapshot.membership.observer_count, 2);

    // Each join broadcast its membership change to everyone present at the time
    assert_eq!(h.sink.event_names_for(1).len(), 4);
    assert_eq!(h.sink.event_names_for(4), vec!["membership_changed"]);
}

#[tokio::test]
async fn test_rejoin_is_idempotent() {
    let h = harness();
    seated_room(&h).await;
    h.sink.clear();

    let again = h.rooms.join_room("r1", 1, None).await.unwrap();
    assert_eq!(again.role, Role::FirstMover);
    assert_eq!(h.sink.len(), 0);
    assert_eq!(h.rooms.get_room("r1").await.unwrap().membership.observer_count, 0);
}

#[tokio::test]
async fn test_joining_another_room_releases_the_first() {
    let h = harness();
    seated_room(&h).await;
    h.rooms.create_room(Some("r2"), RoomOptions::default()).await.unwrap();
    h.sink.clear();

    let joined = h.rooms.join_room("r2", 1, None).await.unwrap();
    assert_eq!(joined.role, Role::FirstMover);

    let r1 = h.rooms.get_room("r1").await.unwrap();
    assert!(r1.membership.seats.first_mover.is_none());
    assert!(r1.membership.seats.second_mover.is_some());
    assert_eq!(h.sink.event_names_for(2), vec!["membership_changed"]);
    assert_eq!(h.rooms.registry().lookup(1).unwrap().room_id.as_str(), "r2");
}

#[tokio::test]
async fn test_move_from_observer_or_stranger_is_not_a_player() {
    let h = harness();
    seated_room(&h).await;
    h.rooms.join_room("r1", 3, None).await.unwrap();
    let before = h.rooms.get_room("r1").await.unwrap();

    for connection in [3, 99] {
        let result = h.rooms.submit_move("r1", connection, mv("e2", "e4")).await;
        assert!(matches!(result, Err(RoomError::NotAPlayer)));
    }
    assert_eq!(h.rooms.get_room("r1").await.unwrap(), before);
}

#[tokio::test]
async fn test_out_of_turn_and_illegal_moves_leave_state_unchanged() {
    let h = harness();
    seated_room(&h).await;
    let before = h.rooms.get_room("r1").await.unwrap();
    h.sink.clear();

    let early = h.rooms.submit_move("r1", 2, mv("e7", "e5")).await;
    assert!(matches!(early, Err(RoomError::NotYourTurn)));

    let illegal = h.rooms.submit_move("r1", 1, mv("e2", "e5")).await;
    assert!(matches!(illegal, Err(RoomError::IllegalMove(_))));

    assert_eq!(h.rooms.get_room("r1").await.unwrap(), before);
    assert_eq!(h.sink.len(), 0, "rejections must not be broadcast");
    assert_eq!(h.rooms.stats().moves_rejected, 2);
}

#[tokio::test]
async fn test_checkmate_finishes_the_game() {
    let h = harness();
    seated_room(&h).await;
    h.rooms.join_room("r1", 3, None).await.unwrap();
    h.sink.clear();

    h.rooms.submit_move("r1", 1, mv("f2", "f3")).await.unwrap();
    h.rooms.submit_move("r1", 2, mv("e7", "e5")).await.unwrap();
    h.rooms.submit_move("r1", 1, mv("g2", "g4")).await.unwrap();
    let mate = h.rooms.submit_move("r1", 2, mv("d8", "h4")).await.unwrap();

    assert_eq!(mate.notation, "Qh4#");
    assert!(mate.is_finished);
    assert_eq!(mate.result.as_deref(), Some("second-mover wins by checkmate"));

    let observed = h.sink.event_names_for(3);
    assert_eq!(observed.len(), 5);
    assert_eq!(observed[3], "move_applied");
    assert_eq!(observed[4], "game_over");
    assert_eq!(h.sink.events_for(3)[4]["data"]["result"], "second-mover wins by checkmate");

    let before = h.rooms.get_room("r1").await.unwrap();
    let after_end = h.rooms.submit_move("r1", 1, mv("e2", "e4")).await;
    assert!(matches!(after_end, Err(RoomError::GameAlreadyFinished)));
    assert_eq!(h.rooms.get_room("r1").await.unwrap(), before);
}

#[tokio::test]
async fn test_threefold_repetition_draws_the_game() {
    let h = harness();
    seated_room(&h).await;
    h.sink.clear();

    let shuffle = [(1, "g1", "f3"), (2, "g8", "f6"), (1, "f3", "g1"), (2, "f6", "g8")];
    let mut last = None;
    for (ply, (connection, from, to)) in shuffle.iter().chain(shuffle.iter()).enumerate() {
        let outcome = h.rooms.submit_move("r1", *connection, mv(from, to)).await.unwrap();
        assert_eq!(outcome.is_finished, ply == 7, "ply {ply}");
        last = Some(outcome);
    }

    let last = last.unwrap();
    assert_eq!(last.notation, "Ng8");
    assert_eq!(last.result.as_deref(), Some("draw by threefold repetition"));

    let events = h.sink.event_names_for(1);
    assert_eq!(events.last().map(String::as_str), Some("game_over"));
    assert_eq!(events.iter().filter(|name| *name == "game_over").count(), 1);

    let snapshot = h.rooms.get_room("r1").await.unwrap();
    assert!(snapshot.is_finished);
    assert_eq!(snapshot.move_log.len(), 8);
    assert!(matches!(
        h.rooms.submit_move("r1", 1, mv("g1", "f3")).await,
        Err(RoomError::GameAlreadyFinished)
    ));
}

#[tokio::test]
async fn test_promotion_defaults_to_queen() {
    let h = harness();
    seated_room(&h).await;

    // Walk the h-pawn through to promotion
    let line = [
        (1, "h2", "h4"),
        (2, "g7", "g5"),
        (1, "h4", "g5"),
        (2, "a7", "a6"),
        (1, "g5", "g6"),
        (2, "a6", "a5"),
        (1, "g6", "h7"),
        (2, "a5", "a4"),
    ];
    for (connection, from, to) in line {
        h.rooms.submit_move("r1", connection, mv(from, to)).await.unwrap();
    }

    let promoted = h.rooms.submit_move("r1", 1, mv("h7", "g8")).await.unwrap();
    assert_eq!(promoted.notation, "hxg8=Q");
}

#[tokio::test]
async fn test_move_log_replays_to_position() {
    let h = harness();
    seated_room(&h).await;

    let line = [
        (1, "e2", "e4"),
        (2, "c7", "c5"),
        (1, "g1", "f3"),
        (2, "d7", "d6"),
        (1, "d2", "d4"),
        (2, "c5", "d4"),
        (1, "f3", "d4"),
        (2, "g8", "f6"),
        (1, "b1", "c3"),
        (2, "a7", "a6"),
    ];
    for (connection, from, to) in line {
        h.rooms.submit_move("r1", connection, mv(from, to)).await.unwrap();
    }

    let snapshot = h.rooms.get_room("r1").await.unwrap();
    assert_eq!(snapshot.move_log.len(), line.len());
    assert_eq!(ChessRules::new().replay(&snapshot.move_log).unwrap(), snapshot.position);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_moves_accept_exactly_one() {
    for round in 0..25 {
        let h = harness();
        seated_room(&h).await;

        let (first, second) = tokio::join!(
            {
                let rooms = h.rooms.clone();
                tokio::spawn(async move { rooms.submit_move("r1", 1, mv("e2", "e4")).await })
            },
            {
                let rooms = h.rooms.clone();
                tokio::spawn(async move { rooms.submit_move("r1", 1, mv("d2", "d4")).await })
            }
        );
        let results = [first.unwrap(), second.unwrap()];

        let accepted = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(accepted, 1, "round {round}: exactly one move may win");
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(RoomError::NotYourTurn) | Err(RoomError::IllegalMove(_)))));
        assert_eq!(h.rooms.get_room("r1").await.unwrap().move_log.len(), 1);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_joins_fill_each_seat_once() {
    let h = harness();
    h.rooms.create_room(Some("r1"), RoomOptions::default()).await.unwrap();

    let joins: Vec<_> = (1..=12)
        .map(|connection| {
            let rooms = h.rooms.clone();
            tokio::spawn(async move { rooms.join_room("r1", connection, None).await })
        })
        .collect();

    let mut roles = Vec::new();
    for join in joins {
        roles.push(join.await.unwrap().unwrap().role);
    }

    assert_eq!(roles.iter().filter(|r| **r == Role::FirstMover).count(), 1);
    assert_eq!(roles.iter().filter(|r| **r == Role::SecondMover).count(), 1);
    assert_eq!(roles.iter().filter(|r| **r == Role::Observer).count(), 10);
}

#[tokio::test]
async fn test_disconnect_vacates_only_its_own_seat() {
    let h = harness();
    seated_room(&h).await;
    h.rooms.join_room("r1", 3, None).await.unwrap();
    h.rooms.submit_move("r1", 1, mv("e2", "e4")).await.unwrap();
    h.sink.clear();

    h.rooms.handle_disconnect(2).await;

    let snapshot = h.rooms.get_room("r1").await.unwrap();
    assert!(snapshot.membership.seats.first_mover.is_some());
    assert!(snapshot.membership.seats.second_mover.is_none());
    assert_eq!(snapshot.membership.observer_count, 1);
    assert!(!snapshot.is_finished);
    assert_eq!(h.sink.event_names_for(1), vec!["membership_changed"]);
    assert!(h.sink.events_for(2).is_empty());

    // A second disconnect is a silent no-op
    h.sink.clear();
    h.rooms.handle_disconnect(2).await;
    assert_eq!(h.sink.len(), 0);

    // The seat is first-come-first-served
    assert_eq!(h.rooms.join_room("r1", 4, None).await.unwrap().role, Role::SecondMover);
}

#[tokio::test]
async fn test_disconnect_without_cache_entry_scans_the_store() {
    let h = harness();
    seated_room(&h).await;
    h.rooms.create_room(Some("r2"), RoomOptions::default()).await.unwrap();

    // Simulate a lost cache entry
    h.rooms.registry().remove(1);
    h.rooms.handle_disconnect(1).await;

    let snapshot = h.rooms.get_room("r1").await.unwrap();
    assert!(snapshot.membership.seats.first_mover.is_none());
    assert!(snapshot.membership.seats.second_mover.is_some());

    // Unknown connections are a no-op
    h.rooms.handle_disconnect(404).await;
}

#[tokio::test]
async fn test_rooms_survive_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    {
        let h = harness_with_store(Arc::new(FileRoomStore::open(dir.path()).await.unwrap()));
        seated_room(&h).await;
        h.rooms.submit_move("r1", 1, mv("e2", "e4")).await.unwrap();
        assert_eq!(h.store.backend_name(), "file");
    }

    let h = harness_with_store(Arc::new(FileRoomStore::open(dir.path()).await.unwrap()));
    let snapshot = h.rooms.get_room("r1").await.unwrap();
    assert_eq!(snapshot.move_log, vec!["e4"]);

    // Connection ids from the previous process are meaningless now
    assert_eq!(h.rooms.reset_membership().await.unwrap(), 1);
    assert_eq!(h.rooms.join_room("r1", 1, None).await.unwrap().role, Role::FirstMover);
    let reply = h.rooms.submit_move("r1", 1, mv("e7", "e5")).await;
    assert!(matches!(reply, Err(RoomError::NotYourTurn)));
}

#[tokio::test]
async fn test_stats_track_operations() {
    let h = harness();
    seated_room(&h).await;
    h.rooms.submit_move("r1", 1, mv("e2", "e4")).await.unwrap();
    let _ = h.rooms.submit_move("r1", 1, mv("e4", "e5")).await;
    h.rooms.handle_disconnect(1).await;

    let stats = h.rooms.stats();
    assert_eq!(stats.rooms_created, 1);
    assert_eq!(stats.joins, 2);
    assert_eq!(stats.moves_applied, 1);
    assert_eq!(stats.moves_rejected, 1);
    assert_eq!(stats.disconnects, 1);
    assert_eq!(stats.deliveries_dropped, 0);
}

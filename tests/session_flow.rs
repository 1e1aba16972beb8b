//! End-to-end session scenarios driven through `GameClient` with the
//! buffering transport standing in for the socket.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use coinroom_sync::{
    ClientConfig, GameClient, KeyValueStore, MemoryStore, OutboundFrame, OutboundQueue, Position,
    RoomPhase,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

type Client = GameClient<OutboundQueue, MemoryStore>;

fn new_client() -> Client {
    GameClient::new(ClientConfig::default(), OutboundQueue::new(), MemoryStore::new())
}

fn events(frames: &[OutboundFrame]) -> Vec<&'static str> {
    frames.iter().map(|f| f.event).collect()
}

fn connect_and_auth(client: &mut Client) {
    client.on_connected();
    client.handle_event("authenticated", json!({"status": "ok"}));
}

#[test]
fn create_room_then_auto_join_unlocks_reporting() {
    let mut client = new_client();
    connect_and_auth(&mut client);

    let t0 = Instant::now();
    client.create_room("testroom", "testpassword").unwrap();
    client.handle_event_at("room created", json!({"id": "R1"}), t0);
    assert_eq!(client.room().room_id(), Some("R1"));

    // Reporting stays locked while the join is pending
    assert!(!client.set_position(Position::new(9.0, 9.0, 9.0)));

    // Nothing before the delay
    client.poll(t0 + Duration::from_millis(999));
    assert_eq!(client.transport().frames_for("join room").count(), 0);

    client.poll(t0 + Duration::from_millis(1000));
    let frames = client.transport_mut().drain();
    assert_eq!(events(&frames), vec!["authenticate", "create room", "join room"]);
    assert_eq!(
        frames[2].data,
        json!({"roomId": "R1", "clientId": client.client_id()})
    );

    client.handle_event("joined room", json!({"roomId": "R1"}));
    assert_eq!(
        *client.room().phase(),
        RoomPhase::Joined {
            room_id: "R1".to_string()
        }
    );

    assert!(client.set_position(Position::new(1.0, 2.0, 3.0)));
    let frames = client.transport_mut().drain();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].event, "update position");
    assert_eq!(
        frames[0].data,
        json!({
            "clientId": client.client_id(),
            "position": {"x": 1.0, "y": 2.0, "z": 3.0}
        })
    );
}

#[test]
fn zero_vector_never_reported() {
    let mut client = new_client();
    assert!(!client.set_position(Position::ZERO));

    connect_and_auth(&mut client);
    client.join_room("R1").unwrap();
    client.handle_event("joined room", Value::Null);
    client.transport_mut().drain();

    assert!(!client.set_position(Position::ZERO));
    assert!(client.transport().is_empty());
}

#[test]
fn duplicate_coin_grab_is_noop() {
    let mut client = new_client();
    connect_and_auth(&mut client);

    client.handle_event(
        "coins generated",
        json!({"coins": [
            {"id": "a", "position": {"x": 1.0, "y": 0.0, "z": 1.0}, "ttl": 60, "isCollected": false},
            {"id": "b", "position": {"x": 2.0, "y": 0.0, "z": 2.0}, "ttl": 60, "isCollected": false}
        ]}),
    );

    client.handle_event("coin grabbed", json!("a"));
    let once = client.snapshot().coins;

    client.handle_event("coin grabbed", json!("a"));
    let twice = client.snapshot().coins;

    assert_eq!(once, twice);
    assert_eq!(twice.len(), 1);
    assert_eq!(twice[0].id, "b");

    // Unknown coin is also a no-op
    assert!(client.handle_event("coin grabbed", json!("zzz")));
    assert_eq!(client.snapshot().coins, twice);
}

#[test]
fn selective_position_merge() {
    let mut client = new_client();
    connect_and_auth(&mut client);

    for (id, x) in [("A", 1.0), ("B", 2.0), ("C", 3.0)] {
        client.handle_event(
            "player joined",
            json!({"id": id, "position": {"x": x, "y": 0.0, "z": 0.0}, "playerType": 0}),
        );
    }

    client.handle_event(
        "update positions",
        json!({
            "A": {"x": 10.0, "y": 1.0, "z": 1.0},
            "B": null,
            "C": {"x": 30.0, "y": 3.0, "z": 3.0},
            "D": {"x": 40.0, "y": 4.0, "z": 4.0}
        }),
    );

    let positions: HashMap<String, Position> = client
        .snapshot()
        .players
        .into_iter()
        .map(|p| (p.id, p.position))
        .collect();

    assert_eq!(positions.len(), 3);
    assert_eq!(positions["A"], Position::new(10.0, 1.0, 1.0));
    assert_eq!(positions["B"], Position::new(2.0, 0.0, 0.0));
    assert_eq!(positions["C"], Position::new(30.0, 3.0, 3.0));
    assert!(!positions.contains_key("D"));
}

#[test]
fn reconnect_installs_handlers_once() {
    let mut client = new_client();
    client.on_connected();
    client.on_connected();

    assert_eq!(client.dispatcher().installed_epoch(), Some(2));

    // A single delivery is applied exactly once
    let before = client.revision();
    assert!(client.handle_event("player joined", json!({"id": "p1"})));
    assert_eq!(client.revision(), before + 1);
    assert_eq!(client.snapshot().client_ids, vec!["p1".to_string()]);

    // Each connect re-authenticates
    assert_eq!(client.transport().frames_for("authenticate").count(), 2);
}

#[test]
fn duplicate_join_notifications_deduplicated() {
    let mut client = new_client();
    connect_and_auth(&mut client);

    client.handle_event("player joined", json!({"id": "p1"}));
    client.handle_event("new player", json!({"id": "p1"}));
    client.handle_event("player joined", json!({"id": "p1"}));

    let snapshot = client.snapshot();
    assert_eq!(snapshot.players.len(), 1);
    assert_eq!(snapshot.client_ids, vec!["p1".to_string()]);
}

#[test]
fn delayed_join_after_manual_join_is_reaffirmation() {
    let mut client = new_client();
    connect_and_auth(&mut client);

    let t0 = Instant::now();
    client.create_room_default().unwrap();
    client.handle_event_at("room created", json!({"id": "R1", "coinsAmount": 5}), t0);
    client.join_room("R1").unwrap();
    client.handle_event_at("joined room", json!({}), t0);
    client.set_position(Position::new(4.0, 0.0, 2.0));

    client.poll(t0 + Duration::from_secs(5));
    assert!(client.room().is_joined());
    let joins: Vec<&Value> = client
        .transport()
        .frames_for("join room")
        .map(|f| &f.data)
        .collect();
    assert_eq!(joins.len(), 2);
    assert_eq!(
        joins[1]["player"],
        json!({"x": 4.0, "y": 0.0, "z": 2.0, "id": client.client_id()})
    );
    assert_eq!(client.snapshot().room.map(|r| r.coins_amount), Some(5));
}

#[test]
fn identity_survives_restart() {
    let first = new_client();
    let id = first.client_id().to_string();
    assert!(first.identity_persisted());

    // Same durable scope
    let mut store = MemoryStore::new();
    store.set("clientId", &id).unwrap();
    let second = GameClient::new(ClientConfig::default(), OutboundQueue::new(), store);
    assert_eq!(second.client_id(), id);

    // Fresh scope
    let third = new_client();
    assert_ne!(third.client_id(), id);
}

#[test]
fn stale_events_after_disconnect_are_dropped() {
    let mut client = new_client();
    let epoch = client.on_connected();
    client.on_disconnected();

    assert!(!client.handle_epoch_event(epoch, "player joined", json!({"id": "ghost"})));
    assert!(!client.handle_event("player joined", json!({"id": "ghost"})));

    let next = client.on_connected();
    assert!(!client.handle_epoch_event(epoch, "player joined", json!({"id": "ghost"})));
    assert!(client.handle_epoch_event(next, "player joined", json!({"id": "real"})));
    assert_eq!(client.snapshot().client_ids, vec!["real".to_string()]);
}

//! CoinRoom Sync Library
//!
//! Client-side synchronization core for a realtime multiplayer coin game.
//!
//! # Overview
//!
//! The crate keeps a local, continuously reconciled view of one shared room
//! (players and collectible coins) by exchanging named events with the room
//! server:
//!
//! - **Identity** - a stable client id generated once per installation and
//!   kept in a durable key/value slot.
//!
//! - **Connection Session** - `Disconnected -> Connected -> Authenticated`,
//!   with a fresh handler table for every connection epoch.
//!
//! - **Room Controller** - `Idle -> Creating -> PendingJoin -> Joined`,
//!   including the delayed join that follows "room created".
//!
//! - **Entity Store** - players and coins keyed by id, updated only by
//!   inbound events.
//!
//! - **Position Reporter** - reports the local position once joined, never
//!   the all-zero sentinel.
//!
//! # Design Principles
//!
//! 1. **No networking** - the transport is a trait; the host owns the socket
//!    and feeds connect, disconnect and inbound frames in.
//!
//! 2. **Single-threaded** - every mutation runs on the caller's thread, in
//!    delivery order. The only timer (the post-create join) fires from
//!    `GameClient::poll`.
//!
//! 3. **Server is authoritative** - nothing is removed or added optimistically.
//!
//! # Example
//!
//! ```rust
//! use std::time::{Duration, Instant};
//!
//! use coinroom_sync::{ClientConfig, GameClient, MemoryStore, OutboundQueue, Position};
//! use serde_json::json;
//!
//! let mut client = GameClient::new(ClientConfig::default(), OutboundQueue::new(), MemoryStore::new());
//!
//! client.on_connected();
//! client.handle_event("authenticated", json!({}));
//!
//! let t0 = Instant::now();
//! client.create_room("testroom", "testpassword").unwrap();
//! client.handle_event_at("room created", json!({"id": "R1"}), t0);
//!
//! // The join goes out once the delay has passed
//! client.poll(t0 + Duration::from_secs(1));
//! client.handle_event("joined room", json!({}));
//!
//! assert!(client.set_position(Position::new(1.0, 2.0, 3.0)));
//!
//! let events: Vec<&str> = client.transport_mut().drain().iter().map(|f| f.event).collect();
//! assert_eq!(events, ["authenticate", "create room", "join room", "update position"]);
//! ```

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod state;
pub mod transport;

pub use client::{ClientSnapshot, GameClient};
pub use config::ClientConfig;
pub use dispatch::EventDispatcher;
pub use error::{ClientError, ProtocolError, StorageError, TransportError};
pub use protocol::{ClientMessage, ClientStatus, Coin, Player, Position, Room, ServerMessage};
pub use transport::{OutboundFrame, OutboundQueue, Transport};

// Re-export everything from state module at crate root
pub use state::*;

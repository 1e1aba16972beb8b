//! Client-side state components.
//!
//! - `identity` - stable per-installation client id over a key/value slot
//! - `connection` - handshake state machine and connection epochs
//! - `room` - room lifecycle (create, join) state machine
//! - `entities` - mirrored players and coins
//! - `position` - local position and when to report it
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                             GameClient                               │
//! │                                                                      │
//! │  ┌────────────────┐   client id   ┌───────────────────┐              │
//! │  │ IdentityStore  │──────────────▶│ ConnectionSession │── epoch ──┐  │
//! │  └────────────────┘               └───────────────────┘           │  │
//! │                                                                   ▼  │
//! │  ┌────────────────┐   inbound     ┌───────────────────┐   ┌─────────┐│
//! │  │  EntityStore   │◀──────────────│  EventDispatcher  │◀──│transport││
//! │  │ players, coins │               └─────────┬─────────┘   └─────────┘│
//! │  └────────────────┘                         │                   ▲    │
//! │                                             ▼                   │    │
//! │  ┌────────────────┐   joined      ┌───────────────────┐         │    │
//! │  │PositionReporter│◀──────────────│  RoomController   │─ join ──┘    │
//! │  └────────────────┘               └───────────────────┘              │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```

pub mod connection;
pub mod entities;
pub mod identity;
pub mod position;
pub mod room;

// Re-export commonly used types
pub use connection::{ConnectionSession, Epoch, InvalidTransition, SessionEvent, SessionState};
pub use entities::EntityStore;
pub use identity::{ClientIdentity, FileStore, IdentityStore, KeyValueStore, MemoryStore};
pub use position::{PositionReporter, ReportTarget};
pub use room::{RoomController, RoomEvent, RoomPhase, RoomTransitionError};

//! Room lifecycle state machine.
//!
//! # State Diagram
//!
//! ```text
//! ┌──────┐  create   ┌──────────┐  room created   ┌─────────────┐  joined room  ┌────────┐
//! │ Idle │──────────▶│ Creating │────────────────▶│ PendingJoin │──────────────▶│ Joined │
//! └──┬───┘           └──────────┘  (join queued)  └─────────────┘               └───┬────┘
//!    │                                                   ▲                          │
//!    └──────────────────────── join ─────────────────────┘          join (re-affirm)│
//!                                                                         ▲─────────┘
//! ```
//!
//! "room created" queues a join that fires after the configured delay. The
//! queued join is fire-and-forget: whatever the phase is when it fires, it
//! goes through the same idempotent `join` path as a manual request.

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::protocol::{ClientMessage, CreateRoomPayload, JoinPlayer, JoinRoomPayload, Room};

/// Room lifecycle phase.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RoomPhase {
    #[default]
    Idle,
    /// Create requested, waiting for "room created"
    Creating,
    /// Join requested (or queued), waiting for "joined room"
    PendingJoin { room_id: String },
    Joined { room_id: String },
}

impl RoomPhase {
    pub fn room_id(&self) -> Option<&str> {
        match self {
            Self::PendingJoin { room_id } | Self::Joined { room_id } => Some(room_id),
            _ => None,
        }
    }

    pub fn is_joined(&self) -> bool {
        matches!(self, Self::Joined { .. })
    }
}

impl fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Creating => write!(f, "Creating"),
            Self::PendingJoin { room_id } => write!(f, "PendingJoin({})", room_id),
            Self::Joined { room_id } => write!(f, "Joined({})", room_id),
        }
    }
}

/// Room transition events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    Create,
    RoomCreated { room_id: String },
    Join { room_id: String },
    JoinedRoom,
}

/// Error when a room transition is invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid room transition from {from} via {event:?}: {reason}")]
pub struct RoomTransitionError {
    pub from: RoomPhase,
    pub event: RoomEvent,
    pub reason: &'static str,
}

#[derive(Debug, Clone)]
struct ScheduledJoin {
    room_id: String,
    due_at: Instant,
}

/// Room controller.
#[derive(Debug, Clone)]
pub struct RoomController {
    phase: RoomPhase,

    /// Room record from "room created", or a bare id for direct joins
    room: Option<Room>,

    /// Join queued by "room created"
    scheduled: Option<ScheduledJoin>,

    join_delay: Duration,

    joined_at: Option<DateTime<Utc>>,
}

impl RoomController {
    pub fn new(join_delay: Duration) -> Self {
        Self {
            phase: RoomPhase::Idle,
            room: None,
            scheduled: None,
            join_delay,
            joined_at: None,
        }
    }

    pub fn phase(&self) -> &RoomPhase {
        &self.phase
    }

    pub fn room(&self) -> Option<&Room> {
        self.room.as_ref()
    }

    pub fn room_id(&self) -> Option<&str> {
        self.phase.room_id()
    }

    pub fn is_joined(&self) -> bool {
        self.phase.is_joined()
    }

    pub fn joined_at(&self) -> Option<DateTime<Utc>> {
        self.joined_at
    }

    /// When the queued join fires, if one is queued.
    pub fn scheduled_join_at(&self) -> Option<Instant> {
        self.scheduled.as_ref().map(|s| s.due_at)
    }

    /// Request a new room. Only valid from `Idle`.
    pub fn create(
        &mut self,
        name: &str,
        password: &str,
    ) -> Result<ClientMessage, RoomTransitionError> {
        self.phase = self.transition(&RoomEvent::Create)?;
        info!("Creating room {:?}", name);
        Ok(ClientMessage::CreateRoom(CreateRoomPayload {
            name: name.to_string(),
            password: password.to_string(),
        }))
    }

    /// Server confirmed the room. Queues the join for `now + join_delay`.
    pub fn on_room_created(&mut self, room: Room, now: Instant) -> Result<(), RoomTransitionError> {
        let event = RoomEvent::RoomCreated {
            room_id: room.id.clone(),
        };
        self.phase = self.transition(&event)?;

        info!("Room {} created, joining in {:?}", room.id, self.join_delay);
        self.scheduled = Some(ScheduledJoin {
            room_id: room.id.clone(),
            due_at: now + self.join_delay,
        });
        self.room = Some(room);
        Ok(())
    }

    /// Request to join `room_id`. Valid from `Idle` and `PendingJoin`; from
    /// `Joined` on the same room it re-sends the join without changing phase.
    pub fn join(
        &mut self,
        room_id: &str,
        client_id: &str,
        player: Option<JoinPlayer>,
    ) -> Result<ClientMessage, RoomTransitionError> {
        let event = RoomEvent::Join {
            room_id: room_id.to_string(),
        };
        let next = self.transition(&event)?;

        if self.phase.is_joined() {
            debug!("Re-affirming join of room {}", room_id);
        } else {
            info!("Joining room {}", room_id);
        }
        if self.room.as_ref().map(|r| r.id.as_str()) != Some(room_id) {
            self.room = Some(Room::with_id(room_id));
        }
        self.phase = next;

        Ok(ClientMessage::JoinRoom(JoinRoomPayload {
            room_id: room_id.to_string(),
            client_id: client_id.to_string(),
            player,
        }))
    }

    /// Fire the queued join if it is due.
    ///
    /// The first join after creation goes out bare. If the room was already
    /// joined by hand, the join is a re-affirmation and carries `player`.
    pub fn poll_scheduled(
        &mut self,
        now: Instant,
        client_id: &str,
        player: JoinPlayer,
    ) -> Option<ClientMessage> {
        let due = self.scheduled.as_ref().is_some_and(|s| s.due_at <= now);
        if !due {
            return None;
        }
        let scheduled = self.scheduled.take()?;
        let player = self.phase.is_joined().then_some(player);

        match self.join(&scheduled.room_id, client_id, player) {
            Ok(message) => Some(message),
            Err(e) => {
                debug!("Dropping queued join: {}", e);
                None
            }
        }
    }

    /// Server confirmed the join. Repeated confirmations are accepted.
    pub fn on_joined(&mut self) -> Result<(), RoomTransitionError> {
        let was_joined = self.phase.is_joined();
        self.phase = self.transition(&RoomEvent::JoinedRoom)?;
        if !was_joined {
            self.joined_at = Some(Utc::now());
            info!("Joined room {}", self.room_id().unwrap_or_default());
        }
        Ok(())
    }

    fn transition(&self, event: &RoomEvent) -> Result<RoomPhase, RoomTransitionError> {
        use RoomEvent::*;
        use RoomPhase::*;

        let invalid = |reason: &'static str| RoomTransitionError {
            from: self.phase.clone(),
            event: event.clone(),
            reason,
        };

        match (&self.phase, event) {
            (Idle, Create) => Ok(Creating),
            (Creating, Create) => Err(invalid("Room creation already in progress")),
            (_, Create) => Err(invalid("Already in a room")),

            (_, RoomCreated { room_id }) if room_id.is_empty() => Err(invalid("Room id is empty")),
            (Creating, RoomCreated { room_id }) => Ok(PendingJoin {
                room_id: room_id.clone(),
            }),
            (_, RoomCreated { .. }) => Err(invalid("No room creation in progress")),

            (_, Join { room_id }) if room_id.is_empty() => Err(invalid("Room id is empty")),
            (Idle | PendingJoin { .. }, Join { room_id }) => Ok(PendingJoin {
                room_id: room_id.clone(),
            }),
            (Joined { room_id: current }, Join { room_id }) if current == room_id => Ok(Joined {
                room_id: room_id.clone(),
            }),
            (Joined { .. }, Join { .. }) => Err(invalid("Already joined another room")),
            (Creating, Join { .. }) => Err(invalid("Room creation in progress")),

            (PendingJoin { room_id } | Joined { room_id }, JoinedRoom) => Ok(Joined {
                room_id: room_id.clone(),
            }),
            (_, JoinedRoom) => Err(invalid("No join in progress")),
        }
    }
}

impl Default for RoomController {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_JOIN_DELAY)
    }
}

//! Connection session state machine.
//!
//! Tracks the handshake over the external transport. Every transport-level
//! connect opens a new epoch; inbound handlers are scoped to it.
//!
//! # State Diagram
//!
//! ```text
//! ┌──────────────┐   connect    ┌──────────────┐  authenticated  ┌───────────────┐
//! │ Disconnected │─────────────▶│  Connected   │────────────────▶│ Authenticated │
//! └──────────────┘              └──────────────┘                 └───────────────┘
//!        ▲                        │    ▲   │ connect (new epoch)         │
//!        │       disconnect       │    └───┘                             │
//!        └────────────────────────┴──────────────────────────────────────┘
//! ```
//!
//! There is no failure path: without an acknowledgement the session simply
//! stays `Connected`.

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::debug;

/// Connection epoch number. The first connection is epoch 1.
pub type Epoch = u64;

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connected { epoch: Epoch },
    Authenticated { epoch: Epoch },
}

impl SessionState {
    pub fn is_connected(&self) -> bool {
        !matches!(self, Self::Disconnected)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    /// Current epoch, if connected.
    pub fn epoch(&self) -> Option<Epoch> {
        match self {
            Self::Connected { epoch } | Self::Authenticated { epoch } => Some(*epoch),
            Self::Disconnected => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connected { .. } => "connected",
            Self::Authenticated { .. } => "authenticated",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connected { epoch } => write!(f, "Connected(epoch {})", epoch),
            Self::Authenticated { epoch } => write!(f, "Authenticated(epoch {})", epoch),
        }
    }
}

/// Session transition events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Connect,
    Disconnect,
    /// Authentication acknowledged by the server
    AuthAck,
}

/// Error when a session transition is invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid transition from {from} via {event:?}: {reason}")]
pub struct InvalidTransition {
    pub from: SessionState,
    pub event: SessionEvent,
    pub reason: &'static str,
}

/// Connection session.
#[derive(Debug, Clone, Default)]
pub struct ConnectionSession {
    state: SessionState,

    /// Last epoch handed out
    last_epoch: Epoch,

    /// When the current epoch began
    connected_at: Option<DateTime<Utc>>,

    /// When the current epoch was acknowledged
    authenticated_at: Option<DateTime<Utc>>,

    /// Opaque acknowledgement payload of the current epoch
    ack: Option<serde_json::Value>,
}

impl ConnectionSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Transport connected (or reconnected). Always opens a new epoch.
    pub fn connect(&mut self) -> Epoch {
        if let Err(e) = self.apply_mut(SessionEvent::Connect) {
            debug!("{}", e);
        }
        self.last_epoch
    }

    /// Transport dropped.
    pub fn disconnect(&mut self) -> Result<(), InvalidTransition> {
        self.apply_mut(SessionEvent::Disconnect)?;
        self.connected_at = None;
        self.authenticated_at = None;
        self.ack = None;
        Ok(())
    }

    /// Server acknowledged authentication.
    pub fn authenticate(&mut self, ack: serde_json::Value) -> Result<(), InvalidTransition> {
        self.apply_mut(SessionEvent::AuthAck)?;
        self.authenticated_at = Some(Utc::now());
        self.ack = Some(ack);
        Ok(())
    }

    /// Apply an event in place, returning error if invalid.
    pub fn apply_mut(&mut self, event: SessionEvent) -> Result<(), InvalidTransition> {
        let next = self.transition(event)?;
        if let (SessionEvent::Connect, Some(epoch)) = (event, next.epoch()) {
            self.last_epoch = epoch;
            self.connected_at = Some(Utc::now());
            self.authenticated_at = None;
            self.ack = None;
        }
        self.state = next;
        Ok(())
    }

    fn transition(&self, event: SessionEvent) -> Result<SessionState, InvalidTransition> {
        use SessionEvent::*;

        let invalid = |reason: &'static str| InvalidTransition {
            from: self.state,
            event,
            reason,
        };

        match (self.state, event) {
            (_, Connect) => Ok(SessionState::Connected {
                epoch: self.last_epoch + 1,
            }),

            (SessionState::Disconnected, Disconnect) => Err(invalid("Already disconnected")),
            (_, Disconnect) => Ok(SessionState::Disconnected),

            (SessionState::Connected { epoch }, AuthAck) => {
                Ok(SessionState::Authenticated { epoch })
            }
            (SessionState::Authenticated { .. }, AuthAck) => Err(invalid("Already authenticated")),
            (SessionState::Disconnected, AuthAck) => Err(invalid("Not connected")),
        }
    }

    pub fn epoch(&self) -> Option<Epoch> {
        self.state.epoch()
    }

    /// Number of epochs opened so far.
    pub fn epochs_opened(&self) -> u64 {
        self.last_epoch
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    pub fn connected_at(&self) -> Option<DateTime<Utc>> {
        self.connected_at
    }

    pub fn authenticated_at(&self) -> Option<DateTime<Utc>> {
        self.authenticated_at
    }

    pub fn ack(&self) -> Option<&serde_json::Value> {
        self.ack.as_ref()
    }
}

//! Error types.

use crate::state::room::RoomTransitionError;

/// Durable key/value backend failure.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Outbound emit failure.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport closed")]
    Closed,

    #[error("failed to encode {event}: {source}")]
    Encode {
        event: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Inbound frame could not be turned into a message.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    #[error("malformed {event} payload: {source}")]
    Malformed {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors returned by client actions.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Room(#[from] RoomTransitionError),

    #[error("no room to act in")]
    NotInRoom,

    #[error("coin id is empty")]
    EmptyCoinId,
}

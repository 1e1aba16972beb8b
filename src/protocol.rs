//! Wire protocol.
//!
//! Named events exchanged with the room server. Every frame is an event name
//! plus a JSON payload; field names on the wire are camelCase.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::ProtocolError;

/// Event names, exactly as they appear on the wire.
pub mod events {
    // Client -> server
    pub const AUTHENTICATE: &str = "authenticate";
    pub const CREATE_ROOM: &str = "create room";
    pub const JOIN_ROOM: &str = "join room";
    pub const UPDATE_POSITION: &str = "update position";
    pub const GRAB_COIN: &str = "grab coin";

    // Server -> client
    pub const AUTHENTICATED: &str = "authenticated";
    pub const ROOM_CREATED: &str = "room created";
    pub const JOINED_ROOM: &str = "joined room";
    pub const PLAYER_JOINED: &str = "player joined";
    pub const NEW_PLAYER: &str = "new player";
    pub const PLAYER_LEFT: &str = "player left";
    pub const UPDATE_POSITIONS: &str = "update positions";
    pub const COINS_GENERATED: &str = "coins generated";
    pub const COIN_GRABBED: &str = "coin grabbed";
}

// =============================================================================
// SHARED TYPES
// =============================================================================

/// A point in room space.
///
/// `(0, 0, 0)` is the "not yet reported" sentinel and is never sent as a real
/// position update.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    /// The unset sentinel.
    pub const ZERO: Position = Position {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// True for the all-zero sentinel.
    pub fn is_unset(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Room dimensions share the vector shape.
pub type Scale = Position;

/// A participant in the room, including the local client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub player_type: i32,
}

impl Player {
    pub fn new(id: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            position,
            player_type: 0,
        }
    }
}

/// A collectible coin.
///
/// The client never flips `is_collected` itself; grabbed coins are removed
/// when the server confirms the grab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coin {
    pub id: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub ttl: i64,
    #[serde(default)]
    pub is_collected: bool,
}

impl Coin {
    pub fn new(id: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            position,
            ttl: 0,
            is_collected: false,
        }
    }
}

/// Server-side room record, as announced in "room created".
///
/// Only `id` is guaranteed; every other field defaults when absent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    #[serde(default)]
    pub coins_amount: u32,
    #[serde(default)]
    pub scale: Scale,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clients: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coins: Option<Vec<Coin>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl Room {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// Status of a participant as the server tracks it. Numeric on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ClientStatus {
    #[default]
    Pending = 0,
    InGame = 1,
}

impl Serialize for ClientStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for ClientStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(Self::Pending),
            1 => Ok(Self::InGame),
            other => Err(serde::de::Error::custom(format!(
                "unknown client status {}",
                other
            ))),
        }
    }
}

// =============================================================================
// CLIENT -> SERVER
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatePayload {
    pub client_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateRoomPayload {
    pub name: String,
    pub password: String,
}

/// Local player snapshot attached to a manual join: `{ x, y, z, id }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinPlayer {
    #[serde(flatten)]
    pub position: Position,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomPayload {
    pub room_id: String,
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player: Option<JoinPlayer>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePositionPayload {
    pub client_id: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrabCoinPayload {
    pub coin_id: String,
    pub client_id: String,
    pub room_id: String,
}

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Authenticate(AuthenticatePayload),
    CreateRoom(CreateRoomPayload),
    JoinRoom(JoinRoomPayload),
    UpdatePosition(UpdatePositionPayload),
    GrabCoin(GrabCoinPayload),
}

impl ClientMessage {
    /// Wire event name.
    pub fn event(&self) -> &'static str {
        match self {
            Self::Authenticate(_) => events::AUTHENTICATE,
            Self::CreateRoom(_) => events::CREATE_ROOM,
            Self::JoinRoom(_) => events::JOIN_ROOM,
            Self::UpdatePosition(_) => events::UPDATE_POSITION,
            Self::GrabCoin(_) => events::GRAB_COIN,
        }
    }

    /// JSON payload.
    pub fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Authenticate(p) => serde_json::to_value(p),
            Self::CreateRoom(p) => serde_json::to_value(p),
            Self::JoinRoom(p) => serde_json::to_value(p),
            Self::UpdatePosition(p) => serde_json::to_value(p),
            Self::GrabCoin(p) => serde_json::to_value(p),
        }
    }
}

// =============================================================================
// SERVER -> CLIENT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CoinsGeneratedPayload {
    pub coins: Vec<Coin>,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Authentication acknowledged. Payload is opaque.
    Authenticated(Value),
    RoomCreated(Room),
    /// Join acknowledged. Payload is opaque.
    JoinedRoom(Value),
    PlayerJoined(Player),
    NewPlayer(Player),
    PlayerLeft(String),
    UpdatePositions(HashMap<String, Position>),
    CoinsGenerated(Vec<Coin>),
    CoinGrabbed(String),
}

/// Decodes one inbound payload.
pub type Decoder = fn(Value) -> Result<ServerMessage, serde_json::Error>;

impl ServerMessage {
    /// Every inbound event name paired with its decoder.
    pub const ROUTES: [(&'static str, Decoder); 9] = [
        (events::AUTHENTICATED, decode_authenticated),
        (events::ROOM_CREATED, decode_room_created),
        (events::JOINED_ROOM, decode_joined_room),
        (events::PLAYER_JOINED, decode_player_joined),
        (events::NEW_PLAYER, decode_new_player),
        (events::PLAYER_LEFT, decode_player_left),
        (events::UPDATE_POSITIONS, decode_update_positions),
        (events::COINS_GENERATED, decode_coins_generated),
        (events::COIN_GRABBED, decode_coin_grabbed),
    ];

    /// Decode an inbound frame by event name.
    pub fn decode(event: &str, payload: Value) -> Result<Self, ProtocolError> {
        let (_, decoder) = Self::ROUTES
            .iter()
            .find(|(name, _)| *name == event)
            .ok_or_else(|| ProtocolError::UnknownEvent(event.to_string()))?;
        decoder(payload).map_err(|source| ProtocolError::Malformed {
            event: event.to_string(),
            source,
        })
    }

    /// Wire event name.
    pub fn event(&self) -> &'static str {
        match self {
            Self::Authenticated(_) => events::AUTHENTICATED,
            Self::RoomCreated(_) => events::ROOM_CREATED,
            Self::JoinedRoom(_) => events::JOINED_ROOM,
            Self::PlayerJoined(_) => events::PLAYER_JOINED,
            Self::NewPlayer(_) => events::NEW_PLAYER,
            Self::PlayerLeft(_) => events::PLAYER_LEFT,
            Self::UpdatePositions(_) => events::UPDATE_POSITIONS,
            Self::CoinsGenerated(_) => events::COINS_GENERATED,
            Self::CoinGrabbed(_) => events::COIN_GRABBED,
        }
    }
}

fn decode_authenticated(v: Value) -> Result<ServerMessage, serde_json::Error> {
    Ok(ServerMessage::Authenticated(v))
}

fn decode_room_created(v: Value) -> Result<ServerMessage, serde_json::Error> {
    serde_json::from_value(v).map(ServerMessage::RoomCreated)
}

fn decode_joined_room(v: Value) -> Result<ServerMessage, serde_json::Error> {
    Ok(ServerMessage::JoinedRoom(v))
}

fn decode_player_joined(v: Value) -> Result<ServerMessage, serde_json::Error> {
    serde_json::from_value(v).map(ServerMessage::PlayerJoined)
}

fn decode_new_player(v: Value) -> Result<ServerMessage, serde_json::Error> {
    serde_json::from_value(v).map(ServerMessage::NewPlayer)
}

fn decode_player_left(v: Value) -> Result<ServerMessage, serde_json::Error> {
    serde_json::from_value(v).map(ServerMessage::PlayerLeft)
}

/// Entries that are null or not a full position are skipped one by one; the
/// rest of the frame still applies.
fn decode_update_positions(v: Value) -> Result<ServerMessage, serde_json::Error> {
    let raw: HashMap<String, Value> = serde_json::from_value(v)?;
    let positions = raw
        .into_iter()
        .filter_map(|(id, entry)| match serde_json::from_value::<Position>(entry) {
            Ok(position) => Some((id, position)),
            Err(e) => {
                debug!("Skipping position for {}: {}", id, e);
                None
            }
        })
        .collect();
    Ok(ServerMessage::UpdatePositions(positions))
}

fn decode_coins_generated(v: Value) -> Result<ServerMessage, serde_json::Error> {
    serde_json::from_value::<CoinsGeneratedPayload>(v)
        .map(|p| ServerMessage::CoinsGenerated(p.coins))
}

fn decode_coin_grabbed(v: Value) -> Result<ServerMessage, serde_json::Error> {
    serde_json::from_value(v).map(ServerMessage::CoinGrabbed)
}

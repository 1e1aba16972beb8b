//! Client composition root.
//!
//! `GameClient` owns every state component plus the injected transport. The
//! host drives it from three directions:
//!
//! - transport notifications: `on_connected`, `on_disconnected`, `handle_event`
//! - user actions: `create_room`, `join_room`, `set_position`, `grab_coin`
//! - time: `poll`, which fires the delayed join after "room created"
//!
//! Everything runs on the caller's thread; no method blocks or spawns.
//! The presentation layer reads state through `snapshot()` only.

use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::dispatch::EventDispatcher;
use crate::error::ClientError;
use crate::protocol::{
    AuthenticatePayload, ClientMessage, ClientStatus, Coin, GrabCoinPayload, Player, Position,
    Room, ServerMessage,
};
use crate::state::connection::{ConnectionSession, Epoch};
use crate::state::entities::EntityStore;
use crate::state::identity::{ClientIdentity, IdentityStore, KeyValueStore};
use crate::state::position::{PositionReporter, ReportTarget};
use crate::state::room::RoomController;
use crate::transport::Transport;

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSnapshot {
    /// Bumped after every core mutation
    pub revision: u64,
    pub client_id: String,
    pub connection: &'static str,
    pub joined: bool,
    pub status: ClientStatus,
    pub room_id: Option<String>,
    /// Room record, with `clients` mirrored from the player list
    pub room: Option<Room>,
    pub client_ids: Vec<String>,
    pub players: Vec<Player>,
    pub coins: Vec<Coin>,
    pub position: Position,
}

impl ClientSnapshot {
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// The synchronization core.
#[derive(Debug)]
pub struct GameClient<T, S> {
    config: ClientConfig,
    transport: T,
    identity: IdentityStore<S>,
    client_id: String,
    session: ConnectionSession,
    dispatcher: EventDispatcher,
    room: RoomController,
    entities: EntityStore,
    reporter: PositionReporter,
    revision: u64,
}

impl<T: Transport, S: KeyValueStore> GameClient<T, S> {
    /// Build a client. The identity is established here, before any
    /// connection can be reported.
    pub fn new(config: ClientConfig, transport: T, store: S) -> Self {
        let mut identity = IdentityStore::new(store, config.identity_key.clone());
        let client_id = identity.get_or_create().id;
        let room = RoomController::new(config.join_delay);

        Self {
            config,
            transport,
            identity,
            client_id,
            session: ConnectionSession::new(),
            dispatcher: EventDispatcher::new(),
            room,
            entities: EntityStore::new(),
            reporter: PositionReporter::new(),
            revision: 0,
        }
    }

    // =========================================================================
    // Transport notifications
    // =========================================================================

    /// Transport (re)connected: tear down the previous epoch's handlers,
    /// install a fresh table, and authenticate.
    pub fn on_connected(&mut self) -> Epoch {
        self.dispatcher.uninstall();
        let epoch = self.session.connect();
        self.dispatcher.install(epoch);

        info!(
            "Connected to {} (epoch {}), authenticating as {}",
            self.config.server_url, epoch, self.client_id
        );
        self.emit(ClientMessage::Authenticate(AuthenticatePayload {
            client_id: self.client_id.clone(),
        }));
        self.touch();
        epoch
    }

    /// Transport dropped. Handlers for the current epoch go away immediately.
    pub fn on_disconnected(&mut self) {
        self.dispatcher.uninstall();
        match self.session.disconnect() {
            Ok(()) => info!("Disconnected from {}", self.config.server_url),
            Err(e) => debug!("{}", e),
        }
        self.touch();
    }

    /// Inbound frame on the current epoch. Returns whether it was applied.
    pub fn handle_event(&mut self, event: &str, payload: Value) -> bool {
        self.handle_event_at(event, payload, Instant::now())
    }

    /// Same as `handle_event`, with the receive time supplied by the host.
    /// Use the clock that drives `poll` so the delayed join stays on it.
    pub fn handle_event_at(&mut self, event: &str, payload: Value, now: Instant) -> bool {
        match self.session.epoch() {
            Some(epoch) => self.handle_epoch_event_at(epoch, event, payload, now),
            None => {
                debug!("Dropping {:?} while disconnected", event);
                false
            }
        }
    }

    /// Inbound frame tagged with the epoch it arrived on. Frames from any
    /// epoch but the current one are dropped.
    pub fn handle_epoch_event(&mut self, epoch: Epoch, event: &str, payload: Value) -> bool {
        self.handle_epoch_event_at(epoch, event, payload, Instant::now())
    }

    pub fn handle_epoch_event_at(
        &mut self,
        epoch: Epoch,
        event: &str,
        payload: Value,
        now: Instant,
    ) -> bool {
        match self.dispatcher.dispatch(epoch, event, payload) {
            Ok(Some(message)) => {
                self.apply(message, now);
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!("Ignoring inbound frame: {}", e);
                false
            }
        }
    }

    /// Fire the delayed join if it is due.
    pub fn poll(&mut self, now: Instant) {
        let player = self.reporter.join_snapshot(&self.client_id);
        if let Some(message) = self.room.poll_scheduled(now, &self.client_id, player) {
            self.emit(message);
            self.touch();
        }
    }

    fn apply(&mut self, message: ServerMessage, now: Instant) {
        match message {
            ServerMessage::Authenticated(ack) => {
                debug!("Received authenticated event with data: {}", ack);
                if let Err(e) = self.session.authenticate(ack) {
                    debug!("{}", e);
                }
            }
            ServerMessage::RoomCreated(room) => {
                if let Err(e) = self.room.on_room_created(room, now) {
                    warn!("{}", e);
                }
            }
            ServerMessage::JoinedRoom(ack) => {
                debug!("Joined room with data: {}", ack);
                if let Err(e) = self.room.on_joined() {
                    warn!("{}", e);
                }
            }
            ServerMessage::PlayerJoined(player) | ServerMessage::NewPlayer(player) => {
                self.entities.on_player_joined(player);
            }
            ServerMessage::PlayerLeft(player_id) => {
                self.entities.on_player_left(&player_id);
            }
            ServerMessage::UpdatePositions(positions) => {
                self.entities.on_positions_updated(&positions);
            }
            ServerMessage::CoinsGenerated(coins) => {
                debug!("{} coins generated", coins.len());
                self.entities.on_coins_generated(coins);
            }
            ServerMessage::CoinGrabbed(coin_id) => {
                self.entities.on_coin_grabbed(&coin_id);
            }
        }
        self.touch();
    }

    // =========================================================================
    // User actions
    // =========================================================================

    /// Ask the server for a new room.
    pub fn create_room(&mut self, name: &str, password: &str) -> Result<(), ClientError> {
        let message = self.room.create(name, password)?;
        self.emit(message);
        self.touch();
        Ok(())
    }

    /// Create a room with the configured name and password.
    pub fn create_room_default(&mut self) -> Result<(), ClientError> {
        let name = self.config.room_name.clone();
        let password = self.config.room_password.clone();
        self.create_room(&name, &password)
    }

    /// Join `room_id`, attaching the local player's current position.
    pub fn join_room(&mut self, room_id: &str) -> Result<(), ClientError> {
        let player = self.reporter.join_snapshot(&self.client_id);
        let message = self.room.join(room_id, &self.client_id, Some(player))?;
        self.emit(message);
        self.touch();
        Ok(())
    }

    /// Move the local player. Returns whether an update went out.
    pub fn set_position(&mut self, position: Position) -> bool {
        let target = if self.session.is_authenticated() && self.room.is_joined() {
            Some(ReportTarget::new(&self.client_id))
        } else {
            None
        };
        let message = self.reporter.set_position(position, target);
        self.touch();

        match message {
            Some(message) => {
                self.emit(message);
                true
            }
            None => false,
        }
    }

    /// Ask the server to grab a coin. The coin stays until the server
    /// confirms with "coin grabbed".
    pub fn grab_coin(&mut self, coin_id: &str) -> Result<(), ClientError> {
        let coin_id = coin_id.trim();
        if coin_id.is_empty() {
            return Err(ClientError::EmptyCoinId);
        }
        let room_id = self.room.room_id().ok_or(ClientError::NotInRoom)?;

        let message = ClientMessage::GrabCoin(GrabCoinPayload {
            coin_id: coin_id.to_string(),
            client_id: self.client_id.clone(),
            room_id: room_id.to_string(),
        });
        self.emit(message);
        Ok(())
    }

    fn emit(&mut self, message: ClientMessage) {
        if let Err(e) = self.transport.emit(&message) {
            warn!("Failed to send {:?}: {}", message.event(), e);
        }
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    // =========================================================================
    // Read surface
    // =========================================================================

    pub fn snapshot(&self) -> ClientSnapshot {
        let client_ids = self.entities.player_ids().to_vec();
        let room = self.room.room().map(|room| Room {
            clients: Some(client_ids.clone()),
            ..room.clone()
        });
        let joined = self.room.is_joined();

        ClientSnapshot {
            revision: self.revision,
            client_id: self.client_id.clone(),
            connection: self.session.state().as_str(),
            joined,
            status: if joined {
                ClientStatus::InGame
            } else {
                ClientStatus::Pending
            },
            room_id: self.room.room_id().map(str::to_string),
            room,
            client_ids,
            players: self.entities.players().cloned().collect(),
            coins: self.entities.coins().cloned().collect(),
            position: self.reporter.position(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn identity(&self) -> ClientIdentity {
        ClientIdentity {
            id: self.client_id.clone(),
        }
    }

    /// Whether the identity made it into durable storage.
    pub fn identity_persisted(&self) -> bool {
        self.identity.is_persisted()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &ConnectionSession {
        &self.session
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    pub fn room(&self) -> &RoomController {
        &self.room
    }

    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    pub fn position(&self) -> Position {
        self.reporter.position()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

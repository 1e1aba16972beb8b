//! Epoch-scoped inbound event table.
//!
//! The table maps each inbound event name to exactly one decoder. It is
//! rebuilt as a unit whenever a connection epoch starts and cleared when the
//! transport drops, so a handler can never be registered twice and frames
//! belonging to an earlier epoch are never decoded.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::error::ProtocolError;
use crate::protocol::{Decoder, ServerMessage};
use crate::state::connection::Epoch;

#[derive(Debug, Default)]
pub struct EventDispatcher {
    epoch: Option<Epoch>,
    table: HashMap<&'static str, Decoder>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tear down whatever is installed, then install the full table for
    /// `epoch`.
    pub fn install(&mut self, epoch: Epoch) {
        self.uninstall();
        self.table = ServerMessage::ROUTES.iter().copied().collect();
        self.epoch = Some(epoch);
        debug!("Installed {} handlers for epoch {}", self.table.len(), epoch);
    }

    /// Remove every handler. Returns the epoch they belonged to.
    pub fn uninstall(&mut self) -> Option<Epoch> {
        let epoch = self.epoch.take()?;
        self.table.clear();
        debug!("Uninstalled handlers for epoch {}", epoch);
        Some(epoch)
    }

    pub fn installed_epoch(&self) -> Option<Epoch> {
        self.epoch
    }

    /// Number of installed handlers.
    pub fn handler_count(&self) -> usize {
        self.table.len()
    }

    pub fn handles(&self, event: &str) -> bool {
        self.table.contains_key(event)
    }

    /// Decode a frame received during `epoch`.
    ///
    /// Returns `Ok(None)` when nothing is installed for that epoch.
    pub fn dispatch(
        &self,
        epoch: Epoch,
        event: &str,
        payload: Value,
    ) -> Result<Option<ServerMessage>, ProtocolError> {
        if self.epoch != Some(epoch) {
            debug!(
                "Dropping {:?} from epoch {} (installed: {:?})",
                event, epoch, self.epoch
            );
            return Ok(None);
        }

        let decoder = self
            .table
            .get(event)
            .ok_or_else(|| ProtocolError::UnknownEvent(event.to_string()))?;

        decoder(payload)
            .map(Some)
            .map_err(|source| ProtocolError::Malformed {
                event: event.to_string(),
                source,
            })
    }
}

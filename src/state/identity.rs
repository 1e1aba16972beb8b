//! Client identity persistence.
//!
//! One stable id per installation, kept in a durable key/value slot. The id is
//! generated once (a random v4 UUID), then read back on every later start.
//! Storage failures never surface: an unreadable slot counts as empty, and an
//! unwritable slot leaves the fresh id unpersisted for this session.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::StorageError;

/// Durable string key/value slots.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-process store. Durable only for the lifetime of the value.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.slots.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.slots.remove(key);
        Ok(())
    }
}

/// File-backed store: all slots in one JSON object.
///
/// A missing file reads as empty. Every write rewrites the whole file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, slots: &HashMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(slots)?)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        // A corrupt file is replaced rather than blocking the write.
        let mut slots = self.load().unwrap_or_default();
        slots.insert(key.to_string(), value.to_string());
        self.save(&slots)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let mut slots = self.load()?;
        if slots.remove(key).is_some() {
            self.save(&slots)?;
        }
        Ok(())
    }
}

/// The local client's identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientIdentity {
    pub id: String,
}

impl ClientIdentity {
    /// Fresh random identity.
    pub fn generate() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
        }
    }
}

/// Owns the identity slot.
#[derive(Debug)]
pub struct IdentityStore<S> {
    store: S,
    key: String,
    current: Option<ClientIdentity>,
    persisted: bool,
}

impl<S: KeyValueStore> IdentityStore<S> {
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            current: None,
            persisted: false,
        }
    }

    /// Return the persisted identity, creating and persisting one on first use.
    pub fn get_or_create(&mut self) -> ClientIdentity {
        if let Some(identity) = &self.current {
            return identity.clone();
        }

        let stored = match self.store.get(&self.key) {
            Ok(value) => value.filter(|id| !id.trim().is_empty()),
            Err(e) => {
                warn!("Identity slot {:?} unreadable, treating as empty: {}", self.key, e);
                None
            }
        };

        let identity = match stored {
            Some(id) => {
                info!("Client ID recovered from storage: {}", id);
                self.persisted = true;
                ClientIdentity { id }
            }
            None => {
                let identity = ClientIdentity::generate();
                info!("Generated client ID: {}", identity.id);
                match self.store.set(&self.key, &identity.id) {
                    Ok(()) => self.persisted = true,
                    Err(e) => {
                        warn!("Failed to persist client ID, using it for this session only: {}", e);
                        self.persisted = false;
                    }
                }
                identity
            }
        };

        self.current = Some(identity.clone());
        identity
    }

    /// Identity established so far, if any.
    pub fn current(&self) -> Option<&ClientIdentity> {
        self.current.as_ref()
    }

    /// Whether the current identity made it into durable storage.
    pub fn is_persisted(&self) -> bool {
        self.current.is_some() && self.persisted
    }

    /// Forget the identity, locally and in storage. The next
    /// `get_or_create` generates a new one.
    pub fn reset(&mut self) -> Result<(), StorageError> {
        self.current = None;
        self.persisted = false;
        self.store.remove(&self.key)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

//! Persistent key-value store at ~/.movaa/store.json.
//!
//! Values are JSON strings keyed by logical name, same layout the web
//! front-end keeps in local storage. The store may be unavailable at any
//! time; [`Storage`] logs those failures and carries on so the booking
//! flow keeps working from memory.
//!
//! Last location/park entries expire after 30 days.

use crate::booking::BookingDraft;
use crate::location::LocationCandidate;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub const KEY_BOOKING: &str = "bookingData";
pub const KEY_LAST_LOCATION: &str = "lastLocation";
pub const KEY_LAST_PARK: &str = "lastPark";

const REMEMBER_TTL_MS: i64 = 30 * 24 * 3600 * 1000; // 30 days in ms

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Stored value is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// String-valued storage, keyed by logical name.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// JSON file holding every key.
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Load from a specific path. A missing or corrupt file starts empty.
    pub fn load_from(path: PathBuf) -> Self {
        let entries = Self::read_file(&path).unwrap_or_default();
        Self { path, entries }
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".movaa")
            .join("store.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(path: &Path) -> Option<BTreeMap<String, String>> {
        let data = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&data) {
            Ok(entries) => Some(entries),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring corrupt store file");
                None
            }
        }
    }

    fn persist(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, json).map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        self.persist()
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.entries.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }
}

/// In-process store. `unavailable()` behaves like a browser with storage
/// disabled: every call fails.
#[derive(Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    disabled: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self { entries: HashMap::new(), disabled: true }
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.disabled {
            return Err(StoreError::Unavailable("storage disabled".into()));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check()?;
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.check()?;
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.check()?;
        self.entries.remove(key);
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct Remembered<T> {
    value: T,
    saved_at: i64,
}

/// Typed JSON access over a [`KeyValueStore`]. Never fails: errors are
/// logged and reads come back empty.
pub struct Storage {
    backend: Box<dyn KeyValueStore>,
}

impl Storage {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self { backend: Box::new(backend) }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "store read failed");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "discarding unreadable stored value");
                None
            }
        }
    }

    /// Returns whether the value reached the backend.
    pub fn write<T: Serialize>(&mut self, key: &str, value: &T) -> bool {
        let result = serde_json::to_string(value)
            .map_err(StoreError::from)
            .and_then(|json| self.backend.set(key, json));
        match result {
            Ok(()) => {
                debug!(key, "stored");
                true
            }
            Err(e) => {
                warn!(key, error = %e, "store write failed, keeping in-memory state only");
                false
            }
        }
    }

    pub fn remove(&mut self, key: &str) {
        if let Err(e) = self.backend.remove(key) {
            warn!(key, error = %e, "store remove failed");
        }
    }

    // ─── Booking draft ─────────────────────────────────────────

    pub fn save_booking(&mut self, draft: &BookingDraft) -> bool {
        self.write(KEY_BOOKING, draft)
    }

    pub fn load_booking(&self) -> Option<BookingDraft> {
        self.read(KEY_BOOKING)
    }

    // ─── Last location / park ──────────────────────────────────

    fn remember<T: Serialize>(&mut self, key: &str, value: T, now: DateTime<Utc>) {
        self.write(key, &Remembered { value, saved_at: now.timestamp_millis() });
    }

    fn recall<T: DeserializeOwned>(&self, key: &str, now: DateTime<Utc>) -> Option<T> {
        let entry: Remembered<T> = self.read(key)?;
        if now.timestamp_millis() - entry.saved_at > REMEMBER_TTL_MS {
            debug!(key, "remembered value expired");
            return None;
        }
        Some(entry.value)
    }

    pub fn save_last_location(&mut self, location: &LocationCandidate, now: DateTime<Utc>) {
        self.remember(KEY_LAST_LOCATION, location, now);
    }

    /// The last resolved location, if saved within the freshness window.
    pub fn last_location(&self, now: DateTime<Utc>) -> Option<LocationCandidate> {
        self.recall(KEY_LAST_LOCATION, now)
    }

    pub fn save_last_park(&mut self, park_name: &str, now: DateTime<Utc>) {
        self.remember(KEY_LAST_PARK, park_name, now);
    }

    pub fn last_park(&self, now: DateTime<Utc>) -> Option<String> {
        self.recall(KEY_LAST_PARK, now)
    }

    /// Forget location and park, e.g. after an explicit clear.
    pub fn forget_location(&mut self) {
        self.remove(KEY_LAST_LOCATION);
        self.remove(KEY_LAST_PARK);
    }
}

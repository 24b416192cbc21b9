//! Snapshot-cache bridge.
//!
//! A flat key → JSON-text store the host persists across restarts. Every
//! save pushes the whole map through the host's persistence primitive;
//! there is no atomicity beyond what that push offers, so a crash between
//! serialize and push means the old value is retained.

use crate::traits::CacheSink;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;

pub const KEY_LAST_VERSION: &str = "last_version";
pub const KEY_TROVE_GAMES: &str = "trove_games";
pub const KEY_CONFIG: &str = "config";
/// Namespace handed to the owned resolver for its own order cache.
pub const KEY_LIBRARY: &str = "library";

pub struct CacheBridge {
    entries: Mutex<HashMap<String, String>>,
    sink: Arc<dyn CacheSink>,
}

impl CacheBridge {
    /// Wrap the entries the host restored at startup.
    pub fn new(initial: HashMap<String, String>, sink: Arc<dyn CacheSink>) -> Self {
        CacheBridge {
            entries: Mutex::new(initial),
            sink,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Serialize `value` under `key` and push to the host. Serialization
    /// failures are logged, never fatal: the old value stays.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) {
        let text = match serde_json::to_string(value) {
            Ok(text) => text,
            Err(e) => {
                warn!("Cache entry '{}' not saved: {}", key, e);
                return;
            }
        };
        let snapshot = {
            let mut entries = self.entries();
            entries.insert(key.to_string(), text);
            entries.clone()
        };
        self.sink.push(&snapshot);
    }

    /// Deserialize the entry under `key`; None when absent or unreadable.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let text = self.entries().get(key).cloned()?;
        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Cache entry '{}' is unreadable, ignoring: {}", key, e);
                None
            }
        }
    }

    pub fn load_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.load(key).unwrap_or(default)
    }
}

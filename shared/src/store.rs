use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Key for the serialized flight collection
pub const FLIGHTS_KEY: &str = "sw_flights_v1";
/// Key for the serialized booking collection
pub const BOOKINGS_KEY: &str = "sw_bookings_v1";
/// Key for the email -> role map
pub const ROLES_KEY: &str = "aws_roles";
/// Key for a mock session principal, used when no identity provider is wired
pub const MOCK_USER_KEY: &str = "mock_user";

/// Durable local key-value store: one JSON document per key, written
/// wholesale on every mutation. Writes are best-effort: a failed write
/// leaves the in-memory state authoritative for the session and is only
/// logged.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        if let Err(e) = fs::create_dir_all(&root) {
            tracing::warn!("Failed to create store directory {}: {}", root.display(), e);
        }
        Self { root }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    pub fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    pub fn put(&self, key: &str, value: &str) {
        if let Err(e) = self.try_put(key, value) {
            tracing::error!("{e}");
        }
    }

    fn try_put(&self, key: &str, value: &str) -> Result<()> {
        fs::write(self.path_for(key), value)
            .map_err(|e| Error::Store(format!("failed to persist {key}: {e}")))
    }

    pub fn remove(&self, key: &str) {
        let _ = fs::remove_file(self.path_for(key));
    }

    /// Reads and parses the document under `key`. A missing or unparseable
    /// document falls back; stale snapshots from older layouts must never
    /// take the app down.
    pub fn read_json_or<T, F>(&self, key: &str, fallback: F) -> T
    where
        T: DeserializeOwned,
        F: FnOnce() -> T,
    {
        match self.get(key) {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!("Ignoring unparseable snapshot under {}: {}", key, e);
                    fallback()
                }
            },
            None => fallback(),
        }
    }

    /// Serializes `value` and overwrites the document under `key`.
    pub fn write_json<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => self.put(key, &raw),
            Err(e) => tracing::error!("Failed to serialize {}: {}", key, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Booking, BookingStatus, CabinClass};

    fn temp_store() -> (tempfile::TempDir, LocalStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalStore::open(dir.path());
        (dir, store)
    }

    #[test]
    fn get_returns_none_for_missing_key() {
        let (_dir, store) = temp_store();
        assert!(store.get("nope").is_none());
    }

    #[test]
    fn put_then_get_round_trips() {
        let (_dir, store) = temp_store();
        store.put("k", "v");
        assert_eq!(store.get("k").as_deref(), Some("v"));
    }

    #[test]
    fn read_json_or_falls_back_on_garbage() {
        let (_dir, store) = temp_store();
        store.put("broken", "{not json");
        let v: Vec<u32> = store.read_json_or("broken", || vec![7]);
        assert_eq!(v, vec![7]);
    }

    #[test]
    fn booking_collection_round_trips() {
        let (_dir, store) = temp_store();
        let bookings = vec![Booking {
            id: "BK-1234".into(),
            flight_number: "SW-101".into(),
            airline: "SkyWings Airways".into(),
            from: "New York".into(),
            from_code: "JFK".into(),
            to: "London".into(),
            to_code: "LHR".into(),
            date: "2025-10-25".into(),
            time: "10:30 AM".into(),
            arrival: "10:45 PM".into(),
            duration: "7h 15m".into(),
            passenger: "John Smith".into(),
            seat: "12A".into(),
            cabin: CabinClass::Business,
            price: 1200.0,
            status: BookingStatus::Confirmed,
            booking_date: "2025-10-10".into(),
        }];
        store.write_json(BOOKINGS_KEY, &bookings);
        let loaded: Vec<Booking> = store.read_json_or(BOOKINGS_KEY, Vec::new);
        assert_eq!(loaded, bookings);
    }

    #[test]
    fn cabin_class_serializes_with_display_names() {
        let raw = serde_json::to_string(&CabinClass::FirstClass).unwrap();
        assert_eq!(raw, "\"First Class\"");
        let back: CabinClass = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, CabinClass::FirstClass);
    }
}

// ==============================================================================
// storage.rs — KEY-VALUE PERSISTENCE (BEST LAP + TUNING)
// ------------------------------------------------------------------------------
// A minimal load(key, default) / save(key, value) store. Values are JSON.
//
// - JsonFileStore: one JSON object on disk, rewritten on every save
// - MemoryStore:   tests / ephemeral sessions
//
// Reads never fail the caller: a missing key, a corrupt file or a value of the
// wrong shape all fall back to the default (with a warning). Writes return a
// Result so the caller decides how loud to be.
// ==============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{StoreError, TuningError};
use crate::tuning::TuningParameters;

pub const KEY_BEST_LAP: &str = "drift2k_best_lap";
pub const KEY_PHYSICS_PARAMS: &str = "drift2k_physics_params";

pub trait KeyValueStore {
    fn get_raw(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn put_raw(&mut self, key: &str, value: Value) -> Result<(), StoreError>;

    fn load<T: DeserializeOwned>(&self, key: &str, default: T) -> T
    where
        Self: Sized,
    {
        match self.get_raw(key) {
            Ok(Some(v)) => match serde_json::from_value(v) {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!(key, error = %e, "stored value has wrong shape; using default");
                    default
                }
            },
            Ok(None) => default,
            Err(e) => {
                tracing::warn!(key, error = %e, "store read failed; using default");
                default
            }
        }
    }

    fn save<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError>
    where
        Self: Sized,
    {
        let v = serde_json::to_value(value)?;
        self.put_raw(key, v)
    }
}

// -------------------------------------------------------------------------
// Typed helpers
// -------------------------------------------------------------------------

/// Best lap in seconds; `None` when no lap was ever completed.
pub fn best_lap<S: KeyValueStore>(store: &S) -> Option<f32> {
    store.load::<Option<f32>>(KEY_BEST_LAP, None)
}

pub fn save_best_lap<S: KeyValueStore>(store: &mut S, seconds: f32) -> Result<(), StoreError> {
    store.save(KEY_BEST_LAP, &seconds)
}

/// Stored tuning (or defaults), validated. An invalid stored value is a hard
/// error: the model must not start degenerate.
pub fn load_tuning<S: KeyValueStore>(store: &S) -> Result<TuningParameters, TuningError> {
    store
        .load(KEY_PHYSICS_PARAMS, TuningParameters::default())
        .validated()
}

pub fn save_tuning<S: KeyValueStore>(store: &mut S, tuning: &TuningParameters) -> Result<(), StoreError> {
    store.save(KEY_PHYSICS_PARAMS, tuning)
}

// -------------------------------------------------------------------------
// In-memory
// -------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_raw(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put_raw(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

// -------------------------------------------------------------------------
// JSON file
// -------------------------------------------------------------------------

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, Value>,
}

impl JsonFileStore {
    /// Open (or lazily create) the store at `path`. A corrupt file is logged
    /// and treated as empty; it is overwritten on the next save.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match Self::read_entries(&path) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "store unreadable; starting empty");
                BTreeMap::new()
            }
        };
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(path: &Path) -> Result<BTreeMap<String, Value>, StoreError> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let text = fs::read_to_string(path)?;
        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        match serde_json::from_str::<Value>(&text)? {
            Value::Object(map) => Ok(map.into_iter().collect()),
            _ => Err(StoreError::NotAnObject),
        }
    }

    fn flush(&self) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(&self.entries)?;
        // write-then-rename so a crash never leaves a half file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_raw(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put_raw(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_returns_default() {
        let store = MemoryStore::new();
        assert_eq!(store.load("nope", 42u32), 42);
        assert_eq!(best_lap(&store), None);
    }

    #[test]
    fn wrong_shape_returns_default() {
        let mut store = MemoryStore::new();
        store.put_raw(KEY_BEST_LAP, Value::String("fast".into())).unwrap();
        assert_eq!(best_lap(&store), None);
    }

    #[test]
    fn best_lap_roundtrips() {
        let mut store = MemoryStore::new();
        save_best_lap(&mut store, 61.25).unwrap();
        assert_eq!(best_lap(&store), Some(61.25));
    }

    #[test]
    fn stored_degenerate_tuning_fails_fast() {
        let mut store = MemoryStore::new();
        let bad = TuningParameters { redline_rpm: 500.0, ..Default::default() };
        save_tuning(&mut store, &bad).unwrap();
        assert!(matches!(load_tuning(&store), Err(TuningError::DegenerateRpmBand { .. })));
    }

    #[test]
    fn file_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut store = JsonFileStore::open(&path);
        let tuned = TuningParameters { mu_rear: 0.55, ..Default::default() };
        save_tuning(&mut store, &tuned).unwrap();
        save_best_lap(&mut store, 59.5).unwrap();

        let reopened = JsonFileStore::open(&path);
        assert_eq!(load_tuning(&reopened).unwrap(), tuned);
        assert_eq!(best_lap(&reopened), Some(59.5));
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::open(&path);
        assert_eq!(load_tuning(&store).unwrap(), TuningParameters::default());
    }
}

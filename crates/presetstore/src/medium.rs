//! String key-value media the preset store persists into. The store only
//! needs four operations, so hosts can back it with whatever settings
//! mechanism they already have; two implementations ship here.
//!
//! Types:
//!
//! - `KeyValueMedium` is the narrow capability the store depends on. Methods
//!   take `&self` so one medium can be shared between the store and other
//!   readers such as `SystemPresets`.
//! - `MemoryMedium` keeps entries in a locked `BTreeMap`; tests and embedders
//!   without persistence use it.
//! - `TomlFileMedium` mirrors its entries into a flat TOML table on every
//!   write, which is what `presetctl` uses on disk.
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::error::MediumError;

pub trait KeyValueMedium: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), MediumError>;
    fn remove(&self, key: &str) -> Result<(), MediumError>;
    /// Keys starting with `prefix`, in ascending order.
    fn keys_with_prefix(&self, prefix: &str) -> Vec<String>;
}

impl<T: KeyValueMedium + ?Sized> KeyValueMedium for Arc<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), MediumError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), MediumError> {
        (**self).remove(key)
    }

    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        (**self).keys_with_prefix(prefix)
    }
}

#[derive(Debug, Default)]
pub struct MemoryMedium {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let entries = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub fn len(&self) -> usize {
        read_entries(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueMedium for MemoryMedium {
    fn get(&self, key: &str) -> Option<String> {
        read_entries(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), MediumError> {
        write_entries(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), MediumError> {
        write_entries(&self.entries).remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        prefixed_keys(&read_entries(&self.entries), prefix)
    }
}

#[derive(Debug)]
pub struct TomlFileMedium {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl TomlFileMedium {
    /// Loads `path` if it exists; a missing file is an empty medium.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, MediumError> {
        let path = path.into();
        let entries = if path.exists() {
            let contents = fs::read_to_string(&path).map_err(|source| MediumError::Io {
                path: path.clone(),
                source,
            })?;
            toml::from_str(&contents)?
        } else {
            debug!(path = %path.display(), "key-value file missing; starting empty");
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), MediumError> {
        let io_error = |source| MediumError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).map_err(io_error)?;
            }
        }
        let serialized = toml::to_string(entries)?;
        fs::write(&self.path, serialized).map_err(io_error)?;
        debug!(path = %self.path.display(), entries = entries.len(), "persisted key-value file");
        Ok(())
    }
}

impl KeyValueMedium for TomlFileMedium {
    fn get(&self, key: &str) -> Option<String> {
        read_entries(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), MediumError> {
        let mut entries = write_entries(&self.entries);
        let previous = entries.insert(key.to_string(), value.to_string());
        if let Err(err) = self.persist(&entries) {
            match previous {
                Some(previous) => entries.insert(key.to_string(), previous),
                None => entries.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), MediumError> {
        let mut entries = write_entries(&self.entries);
        let Some(previous) = entries.remove(key) else {
            return Ok(());
        };
        if let Err(err) = self.persist(&entries) {
            entries.insert(key.to_string(), previous);
            return Err(err);
        }
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        prefixed_keys(&read_entries(&self.entries), prefix)
    }
}

fn prefixed_keys(entries: &BTreeMap<String, String>, prefix: &str) -> Vec<String> {
    entries
        .range(prefix.to_string()..)
        .take_while(|(key, _)| key.starts_with(prefix))
        .map(|(key, _)| key.clone())
        .collect()
}

// Entries stay usable after a panicking writer; every write is a single insert
// or remove, so the map is never left half-updated.
fn read_entries(lock: &RwLock<BTreeMap<String, String>>) -> RwLockReadGuard<'_, BTreeMap<String, String>> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_entries(
    lock: &RwLock<BTreeMap<String, String>>,
) -> RwLockWriteGuard<'_, BTreeMap<String, String>> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

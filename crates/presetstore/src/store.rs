//! Durable, indexed preset storage on top of a `KeyValueMedium`. Each preset
//! lives under `<prefix><id>` as canonical preset text; the store keeps three
//! in-memory indices in front of the medium so lookups by id, shader, or name
//! never scan it.
//!
//! Types:
//!
//! - `PresetStore` owns the medium and the indices behind one `RwLock`.
//!   Mutations (`save`, `remove`, `rebuild_indices`) and cache fills take the
//!   write lock; lookups take the read lock, so callers on any thread observe
//!   a save either completely or not at all.
//! - `RebuildSummary` reports how many stored values were indexed and which
//!   keys were skipped because they failed to read.
//!
//! Rules enforced by `save`:
//!
//! - When names are unique, saving a record whose name belongs to another id
//!   fails with `DuplicateName` before anything else is checked. Empty names
//!   and `DEFAULT_PRESET_NAME` are exempt.
//! - The shader of an existing id never changes; attempts fail with
//!   `ShaderModified` and leave the stored value untouched.
//! - The first successful save stamps `created_at`; later saves keep it.
use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use presettext::{generate_id, read, write, PresetRecord, WriteOptions, DEFAULT_PRESET_NAME};
use tracing::{debug, info, warn};

use crate::catalog::{ShaderCatalog, ShaderDescriptor};
use crate::config::StoreOptions;
use crate::error::StoreError;
use crate::medium::KeyValueMedium;

pub const DEFAULT_PRESET_PREFIX: &str = "videoShader.user.preset.data.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildSummary {
    pub indexed: usize,
    pub skipped: Vec<String>,
}

#[derive(Debug, Default)]
struct Indices {
    /// Records loaded so far. Filled lazily; never holds an id missing from
    /// the medium.
    cache: HashMap<String, PresetRecord>,
    /// Shader name to ids, in the order the ids were first saved or indexed.
    by_shader: HashMap<String, Vec<String>>,
    by_name: HashMap<String, BTreeSet<String>>,
}

impl Indices {
    fn link(&mut self, record: &PresetRecord) {
        self.by_shader
            .entry(record.shader.clone())
            .or_default()
            .push(record.id.clone());
        self.link_name(&record.name, &record.id);
    }

    fn link_name(&mut self, name: &str, id: &str) {
        self.by_name
            .entry(name.to_string())
            .or_default()
            .insert(id.to_string());
    }

    fn unlink_name(&mut self, name: &str, id: &str) {
        if let Some(ids) = self.by_name.get_mut(name) {
            ids.remove(id);
            if ids.is_empty() {
                self.by_name.remove(name);
            }
        }
    }

    fn forget(&mut self, id: &str) {
        self.cache.remove(id);
        self.by_shader.retain(|_, ids| {
            ids.retain(|other| other != id);
            !ids.is_empty()
        });
        self.by_name.retain(|_, ids| {
            ids.remove(id);
            !ids.is_empty()
        });
    }

    fn name_owned_by_other(&self, name: &str, id: &str) -> bool {
        if !is_claimable_name(name) {
            return false;
        }
        self.by_name
            .get(name)
            .is_some_and(|ids| ids.iter().any(|other| other != id))
    }
}

#[derive(Debug)]
pub struct PresetStore<M> {
    medium: M,
    options: StoreOptions,
    indices: RwLock<Indices>,
}

impl<M: KeyValueMedium> PresetStore<M> {
    /// Opens a store with default options and indexes what the medium holds.
    pub fn open(medium: M) -> Self {
        Self::with_options(medium, StoreOptions::default())
    }

    pub fn with_options(medium: M, options: StoreOptions) -> Self {
        let store = Self {
            medium,
            options,
            indices: RwLock::new(Indices::default()),
        };
        store.rebuild_indices();
        store
    }

    pub fn medium(&self) -> &M {
        &self.medium
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Medium key for `id`. An id that already carries the prefix is
    /// returned as is.
    pub fn key_for(&self, id: &str) -> String {
        if id.starts_with(&self.options.prefix) {
            id.to_string()
        } else {
            format!("{}{id}", self.options.prefix)
        }
    }

    fn normalize_id<'a>(&self, id: &'a str) -> &'a str {
        id.strip_prefix(self.options.prefix.as_str()).unwrap_or(id)
    }

    fn write_options(&self) -> WriteOptions {
        let options = WriteOptions::ALL | WriteOptions::CREATED_AT;
        if self.options.sign {
            options | WriteOptions::SIGN
        } else {
            options
        }
    }

    /// Discards the indices and rebuilds them from every prefixed key in the
    /// medium. Values that fail to read are logged and left out.
    pub fn rebuild_indices(&self) -> RebuildSummary {
        let mut indices = self.write_indices();
        let mut fresh = Indices::default();
        let mut summary = RebuildSummary::default();

        for key in self.medium.keys_with_prefix(&self.options.prefix) {
            let id = &key[self.options.prefix.len()..];
            let Some(text) = self.medium.get(&key) else {
                continue;
            };
            match read(&text, Some(id)) {
                Ok(record) => {
                    fresh.link(&record);
                    summary.indexed += 1;
                }
                Err(err) => {
                    warn!(key = %key, error = %err, "skipping unreadable shader preset");
                    summary.skipped.push(key);
                }
            }
        }

        if self.options.unique_names {
            for (name, ids) in &fresh.by_name {
                if ids.len() > 1 && is_claimable_name(name) {
                    warn!(name = %name, count = ids.len(), "stored presets share a name");
                }
            }
        }

        *indices = fresh;
        info!(
            indexed = summary.indexed,
            skipped = summary.skipped.len(),
            "indexed shader presets"
        );
        summary
    }

    /// Validates, serialises, and persists `record`, then updates the
    /// indices. Returns the record as stored, with its `created_at` set. An
    /// empty id is replaced with a generated one.
    pub fn save(&self, record: &PresetRecord) -> Result<PresetRecord, StoreError> {
        let id = match self.normalize_id(&record.id) {
            "" => generate_id(),
            id => id.to_string(),
        };

        let mut indices = self.write_indices();

        if self.options.unique_names && indices.name_owned_by_other(&record.name, &id) {
            return Err(StoreError::DuplicateName {
                name: record.name.clone(),
            });
        }

        let existing = match indices.cache.get(&id) {
            Some(cached) => Some(cached.clone()),
            None => self.load(&id),
        };
        if let Some(existing) = &existing {
            if existing.shader != record.shader {
                return Err(StoreError::ShaderModified {
                    id,
                    stored: existing.shader.clone(),
                    requested: record.shader.clone(),
                });
            }
        }

        let created_at = existing
            .as_ref()
            .and_then(|existing| existing.created_at)
            .or(record.created_at)
            .unwrap_or_else(now_seconds);
        let stored = PresetRecord {
            id: id.clone(),
            created_at: Some(created_at),
            ..record.clone()
        };

        let text = write(&stored, self.write_options())?;
        self.medium.set(&self.key_for(&id), &text)?;

        match &existing {
            Some(previous) if previous.name != stored.name => {
                indices.unlink_name(&previous.name, &id);
                indices.link_name(&stored.name, &id);
            }
            Some(_) => {}
            None => {
                // A value that failed to read may still sit in the indices of
                // an older rebuild; start from a clean slate for this id.
                indices.forget(&id);
                indices.link(&stored);
            }
        }
        indices.cache.insert(id.clone(), stored.clone());

        debug!(id = %id, shader = %stored.shader, name = %stored.name, "saved shader preset");
        Ok(stored)
    }

    /// Deletes the preset stored under `id`. Returns `false` when nothing
    /// was stored there.
    pub fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let id = self.normalize_id(id);
        let key = self.key_for(id);
        let mut indices = self.write_indices();

        if self.medium.get(&key).is_none() {
            return Ok(false);
        }
        self.medium.remove(&key)?;
        indices.forget(id);

        debug!(id = %id, "removed shader preset");
        Ok(true)
    }

    pub fn find_preset_by_id(&self, id: &str) -> Option<PresetRecord> {
        let id = self.normalize_id(id);
        if let Some(record) = self.read_indices().cache.get(id) {
            return Some(record.clone());
        }

        let mut indices = self.write_indices();
        if let Some(record) = indices.cache.get(id) {
            return Some(record.clone());
        }
        let record = self.load(id)?;
        indices.cache.insert(id.to_string(), record.clone());
        Some(record)
    }

    /// Presets saved for `shader`, in index order. Ids that no longer read
    /// are left out.
    pub fn find_presets_by_shader(&self, shader: &str) -> Vec<PresetRecord> {
        let ids = match self.read_indices().by_shader.get(shader) {
            Some(ids) => ids.clone(),
            None => return Vec::new(),
        };
        ids.iter()
            .filter_map(|id| self.find_preset_by_id(id))
            .collect()
    }

    /// The preset carrying `name`. When names are not unique and several
    /// presets share it, the smallest id wins.
    pub fn find_preset_by_name(&self, name: &str) -> Option<PresetRecord> {
        let id = self
            .read_indices()
            .by_name
            .get(name)
            .and_then(|ids| ids.iter().next().cloned())?;
        self.find_preset_by_id(&id)
    }

    /// Whether any value is stored under `id`, readable or not.
    pub fn exists_by_id(&self, id: &str) -> bool {
        let _indices = self.read_indices();
        self.medium.get(&self.key_for(id)).is_some()
    }

    pub fn exists_by_name(&self, name: &str) -> bool {
        self.read_indices().by_name.contains_key(name)
    }

    /// Every indexed id, sorted.
    pub fn ids(&self) -> Vec<String> {
        let indices = self.read_indices();
        let mut ids: Vec<String> = indices.by_shader.values().flatten().cloned().collect();
        ids.sort();
        ids
    }

    /// Indexed presets accepted by `predicate`, ordered by id.
    pub fn presets_matching<F>(&self, mut predicate: F) -> Vec<PresetRecord>
    where
        F: FnMut(&PresetRecord) -> bool,
    {
        self.ids()
            .iter()
            .filter_map(|id| self.find_preset_by_id(id))
            .filter(|record| predicate(record))
            .collect()
    }

    /// The preset saved under the shader's own name, or one synthesised from
    /// the shader's initial parameter values.
    pub fn default_preset_for_shader(&self, shader: &ShaderDescriptor) -> PresetRecord {
        self.find_preset_by_id(&shader.name)
            .unwrap_or_else(|| shader.default_preset())
    }

    /// Like `default_preset_for_shader`, resolving the shader by name.
    /// Returns `None` when neither a saved preset nor a catalog entry exists.
    pub fn default_preset_for<C>(&self, catalog: &C, shader: &str) -> Option<PresetRecord>
    where
        C: ShaderCatalog + ?Sized,
    {
        self.find_preset_by_id(shader)
            .or_else(|| catalog.lookup(shader).map(ShaderDescriptor::default_preset))
    }

    fn load(&self, id: &str) -> Option<PresetRecord> {
        let key = self.key_for(id);
        let text = self.medium.get(&key)?;
        match read(&text, Some(id)) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(key = %key, error = %err, "stored shader preset is unreadable");
                None
            }
        }
    }

    fn read_indices(&self) -> RwLockReadGuard<'_, Indices> {
        self.indices.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_indices(&self) -> RwLockWriteGuard<'_, Indices> {
        self.indices.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Empty names and the placeholder the reader gives unnamed text may be
/// shared by any number of presets.
fn is_claimable_name(name: &str) -> bool {
    !name.is_empty() && name != DEFAULT_PRESET_NAME
}

fn now_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

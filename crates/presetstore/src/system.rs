use presettext::PresetRecord;

use crate::catalog::ShaderCatalog;
use crate::error::{MediumError, StoreError};
use crate::medium::KeyValueMedium;
use crate::store::PresetStore;

/// Preset used when no global default has been chosen or the chosen one is
/// gone.
pub const FALLBACK_PRESET_ID: &str = "Pixellate";

const GLOBAL_PRESET_KEY: &str = "videoShader.preset";

fn system_key(identifier: &str) -> String {
    format!("videoShader.{identifier}.preset")
}

/// Per-system preset assignments, stored as plain ids in the same medium as
/// the presets themselves.
pub struct SystemPresets<'a, M> {
    store: &'a PresetStore<M>,
}

impl<'a, M: KeyValueMedium> SystemPresets<'a, M> {
    pub fn new(store: &'a PresetStore<M>) -> Self {
        Self { store }
    }

    /// The chosen global default when it still exists, otherwise
    /// `FALLBACK_PRESET_ID`.
    pub fn default_preset_id(&self) -> String {
        self.store
            .medium()
            .get(GLOBAL_PRESET_KEY)
            .filter(|id| self.store.exists_by_id(id))
            .unwrap_or_else(|| FALLBACK_PRESET_ID.to_string())
    }

    pub fn set_default_preset_id(&self, id: &str) -> Result<(), MediumError> {
        self.store.medium().set(GLOBAL_PRESET_KEY, id)
    }

    /// Resolves the default id to a saved preset, or to the default preset of
    /// the catalog shader with that name.
    pub fn default_preset<C>(&self, catalog: &C) -> Option<PresetRecord>
    where
        C: ShaderCatalog + ?Sized,
    {
        self.store.default_preset_for(catalog, &self.default_preset_id())
    }

    pub fn set_preset_for_system(&self, identifier: &str, preset_id: &str) -> Result<(), StoreError> {
        let key = self.assignment_key(identifier)?;
        Ok(self.store.medium().set(&key, preset_id)?)
    }

    pub fn reset_preset_for_system(&self, identifier: &str) -> Result<(), StoreError> {
        let key = self.assignment_key(identifier)?;
        Ok(self.store.medium().remove(&key)?)
    }

    pub fn preset_id_for_system(&self, identifier: &str) -> Option<String> {
        let key = self.assignment_key(identifier).ok()?;
        self.store.medium().get(&key)
    }

    /// Assignment keys must stay outside the store's preset prefix.
    fn assignment_key(&self, identifier: &str) -> Result<String, StoreError> {
        let key = system_key(identifier);
        if key.starts_with(&self.store.options().prefix) {
            return Err(StoreError::ReservedSystemKey {
                identifier: identifier.to_string(),
            });
        }
        Ok(key)
    }

    /// The preset assigned to `identifier`, if one is assigned and still
    /// loads.
    pub fn find_preset_for_system(&self, identifier: &str) -> Option<PresetRecord> {
        let id = self.preset_id_for_system(identifier)?;
        self.store.find_preset_by_id(&id)
    }
}

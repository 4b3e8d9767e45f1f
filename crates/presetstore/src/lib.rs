mod catalog;
mod config;
mod error;
mod medium;
mod store;
mod system;

pub use catalog::{CatalogError, MemoryCatalog, ShaderCatalog, ShaderDescriptor, ShaderParameter};
pub use config::{ConfigError, StoreConfig, StoreOptions};
pub use error::{MediumError, StoreError};
pub use medium::{KeyValueMedium, MemoryMedium, TomlFileMedium};
pub use presettext::PresetRecord;
pub use store::{PresetStore, RebuildSummary, DEFAULT_PRESET_PREFIX};
pub use system::{SystemPresets, FALLBACK_PRESET_ID};

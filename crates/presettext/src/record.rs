use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Name given to presets whose text does not carry a `$name` field.
pub const DEFAULT_PRESET_NAME: &str = "Unnamed shader preset";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetRecord {
    pub id: String,
    pub name: String,
    pub shader: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, f64>,
    /// Unix seconds of the first successful save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,
}

impl PresetRecord {
    pub fn new(name: impl Into<String>, shader: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            shader: shader.into(),
            parameters: BTreeMap::new(),
            created_at: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: f64) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub fn with_parameters<K, I>(mut self, parameters: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, f64)>,
    {
        self.parameters
            .extend(parameters.into_iter().map(|(key, value)| (key.into(), value)));
        self
    }

    pub fn with_created_at(mut self, seconds: u64) -> Self {
        self.created_at = Some(seconds);
        self
    }
}

/// Returns a random identifier formatted like a version 4 UUID.
pub fn generate_id() -> String {
    let mut bytes: [u8; 16] = rand::thread_rng().gen();
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    let hex: String = bytes.iter().map(|byte| format!("{byte:02X}")).collect();
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

//! Shader descriptors the store consults when it needs to synthesise a preset
//! rather than load one: the default preset of a shader, or a preset built
//! from the live values of a parameter editor.
//!
//! Types:
//!
//! - `ShaderParameter` describes one tunable value with its initial value,
//!   range, and quantisation step.
//! - `ShaderDescriptor` groups a shader name with its parameters.
//! - `ShaderCatalog` is the lookup capability the store depends on.
//! - `MemoryCatalog` implements it over descriptors built in code or loaded
//!   from a TOML manifest (`[[shaders]]` with nested `[[shaders.parameters]]`).
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use presettext::{PresetRecord, MAX_FRACTION_DIGITS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Relative tolerance used when deciding whether a value still equals its
/// initial value.
const INITIAL_TOLERANCE: f64 = 1.490_116_119_384_765_6e-8;

pub trait ShaderCatalog {
    fn lookup(&self, name: &str) -> Option<&ShaderDescriptor>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderParameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub initial: f64,
    pub minimum: f64,
    pub maximum: f64,
    #[serde(default)]
    pub step: f64,
}

impl ShaderParameter {
    pub fn new(name: impl Into<String>, initial: f64, minimum: f64, maximum: f64, step: f64) -> Self {
        Self {
            name: name.into(),
            description: None,
            initial,
            minimum,
            maximum,
            step,
        }
    }

    /// Rounds `value` up in magnitude to four fractional digits when the
    /// parameter has a positive step: `0.12341` becomes `0.1235` and
    /// `-0.12341` becomes `-0.1235`. Steps of zero leave values untouched.
    pub fn quantize(&self, value: f64) -> f64 {
        if self.step > 0.0 {
            let scale = 10f64.powi(MAX_FRACTION_DIGITS as i32);
            (value * scale).abs().ceil().copysign(value) / scale
        } else {
            value
        }
    }

    pub fn is_initial(&self, value: f64) -> bool {
        approximately_equal(value, self.initial)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderDescriptor {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ShaderParameter>,
}

impl ShaderDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: ShaderParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ShaderParameter> {
        self.parameters.iter().find(|parameter| parameter.name == name)
    }

    pub fn default_parameters(&self) -> BTreeMap<String, f64> {
        self.parameters
            .iter()
            .map(|parameter| (parameter.name.clone(), parameter.initial))
            .collect()
    }

    /// The preset used when nothing has been saved for this shader. Its id and
    /// name are the shader name.
    pub fn default_preset(&self) -> PresetRecord {
        PresetRecord {
            id: self.name.clone(),
            name: self.name.clone(),
            shader: self.name.clone(),
            parameters: self.default_parameters(),
            created_at: None,
        }
    }

    /// Builds a new preset from live editor values. Values are quantised per
    /// parameter, and only those that differ from their initial value are
    /// kept. Values for names the shader does not declare are dropped.
    pub fn preset_from_values(&self, values: &BTreeMap<String, f64>) -> PresetRecord {
        let parameters: Vec<(String, f64)> = self
            .parameters
            .iter()
            .filter_map(|parameter| {
                let value = parameter.quantize(*values.get(&parameter.name)?);
                (!parameter.is_initial(value)).then(|| (parameter.name.clone(), value))
            })
            .collect();
        PresetRecord::new(presettext::DEFAULT_PRESET_NAME, self.name.clone())
            .with_parameters(parameters)
    }
}

fn approximately_equal(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    if !a.is_finite() || !b.is_finite() {
        return false;
    }
    let scale = a.abs().max(b.abs()).max(f64::MIN_POSITIVE);
    (a - b).abs() <= scale * INITIAL_TOLERANCE
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read shader catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse shader catalog: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("shader catalog failed validation: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
struct CatalogManifest {
    #[serde(default)]
    shaders: Vec<ShaderDescriptor>,
}

impl CatalogManifest {
    fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();
        for shader in &self.shaders {
            if shader.name.trim().is_empty() {
                issues.push("shader name must not be empty".to_string());
            }
            if !seen.insert(shader.name.as_str()) {
                issues.push(format!("shader '{}' is declared more than once", shader.name));
            }
            let mut params = HashSet::new();
            for parameter in &shader.parameters {
                if !presettext::is_valid_parameter_name(&parameter.name) {
                    issues.push(format!(
                        "shader '{}' parameter '{}' is not a valid identifier",
                        shader.name, parameter.name
                    ));
                }
                if !params.insert(parameter.name.as_str()) {
                    issues.push(format!(
                        "shader '{}' declares parameter '{}' more than once",
                        shader.name, parameter.name
                    ));
                }
                if parameter.minimum > parameter.maximum {
                    issues.push(format!(
                        "shader '{}' parameter '{}' has minimum above maximum",
                        shader.name, parameter.name
                    ));
                }
                if parameter.step < 0.0 {
                    issues.push(format!(
                        "shader '{}' parameter '{}' has a negative step",
                        shader.name, parameter.name
                    ));
                }
            }
        }
        issues
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    shaders: BTreeMap<String, ShaderDescriptor>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(input: &str) -> Result<Self, CatalogError> {
        let manifest: CatalogManifest = toml::from_str(input)?;
        let issues = manifest.validate();
        if !issues.is_empty() {
            return Err(CatalogError::Validation(issues.join("; ")));
        }
        Ok(manifest.shaders.into_iter().collect())
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn insert(&mut self, descriptor: ShaderDescriptor) {
        self.shaders.insert(descriptor.name.clone(), descriptor);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.shaders.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }
}

impl FromIterator<ShaderDescriptor> for MemoryCatalog {
    fn from_iter<I: IntoIterator<Item = ShaderDescriptor>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for descriptor in iter {
            catalog.insert(descriptor);
        }
        catalog
    }
}

impl ShaderCatalog for MemoryCatalog {
    fn lookup(&self, name: &str) -> Option<&ShaderDescriptor> {
        self.shaders.get(name)
    }
}

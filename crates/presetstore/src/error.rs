use std::path::PathBuf;

use presettext::WriteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediumError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode key-value file: {0}")]
    Decode(#[from] toml::de::Error),

    #[error("failed to encode key-value file: {0}")]
    Encode(#[from] toml::ser::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("another preset is already named '{name}'")]
    DuplicateName { name: String },

    #[error("preset '{id}' belongs to shader '{stored}' and cannot be saved for '{requested}'")]
    ShaderModified {
        id: String,
        stored: String,
        requested: String,
    },

    #[error("system identifier '{identifier}' maps into the preset key space")]
    ReservedSystemKey { identifier: String },

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Medium(#[from] MediumError),
}

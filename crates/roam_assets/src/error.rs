//! Asset loading errors

use roam_core::CoreError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {origin}: {source}")]
    Invalid {
        origin: String,
        #[source]
        source: CoreError,
    },
}

pub type AssetResult<T> = Result<T, AssetError>;

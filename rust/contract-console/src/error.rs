//! Error types for registry loading, contract binding and interface generation

use std::{io, path::PathBuf};

pub type Result<T, E = LoaderError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("contract registry not found at {}", path.display())]
    ConfigNotFound { path: PathBuf },

    #[error("failed to read contract registry {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse contract registry {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid contract registry {}: {reason}", path.display())]
    Schema { path: PathBuf, reason: String },

    #[error("failed to read ABI for `{key}`: {source}")]
    AbiRead {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("malformed ABI for `{key}`: {reason}")]
    AbiParse { key: String, reason: String },

    #[error("Missing ABI for interface {iface_name}")]
    MissingAbi { iface_name: String },

    #[error("no contract bound to `{key}`")]
    KeyNotFound { key: String },

    #[error("invalid address `{addr}` for `{key}`")]
    InvalidAddress { key: String, addr: String },

    #[error("failed to bind `{key}`: {source}")]
    Bind {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

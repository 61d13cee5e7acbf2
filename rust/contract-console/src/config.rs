//! Console configuration, read from `console.toml`
//!
//! Every field has a default, so a partial file (or none at all) is enough to start the console.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::interface::SOURCE_EXTENSION;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "console.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Directory holding `contracts.json` and the per-deployment ABI files
    pub abi_dir: PathBuf,
    /// Directory receiving generated interface sources
    pub output_dir: PathBuf,
    pub source_extension: String,
    /// Regenerate interface sources on every reload
    pub generate_on_reload: bool,
    /// Console commands run after each reload, skipped if the file does not exist
    pub startup_script: PathBuf,
    pub network: NetworkConfig,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            abi_dir: PathBuf::from("scripts/abis"),
            output_dir: PathBuf::from("contracts/external"),
            source_extension: SOURCE_EXTENSION.to_string(),
            generate_on_reload: true,
            startup_script: PathBuf::from("console_startup.txt"),
            network: NetworkConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub rpc_url: String,
    /// Signing wallet; without it transactions are sent unsigned for the node to sign
    pub mnemonic: Option<String>,
    pub account_index: u32,
    /// Upstream RPC of a forked development node
    pub fork_url: Option<String>,
    pub fork_block_number: Option<u64>,
    /// Command line the development node was launched with, searched for
    /// `--fork-block-number` when no block number is configured
    pub launch_cmd: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            mnemonic: None,
            account_index: 0,
            fork_url: None,
            fork_block_number: None,
            launch_cmd: None,
        }
    }
}

impl ConsoleConfig {
    /// Load configuration from `path`, or from `console.toml` in the working directory.
    ///
    /// A missing default file yields the defaults; an explicitly given file must exist.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path, true),
            None => (Path::new(DEFAULT_CONFIG_FILE), false),
        };

        if !explicit && !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("failed to parse TOML config from {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = ConsoleConfig::from_toml(
            r#"
            abi_dir = "abis"
            generate_on_reload = false

            [network]
            rpc_url = "http://localhost:9545"
            fork_url = "https://eth.example.org"
            launch_cmd = "anvil --fork-url https://eth.example.org --fork-block-number 17000000"
            "#,
        )
        .unwrap();

        assert_eq!(config.abi_dir, PathBuf::from("abis"));
        assert_eq!(config.output_dir, PathBuf::from("contracts/external"));
        assert_eq!(config.source_extension, "sol");
        assert!(!config.generate_on_reload);
        assert_eq!(config.network.rpc_url, "http://localhost:9545");
        assert_eq!(config.network.account_index, 0);
        assert_eq!(config.network.fork_block_number, None);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let err = ConsoleConfig::load(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
        assert_eq!(ConsoleConfig::from_toml("").unwrap(), ConsoleConfig::default());
    }

    #[test]
    fn test_malformed_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("console.toml");
        fs::write(&path, "abi_dir = [").unwrap();
        let err = ConsoleConfig::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("failed to parse TOML config"));
    }
}

//! ABI side files and the sibling resolution rule
//!
//! An interface is usually shared by several deployments, and only one of them needs to ship
//! an ABI file: the first deployment of the group (in registry order) with a resolvable ABI
//! is authoritative for the whole group.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use alloy::json_abi::JsonAbi;
use serde_json::Value;

use crate::{
    error::{LoaderError, Result},
    registry::DeploymentRecord,
};

/// Lookup of ABI documents by deployment key.
pub trait AbiSource {
    /// Whether an ABI document is present for `key`
    fn exists(&self, key: &str) -> bool;

    /// Load the ABI for `key`, `None` if there is none
    fn load(&self, key: &str) -> Result<Option<JsonAbi>>;
}

impl<S: AbiSource + ?Sized> AbiSource for &S {
    fn exists(&self, key: &str) -> bool {
        (**self).exists(key)
    }

    fn load(&self, key: &str) -> Result<Option<JsonAbi>> {
        (**self).load(key)
    }
}

/// ABI files stored as `{dir}/{key}.json`.
#[derive(Debug, Clone)]
pub struct DirAbiSource {
    dir: PathBuf,
}

impl DirAbiSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl AbiSource for DirAbiSource {
    fn exists(&self, key: &str) -> bool {
        self.path_for(key).is_file()
    }

    fn load(&self, key: &str) -> Result<Option<JsonAbi>> {
        let content = match fs::read_to_string(self.path_for(key)) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(LoaderError::AbiRead {
                    key: key.to_string(),
                    source,
                });
            }
        };
        parse_abi(key, &content).map(Some)
    }
}

/// Parse an ABI document, either a bare ABI array or a build artifact with an `abi` field.
pub fn parse_abi(key: &str, content: &str) -> Result<JsonAbi> {
    let malformed = |reason: String| LoaderError::AbiParse {
        key: key.to_string(),
        reason,
    };
    let doc: Value = serde_json::from_str(content).map_err(|e| malformed(e.to_string()))?;
    let doc = match doc {
        Value::Object(mut artifact) => artifact
            .remove("abi")
            .ok_or_else(|| malformed("artifact has no `abi` field".to_string()))?,
        other => other,
    };
    serde_json::from_value(doc).map_err(|e| malformed(e.to_string()))
}

/// The ABI adopted by an interface group and the deployment that supplied it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAbi {
    pub source_key: String,
    pub abi: JsonAbi,
}

/// Resolve the authoritative ABI of an interface group: the first sibling, in the order given,
/// whose key has an ABI document.
pub fn resolve_group_abi<'a, S, I>(
    source: &S,
    interface_name: &str,
    siblings: I,
) -> Result<ResolvedAbi>
where
    S: AbiSource + ?Sized,
    I: IntoIterator<Item = &'a DeploymentRecord>,
{
    for sibling in siblings {
        if !source.exists(&sibling.key) {
            tracing::debug!(key = %sibling.key, interface = interface_name, "no ABI file");
            continue;
        }
        if let Some(abi) = source.load(&sibling.key)? {
            tracing::debug!(key = %sibling.key, interface = interface_name, "resolved ABI");
            return Ok(ResolvedAbi {
                source_key: sibling.key.clone(),
                abi,
            });
        }
    }
    Err(LoaderError::MissingAbi {
        iface_name: interface_name.to_string(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{cell::RefCell, collections::HashMap};

    use super::*;
    use crate::registry::record;
    use tempfile::TempDir;

    pub(crate) const ERC20_ABI: &str = r#"[
        {"type": "function", "name": "balanceOf", "stateMutability": "view",
         "inputs": [{"name": "owner", "type": "address"}],
         "outputs": [{"name": "", "type": "uint256"}]},
        {"type": "function", "name": "transfer", "stateMutability": "nonpayable",
         "inputs": [{"name": "to", "type": "address"}, {"name": "amount", "type": "uint256"}],
         "outputs": [{"name": "", "type": "bool"}]}
    ]"#;

    pub(crate) const WETH_ABI: &str = r#"[
        {"type": "function", "name": "deposit", "stateMutability": "payable",
         "inputs": [], "outputs": []},
        {"type": "fallback", "stateMutability": "payable"}
    ]"#;

    /// In-memory ABI source counting `load` calls per key.
    #[derive(Default)]
    pub(crate) struct MemAbiSource {
        pub abis: HashMap<String, JsonAbi>,
        pub loads: RefCell<Vec<String>>,
    }

    impl MemAbiSource {
        pub(crate) fn with(entries: &[(&str, &str)]) -> Self {
            let abis = entries
                .iter()
                .map(|(key, json)| (key.to_string(), serde_json::from_str(json).unwrap()))
                .collect();
            Self {
                abis,
                loads: RefCell::default(),
            }
        }
    }

    impl AbiSource for MemAbiSource {
        fn exists(&self, key: &str) -> bool {
            self.abis.contains_key(key)
        }

        fn load(&self, key: &str) -> Result<Option<JsonAbi>> {
            self.loads.borrow_mut().push(key.to_string());
            Ok(self.abis.get(key).cloned())
        }
    }

    #[test]
    fn test_first_sibling_with_abi_wins() {
        let source = MemAbiSource::with(&[("b", ERC20_ABI), ("c", WETH_ABI)]);
        let group = [
            record("a", "Foo", "A", "0x1"),
            record("b", "Foo", "B", "0x2"),
            record("c", "Foo", "C", "0x3"),
        ];
        let resolved = resolve_group_abi(&source, "Foo", &group).unwrap();
        assert_eq!(resolved.source_key, "b");
        assert!(resolved.abi.function("balanceOf").is_some());
        assert_eq!(*source.loads.borrow(), ["b"]);
    }

    #[test]
    fn test_missing_abi_names_interface() {
        let source = MemAbiSource::default();
        let group = [record("a", "Foo", "A", "0x1")];
        let err = resolve_group_abi(&source, "Foo", &group).unwrap_err();
        assert!(matches!(&err, LoaderError::MissingAbi { iface_name } if iface_name == "Foo"));
        assert_eq!(err.to_string(), "Missing ABI for interface Foo");
    }

    #[test]
    fn test_dir_source_reads_array_and_artifact() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("usdt.json"), ERC20_ABI).unwrap();
        fs::write(
            dir.path().join("weth.json"),
            format!(r#"{{"contractName": "WETH9", "abi": {WETH_ABI}}}"#),
        )
        .unwrap();

        let source = DirAbiSource::new(dir.path());
        assert!(source.exists("usdt"));
        assert!(!source.exists("usdc"));
        assert!(source.load("usdc").unwrap().is_none());

        let erc20 = source.load("usdt").unwrap().unwrap();
        assert_eq!(erc20.functions().count(), 2);
        let weth = source.load("weth").unwrap().unwrap();
        assert!(weth.fallback.is_some());
    }

    #[test]
    fn test_dir_source_rejects_malformed_abi() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bad.json"), "{\"bytecode\": \"0x\"}").unwrap();
        let err = DirAbiSource::new(dir.path()).load("bad").unwrap_err();
        assert!(matches!(err, LoaderError::AbiParse { key, .. } if key == "bad"));
    }
}

//! Contract loader: binds every registry deployment to a proxy under its key

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
};

use alloy::json_abi::JsonAbi;
use indexmap::IndexMap;

use crate::{
    abi::{AbiSource, DirAbiSource, resolve_group_abi},
    error::{LoaderError, Result},
    interface::{self, InterfaceSourceGenerator},
    proxy::ProxyFactory,
    registry::Registry,
};

/// Bound proxies by deployment key, in registry order.
#[derive(Debug, Clone)]
pub struct ContractTable<P> {
    entries: IndexMap<String, P>,
}

impl<P> ContractTable<P> {
    pub fn get(&self, key: &str) -> Result<&P> {
        self.entries
            .get(key)
            .ok_or_else(|| LoaderError::KeyNotFound {
                key: key.to_string(),
            })
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &P)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<P> IntoIterator for ContractTable<P> {
    type Item = (String, P);
    type IntoIter = indexmap::map::IntoIter<String, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Owns the registry, its ABI source and the most recently built contract table.
///
/// Not synchronized: rebuilding the table while another thread reads it is not supported.
pub struct ContractLoader<P, S = DirAbiSource> {
    registry: Registry,
    abi_source: S,
    table: Option<ContractTable<P>>,
}

impl<P> ContractLoader<P> {
    /// Load `{dir}/contracts.json` with ABI files looked up as `{dir}/{key}.json`.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let registry = Registry::load(dir)?;
        Ok(Self::with_source(registry, DirAbiSource::new(dir)))
    }
}

impl<P, S: AbiSource> ContractLoader<P, S> {
    pub fn with_source(registry: Registry, abi_source: S) -> Self {
        Self {
            registry,
            abi_source,
            table: None,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn abi_source(&self) -> &S {
        &self.abi_source
    }

    /// Bind one proxy per deployment, replacing the current table only if every deployment
    /// binds. Each interface's ABI is resolved once per build.
    pub fn build_contract_table<F>(&mut self, factory: &F) -> Result<()>
    where
        F: ProxyFactory<Proxy = P> + ?Sized,
    {
        let mut abis: HashMap<&str, JsonAbi> = HashMap::new();
        let mut entries = IndexMap::with_capacity(self.registry.len());

        for record in self.registry.iter() {
            let iface = record.interface_name.as_str();
            let abi = match abis.get(iface) {
                Some(abi) => abi.clone(),
                None => {
                    let resolved =
                        resolve_group_abi(&self.abi_source, iface, self.registry.siblings(iface))?;
                    tracing::info!(
                        interface = iface,
                        abi = %resolved.source_key,
                        "resolved interface ABI"
                    );
                    abis.insert(iface, resolved.abi.clone());
                    resolved.abi
                }
            };

            let address = interface::parse_address(record)?;
            let proxy = factory
                .bind(&record.display_name, address, abi)
                .map_err(|source| LoaderError::Bind {
                    key: record.key.clone(),
                    source,
                })?;
            entries.insert(record.key.clone(), proxy);
        }

        tracing::info!(
            contracts = entries.len(),
            interfaces = abis.len(),
            "built contract table"
        );
        self.table = Some(ContractTable { entries });
        Ok(())
    }

    /// Write one interface source file per interface into `out_dir`.
    pub fn generate_interfaces<G>(
        &self,
        generator: &G,
        out_dir: impl AsRef<Path>,
        extension: &str,
    ) -> Result<Vec<PathBuf>>
    where
        G: InterfaceSourceGenerator + ?Sized,
    {
        interface::write_interfaces(
            &self.registry,
            &self.abi_source,
            generator,
            out_dir.as_ref(),
            extension,
        )
    }
}

impl<P, S> ContractLoader<P, S> {
    /// Proxy bound to `key` by the last successful build.
    pub fn get(&self, key: &str) -> Result<&P> {
        match &self.table {
            Some(table) => table.get(key),
            None => Err(LoaderError::KeyNotFound {
                key: key.to_string(),
            }),
        }
    }

    pub fn contract_table(&self) -> Option<&ContractTable<P>> {
        self.table.as_ref()
    }

    /// `key: name` listing of the registry.
    pub fn loaded_contract_info(&self) -> LoadedContractInfo<'_> {
        LoadedContractInfo {
            registry: &self.registry,
        }
    }

    pub fn print_loaded_contract_info(&self) {
        print!("{}", self.loaded_contract_info());
    }
}

pub struct LoadedContractInfo<'a> {
    registry: &'a Registry,
}

impl fmt::Display for LoadedContractInfo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ContractLoader has loaded:")?;
        for record in self.registry {
            writeln!(f, "    {}: {}", record.key, record.display_name)?;
        }
        Ok(())
    }
}

//! Declarative registry of contract deployments (`contracts.json`)

use std::{collections::HashSet, fs, io, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::{LoaderError, Result};

/// File name of the registry document inside the ABI directory
pub const REGISTRY_FILE: &str = "contracts.json";

/// One deployed contract, as listed in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    /// Short variable name, unique across the registry
    pub key: String,
    /// Interface shared by every deployment of the same contract type
    #[serde(rename = "iface_name")]
    pub interface_name: String,
    /// Human label used when binding the proxy
    #[serde(rename = "name")]
    pub display_name: String,
    /// Address literal, not validated until bound or rendered
    #[serde(rename = "addr")]
    pub address: String,
}

/// Ordered, immutable list of deployments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    records: Vec<DeploymentRecord>,
}

impl Registry {
    /// Read and validate `{dir}/contracts.json`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let path = dir.as_ref().join(REGISTRY_FILE);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(LoaderError::ConfigNotFound { path });
            }
            Err(source) => return Err(LoaderError::ConfigRead { path, source }),
        };

        // well-formedness first, so that syntax errors and missing fields are reported apart
        let doc: serde_json::Value = serde_json::from_str(&content)
            .map_err(|source| LoaderError::ConfigParse {
                path: path.clone(),
                source,
            })?;
        let records: Vec<DeploymentRecord> = serde_path_to_error::deserialize(doc)
            .map_err(|err| LoaderError::Schema {
                reason: format!("at `{}`: {}", err.path(), err.inner()),
                path: path.clone(),
            })?;

        let registry = Self::from_records(records).map_err(|reason| LoaderError::Schema {
            path: path.clone(),
            reason,
        })?;
        tracing::info!(path = %path.display(), records = registry.len(), "loaded contract registry");
        Ok(registry)
    }

    /// Build a registry from already parsed records, rejecting duplicate keys.
    pub fn from_records(records: Vec<DeploymentRecord>) -> Result<Self, String> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if !seen.insert(record.key.as_str()) {
                return Err(format!("duplicate key `{}`", record.key));
            }
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[DeploymentRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeploymentRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records sharing `interface_name`, in registry order.
    pub fn siblings<'a>(
        &'a self,
        interface_name: &'a str,
    ) -> impl Iterator<Item = &'a DeploymentRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| r.interface_name == interface_name)
    }

    /// Records grouped by interface, groups in first-seen order.
    pub fn groups(&self) -> Vec<InterfaceGroup<'_>> {
        let mut groups: Vec<InterfaceGroup<'_>> = Vec::new();
        for record in &self.records {
            match groups
                .iter_mut()
                .find(|g| g.interface_name == record.interface_name)
            {
                Some(group) => group.deployments.push(record),
                None => groups.push(InterfaceGroup {
                    interface_name: &record.interface_name,
                    deployments: vec![record],
                }),
            }
        }
        groups
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a DeploymentRecord;
    type IntoIter = std::slice::Iter<'a, DeploymentRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Deployments of a single interface, borrowed from a [`Registry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceGroup<'a> {
    pub interface_name: &'a str,
    pub deployments: Vec<&'a DeploymentRecord>,
}

#[cfg(test)]
pub(crate) fn record(key: &str, iface: &str, name: &str, addr: &str) -> DeploymentRecord {
    DeploymentRecord {
        key: key.to_string(),
        interface_name: iface.to_string(),
        display_name: name.to_string(),
        address: addr.to_string(),
    }
}

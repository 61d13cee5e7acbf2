//! Contract registry loader and development console.
//!
//! This crate binds the deployments listed in a `contracts.json` registry to dynamic contract
//! proxies keyed by short names, derives Solidity interface sources from the same ABIs, and
//! drives an interactive console over the bound contracts.

pub mod abi;
pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod interface;
pub mod loader;
pub mod provider;
pub mod proxy;
pub mod registry;
pub mod repl;
pub mod session;

pub use error::{LoaderError, Result};
pub use loader::{ContractLoader, ContractTable};
pub use registry::{DeploymentRecord, Registry};

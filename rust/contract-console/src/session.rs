//! Chain session: connection to the development node and network resets

use std::sync::LazyLock;

use alloy::{
    primitives::Address,
    providers::{DynProvider, Provider},
    transports::http::reqwest::Url,
};
use anyhow::Context;
use regex::Regex;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::{
    config::NetworkConfig,
    provider::{build_provider, build_read_only_provider},
};

static FORK_BLOCK_ARG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"--fork-block-number[ =](\d+)").expect("fork block pattern is valid")
});

/// Block number passed to the node via `--fork-block-number`, if any.
pub fn fork_block_from_cmd(cmd: &str) -> Option<u64> {
    FORK_BLOCK_ARG
        .captures(cmd)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Parameters of a `hardhat_reset` request.
///
/// Without a fork URL the node is reset to a fresh chain; otherwise it re-forks `fork_url`,
/// pinned at `block_number` when given.
pub fn reset_params(fork_url: Option<&str>, block_number: Option<u64>) -> Value {
    let Some(url) = fork_url else {
        return json!([]);
    };
    let mut forking = json!({ "jsonRpcUrl": url });
    if let Some(block) = block_number {
        forking["blockNumber"] = json!(block);
    }
    json!([{ "forking": forking }])
}

/// Whether a node with this `web3_clientVersion` understands `hardhat_reset`.
pub fn supports_reset(client_version: &str) -> bool {
    let version = client_version.to_ascii_lowercase();
    version.contains("hardhat") || version.contains("anvil")
}

/// Fork point a reset returns to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForkSettings {
    pub fork_url: Option<String>,
    pub fork_block_number: Option<u64>,
    /// Command the node was launched with, searched for `--fork-block-number`
    pub launch_cmd: Option<String>,
}

impl ForkSettings {
    pub fn from_config(config: &NetworkConfig) -> Self {
        Self {
            fork_url: config.fork_url.clone(),
            fork_block_number: config.fork_block_number,
            launch_cmd: config.launch_cmd.clone(),
        }
    }

    /// Block to pin the fork at: `explicit`, then the configured block, then the one in the
    /// launch command. Always `None` without a fork URL.
    pub fn block_number(&self, explicit: Option<u64>) -> Option<u64> {
        self.fork_url.as_ref()?;
        explicit
            .or(self.fork_block_number)
            .or_else(|| self.launch_cmd_block())
    }

    pub fn reset_params(&self, explicit: Option<u64>) -> Value {
        reset_params(self.fork_url.as_deref(), self.block_number(explicit))
    }

    fn launch_cmd_block(&self) -> Option<u64> {
        let cmd = self.launch_cmd.as_deref()?;
        let block = fork_block_from_cmd(cmd);
        if block.is_none() {
            warn!(cmd, "could not parse block number from launch command");
        }
        block
    }
}

/// Connection to the node the console binds contracts against.
pub trait Session {
    fn is_connected(&self) -> bool;

    /// Provider of the live connection, `None` before [`Session::connect`].
    fn provider(&self) -> Option<&DynProvider>;

    fn connect(&mut self) -> impl Future<Output = anyhow::Result<()>>;

    /// Reset the network to its fork point. Resolves to `false` when the node does not
    /// support resets and nothing was done.
    fn reset(&self, fork_block_number: Option<u64>) -> impl Future<Output = anyhow::Result<bool>>;

    fn accounts(&self) -> impl Future<Output = anyhow::Result<Vec<Address>>>;
}

/// [`Session`] over JSON-RPC to a development node, owned by the caller.
pub struct ChainSession {
    config: NetworkConfig,
    fork: ForkSettings,
    provider: Option<DynProvider>,
}

impl ChainSession {
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            fork: ForkSettings::from_config(&config),
            config,
            provider: None,
        }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn fork(&self) -> &ForkSettings {
        &self.fork
    }

    fn connected(&self) -> anyhow::Result<&DynProvider> {
        self.provider.as_ref().context("session is not connected")
    }
}

impl Session for ChainSession {
    fn is_connected(&self) -> bool {
        self.provider.is_some()
    }

    fn provider(&self) -> Option<&DynProvider> {
        self.provider.as_ref()
    }

    /// Connect to the configured RPC endpoint and check that it answers.
    async fn connect(&mut self) -> anyhow::Result<()> {
        let url: Url = self
            .config
            .rpc_url
            .parse()
            .with_context(|| format!("invalid rpc url `{}`", self.config.rpc_url))?;

        let provider = match &self.config.mnemonic {
            Some(mnemonic) => build_provider(mnemonic.clone(), self.config.account_index, url)?,
            None => build_read_only_provider(url),
        };
        let chain_id = provider.get_chain_id().await.map_err(|err| {
            error!(?err, rpc_url = %self.config.rpc_url, "session failed to connect");
            err
        })?;
        info!(chain_id, rpc_url = %self.config.rpc_url, "connected");

        self.provider = Some(provider);
        Ok(())
    }

    /// Reset the node to its fork point, or to a fresh chain without a fork.
    async fn reset(&self, fork_block_number: Option<u64>) -> anyhow::Result<bool> {
        let provider = self.connected()?;

        let client_version = provider.get_client_version().await?;
        if !supports_reset(&client_version) {
            warn!(%client_version, "skipping network reset, node is neither Hardhat nor Anvil");
            return Ok(false);
        }

        let params = self.fork.reset_params(fork_block_number);
        info!(%params, "resetting network");
        provider
            .raw_request::<_, Value>("hardhat_reset".into(), params)
            .await
            .context("hardhat_reset failed")?;
        Ok(true)
    }

    async fn accounts(&self) -> anyhow::Result<Vec<Address>> {
        Ok(self.connected()?.get_accounts().await?)
    }
}

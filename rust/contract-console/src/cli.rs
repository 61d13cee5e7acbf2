//! Command-line interface of the `contract-console` binary

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::config::ConsoleConfig;

#[derive(Debug, Parser)]
#[command(name = "contract-console")]
#[command(about = "Bind deployed contracts from a registry and explore them interactively")]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to ./console.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding contracts.json and the ABI files
    #[arg(long, global = true)]
    pub abi_dir: Option<PathBuf>,

    /// Directory receiving generated interface sources
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// RPC endpoint of the development node
    #[arg(long, global = true, env = "CONTRACT_CONSOLE_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the contracts in the registry
    List,

    /// Write one interface source file per interface in the registry
    Generate,

    /// Bind every contract and start the interactive console
    Console {
        /// Skip interface generation on reload
        #[arg(long)]
        no_generate: bool,
    },
}

impl Cli {
    /// Apply command-line overrides on top of the file configuration.
    pub fn apply(&self, config: &mut ConsoleConfig) {
        if let Some(dir) = &self.abi_dir {
            config.abi_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(url) = &self.rpc_url {
            config.network.rpc_url = url.clone();
        }
        if let Commands::Console { no_generate: true } = self.command {
            config.generate_on_reload = false;
        }
    }

    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

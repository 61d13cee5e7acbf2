//! Console state and commands
//!
//! The console owns everything the interactive session needs (configuration, chain session
//! and contract loader) and exposes the bound contracts by key. Nothing here is global: the
//! caller creates a [`Console`], reloads it and feeds it command lines.

use std::fs;

use alloy::{
    dyn_abi::{DynSolValue, Specifier},
    json_abi::{Function, JsonAbi},
    primitives::hex,
    providers::DynProvider,
};
use anyhow::{Context, anyhow, bail};
use tracing::info;

use crate::{
    config::ConsoleConfig,
    interface::SolInterfaceGenerator,
    loader::ContractLoader,
    proxy::{ContractProxy, ProviderProxyFactory},
    session::{ChainSession, Session},
};

pub type Proxy = ContractProxy<DynProvider>;
pub type ConsoleLoader = ContractLoader<Proxy>;

const HELP: &str = "\
Commands:
  contracts                      list the loaded contracts
  show <key>                     address and functions of a contract
  call <key> <fn> [args..]       call a read-only function
  send <key> <fn> [args..]       send a transaction and wait for the receipt
  accounts                       accounts managed by the node
  reload [--persist] [block]     reload contracts, resetting the network unless --persist
  reset [block]                  reset the network to its fork point
  help                           show this message
  exit | quit                    leave the console";

/// A parsed console command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Contracts,
    Show {
        key: String,
    },
    Call {
        key: String,
        function: String,
        args: Vec<String>,
    },
    Send {
        key: String,
        function: String,
        args: Vec<String>,
    },
    Accounts,
    Reload {
        persist: bool,
        block: Option<u64>,
    },
    Reset {
        block: Option<u64>,
    },
    Help,
    Exit,
}

impl ConsoleCommand {
    /// Parse a command line; arguments may be quoted.
    pub fn parse(input: &str) -> anyhow::Result<Self> {
        let parts = shlex::split(input).ok_or_else(|| anyhow!("unbalanced quotes"))?;
        let Some((cmd, rest)) = parts.split_first() else {
            bail!("empty command");
        };

        let invocation = |name: &str| -> anyhow::Result<(String, String, Vec<String>)> {
            match rest {
                [key, function, args @ ..] => Ok((key.clone(), function.clone(), args.to_vec())),
                _ => bail!("usage: {name} <key> <function> [args..]"),
            }
        };

        match cmd.as_str() {
            "contracts" | "ls" => Ok(Self::Contracts),
            "show" => match rest {
                [key] => Ok(Self::Show { key: key.clone() }),
                _ => bail!("usage: show <key>"),
            },
            "call" => {
                let (key, function, args) = invocation("call")?;
                Ok(Self::Call {
                    key,
                    function,
                    args,
                })
            }
            "send" => {
                let (key, function, args) = invocation("send")?;
                Ok(Self::Send {
                    key,
                    function,
                    args,
                })
            }
            "accounts" => Ok(Self::Accounts),
            "reload" => {
                let persist = rest.iter().any(|arg| arg == "--persist");
                let block = rest
                    .iter()
                    .find(|arg| *arg != "--persist")
                    .map(|arg| parse_block(arg))
                    .transpose()?;
                Ok(Self::Reload { persist, block })
            }
            "reset" => {
                let block = rest.first().map(|arg| parse_block(arg)).transpose()?;
                Ok(Self::Reset { block })
            }
            "help" => Ok(Self::Help),
            "exit" | "quit" => Ok(Self::Exit),
            other => bail!("unknown command '{other}'. Type 'help' for available commands."),
        }
    }
}

fn parse_block(arg: &str) -> anyhow::Result<u64> {
    arg.parse()
        .with_context(|| format!("invalid block number `{arg}`"))
}

/// Pick the overload of `function` taking `args.len()` inputs and coerce each argument to its
/// ABI type.
pub fn encode_args<'a>(
    abi: &'a JsonAbi,
    function: &str,
    args: &[String],
) -> anyhow::Result<(&'a Function, Vec<DynSolValue>)> {
    let overloads = abi
        .function(function)
        .with_context(|| format!("no function `{function}`"))?;
    let func = overloads
        .iter()
        .find(|f| f.inputs.len() == args.len())
        .with_context(|| {
            let arities: Vec<_> = overloads.iter().map(|f| f.inputs.len().to_string()).collect();
            format!(
                "`{function}` takes {} argument(s), got {}",
                arities.join(" or "),
                args.len()
            )
        })?;

    let values = func
        .inputs
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            let ty = param.resolve()?;
            ty.coerce_str(arg).with_context(|| {
                format!("invalid {} `{}`: {arg}", ty.sol_type_name(), param.name)
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok((func, values))
}

/// Human-readable rendering of a decoded value.
pub fn format_value(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Address(addr) => addr.to_checksum(None),
        DynSolValue::Bool(b) => b.to_string(),
        DynSolValue::Int(i, _) => i.to_string(),
        DynSolValue::Uint(u, _) => u.to_string(),
        DynSolValue::String(s) => format!("{s:?}"),
        DynSolValue::Bytes(bytes) => hex::encode_prefixed(bytes),
        DynSolValue::FixedBytes(word, size) => hex::encode_prefixed(&word[..*size]),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) => {
            format!("[{}]", join_values(items))
        }
        DynSolValue::Tuple(items) => format!("({})", join_values(items)),
        other => format!("{other:?}"),
    }
}

fn join_values(items: &[DynSolValue]) -> String {
    items.iter().map(format_value).collect::<Vec<_>>().join(", ")
}

/// Interactive console state, owned by the caller.
pub struct Console<S = ChainSession> {
    config: ConsoleConfig,
    session: S,
    loader: Option<ConsoleLoader>,
}

impl Console {
    pub fn new(config: ConsoleConfig) -> Self {
        let session = ChainSession::new(config.network.clone());
        Self::with_session(config, session)
    }
}

impl<S: Session> Console<S> {
    pub fn with_session(config: ConsoleConfig, session: S) -> Self {
        Self {
            config,
            session,
            loader: None,
        }
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn loader(&self) -> Option<&ConsoleLoader> {
        self.loader.as_ref()
    }

    /// Names resolvable in the console, in registry order.
    pub fn namespace(&self) -> impl Iterator<Item = (&str, &Proxy)> {
        self.loader
            .iter()
            .filter_map(|loader| loader.contract_table())
            .flat_map(|table| table.iter())
    }

    pub fn contract(&self, key: &str) -> anyhow::Result<&Proxy> {
        let loader = self.loaded()?;
        Ok(loader.get(key)?)
    }

    fn loaded(&self) -> anyhow::Result<&ConsoleLoader> {
        self.loader
            .as_ref()
            .context("contracts are not loaded, run `reload`")
    }

    /// Reload the registry and rebind every contract, then run the startup script.
    ///
    /// Connects if the session is not connected yet; otherwise resets the network unless
    /// `persist_network`. The previous contracts stay available if any step fails.
    pub async fn reload(
        &mut self,
        persist_network: bool,
        fork_block_number: Option<u64>,
    ) -> anyhow::Result<()> {
        let mut loader = ConsoleLoader::new(&self.config.abi_dir)?;
        if self.config.generate_on_reload {
            loader.generate_interfaces(
                &SolInterfaceGenerator,
                &self.config.output_dir,
                &self.config.source_extension,
            )?;
        }

        if !self.session.is_connected() {
            self.session.connect().await?;
        } else if !persist_network {
            self.session.reset(fork_block_number).await?;
        }

        let provider = self
            .session
            .provider()
            .context("session is not connected")?
            .clone();
        loader.build_contract_table(&ProviderProxyFactory::new(provider))?;

        println!();
        loader.print_loaded_contract_info();
        println!("These are available as local variables now.\n");
        self.loader = Some(loader);

        self.run_startup_script().await
    }

    /// Run the configured startup script, one command per line. `#` starts a comment.
    pub async fn run_startup_script(&self) -> anyhow::Result<()> {
        let path = self.config.startup_script.clone();
        if !path.is_file() {
            return Ok(());
        }
        let script = fs::read_to_string(&path)
            .with_context(|| format!("failed to read startup script {}", path.display()))?;
        info!(path = %path.display(), "running startup script");

        for (lineno, line) in script.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let cmd = ConsoleCommand::parse(line)
                .and_then(|cmd| match cmd {
                    ConsoleCommand::Reload { .. } | ConsoleCommand::Exit => {
                        bail!("`{line}` is not allowed in the startup script")
                    }
                    cmd => Ok(cmd),
                })
                .with_context(|| format!("{}:{}", path.display(), lineno + 1))?;
            self.execute_local(cmd)
                .await
                .with_context(|| format!("{}:{}", path.display(), lineno + 1))?;
        }
        Ok(())
    }

    /// Execute one command line. Returns `true` when the console should exit.
    pub async fn execute_line(&mut self, line: &str) -> anyhow::Result<bool> {
        match ConsoleCommand::parse(line)? {
            ConsoleCommand::Exit => Ok(true),
            ConsoleCommand::Reload { persist, block } => {
                self.reload(persist, block).await?;
                Ok(false)
            }
            cmd => {
                self.execute_local(cmd).await?;
                Ok(false)
            }
        }
    }

    /// Commands that leave the loaded contracts in place.
    async fn execute_local(&self, cmd: ConsoleCommand) -> anyhow::Result<()> {
        match cmd {
            ConsoleCommand::Help => println!("{HELP}"),
            ConsoleCommand::Contracts => self.loaded()?.print_loaded_contract_info(),
            ConsoleCommand::Show { key } => {
                let proxy = self.contract(&key)?;
                println!("{key} = {proxy}");
                for function in proxy.abi().functions() {
                    println!("    {}", function.full_signature());
                }
            }
            ConsoleCommand::Call {
                key,
                function,
                args,
            } => {
                let output = self.call(&key, &function, &args).await?;
                match output.as_slice() {
                    [] => println!("()"),
                    [value] => println!("{}", format_value(value)),
                    values => println!("{}", format_value(&DynSolValue::Tuple(values.to_vec()))),
                }
            }
            ConsoleCommand::Send {
                key,
                function,
                args,
            } => self.send(&key, &function, &args).await?,
            ConsoleCommand::Accounts => {
                for (i, account) in self.session.accounts().await?.iter().enumerate() {
                    println!("{i}: {}", account.to_checksum(None));
                }
            }
            ConsoleCommand::Reset { block } => {
                if !self.session.reset(block).await? {
                    println!("node does not support resets, nothing done");
                }
            }
            ConsoleCommand::Reload { .. } | ConsoleCommand::Exit => {
                bail!("command must be handled by the console loop")
            }
        }
        Ok(())
    }

    /// Call a read-only function of the contract bound to `key`.
    pub async fn call(
        &self,
        key: &str,
        function: &str,
        args: &[String],
    ) -> anyhow::Result<Vec<DynSolValue>> {
        let proxy = self.contract(key)?;
        let (func, values) = encode_args(proxy.abi(), function, args)?;
        let output = proxy
            .instance()
            .function_from_selector(&func.selector(), &values)?
            .call()
            .await?;
        Ok(output)
    }

    async fn send(&self, key: &str, function: &str, args: &[String]) -> anyhow::Result<()> {
        let proxy = self.contract(key)?;
        let (func, values) = encode_args(proxy.abi(), function, args)?;
        let pending = proxy
            .instance()
            .function_from_selector(&func.selector(), &values)?
            .send()
            .await?;
        let tx_hash = *pending.tx_hash();
        info!(%tx_hash, "waiting for tx to be mined");
        println!("Transaction sent: {tx_hash}");

        let receipt = pending.get_receipt().await?;
        info!(%receipt.gas_used, %tx_hash, "tx mined");
        println!(
            "  status: {}, block: {}, gas used: {}",
            if receipt.status() { "success" } else { "reverted" },
            receipt
                .block_number
                .map_or_else(|| "pending".to_string(), |n| n.to_string()),
            receipt.gas_used
        );
        Ok(())
    }
}

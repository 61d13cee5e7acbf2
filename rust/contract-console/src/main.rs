use anyhow::Result;
use clap::Parser;
use contract_console::{
    cli::{Cli, Commands},
    config::ConsoleConfig,
    console::{Console, ConsoleLoader},
    interface::SolInterfaceGenerator,
    repl,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn initialize_tracing(level: &str) {
    let fallback_filter = format!("contract_console={level}");
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| fallback_filter.into());

    if std::env::var("CONTRACT_CONSOLE_JSON").is_ok() {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true);
        tracing_subscriber::registry()
            .with(filter)
            .with(json_layer)
            .init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true);
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_tracing(cli.log_level());

    let mut config = ConsoleConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    match cli.command {
        Commands::List => {
            ConsoleLoader::new(&config.abi_dir)?.print_loaded_contract_info();
        }
        Commands::Generate => {
            let loader = ConsoleLoader::new(&config.abi_dir)?;
            let written = loader.generate_interfaces(
                &SolInterfaceGenerator,
                &config.output_dir,
                &config.source_extension,
            )?;
            for path in written {
                println!("{}", path.display());
            }
        }
        Commands::Console { .. } => {
            let mut console = Console::new(config);
            console.reload(false, None).await?;
            repl::run(&mut console).await?;
        }
    }
    Ok(())
}

//! cosmos-fundraiser: donate BTC or ETH to the Cosmos fundraiser.
//!
//! Without a command, runs the interactive contribution flow. With one,
//! runs that offline command; see `cfr_app::commands` for the table.

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use cfr_app::settings::{BitcoinNetwork, LogFormat};
use cfr_app::{
    dispatch, CommandError, Contribution, FlowError, Services, Session, Settings, TerminalPrompter,
};
use clap::Parser;

/// Cosmos fundraiser wallet and contribution tool.
#[derive(Parser)]
#[command(name = "cosmos-fundraiser")]
#[command(version, about = "Donate BTC or ETH to the Cosmos fundraiser.")]
struct Cli {
    /// Config file (default: <config dir>/cosmos-fundraiser/config.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Wallet file used by the interactive flow.
    #[arg(short, long)]
    wallet: Option<PathBuf>,

    /// Use Bitcoin testnet addresses and endpoints.
    #[arg(long)]
    testnet: bool,

    /// Log format written to stderr (text or json).
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// Offline command to run. Omit for the interactive flow.
    command: Option<String>,

    /// Arguments for the command.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = ?err, "exiting with failure");
            // Command and flow errors already carry their causes.
            if err.is::<CommandError>() || err.is::<FlowError>() {
                println!("{err}");
            } else {
                println!("Error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut settings =
        Settings::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(path) = cli.wallet {
        settings.wallet_path = path;
    }
    if cli.testnet {
        settings.bitcoin.network = BitcoinNetwork::Testnet;
    }
    if let Some(format) = cli.log_format {
        settings.logging.format = format;
    }
    init_logging(&settings.logging.level, settings.logging.format);

    let services = Services::from_settings(&settings).context("failed to set up network clients")?;

    match cli.command {
        Some(name) => {
            let stdin = io::stdin();
            let interactive = stdin.is_terminal();
            let mut input = stdin.lock();
            let mut output = io::stdout();
            let mut session = Session {
                settings: &settings,
                services: &services,
                input: &mut input,
                output: &mut output,
                interactive,
            };
            dispatch(&mut session, &name, &cli.args).await?;
        }
        None => {
            let mut prompter = TerminalPrompter::stdio();
            let outcome = Contribution::new(&settings, &services, &mut prompter)
                .run()
                .await?;
            tracing::info!(?outcome, "contribution finished");
        }
    }
    Ok(())
}

/// Logs go to stderr so stdout carries only command output.
fn init_logging(level: &str, format: LogFormat) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(io::stderr))
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(io::stderr),
            )
            .init(),
    }
}

//! Offline command table.
//!
//! Each command reads its own arguments and seed material, writes its
//! result to the session output, and reports failures as a
//! [`CommandError`] for the binary to print. Nothing here exits the
//! process.

use std::fmt;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::str::FromStr;

use bitcoin::Network;
use cfr_core::constants::sat_to_btc;
use cfr_core::error::GatewayError;
use cfr_core::types::{Chain, Utxo};
use cfr_wallet::builder::{self, parse_address};
use cfr_wallet::lifecycle::{self, LifecycleError};
use cfr_wallet::{ethereum, mnemonic, shares, Seed, SeedKind, Wallet, WalletError};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::settings::Settings;
use crate::Services;

pub const BTCADDRESS_USAGE: &str = "Usage: cosmos-fundraiser btcaddress [walletSeedFile] < walletSeed";

pub const GENWALLET_USAGE: &str = "\
Usage: cosmos-fundraiser genwallet [--words <12|15|18|21|24>] [--entropy <text>]

  '--entropy' mixes extra randomness of your own (dice rolls, typing)
  into the generated phrase";

pub const COSMOSADDRESS_USAGE: &str =
    "Usage: cosmos-fundraiser cosmosaddress [--verbose] [walletSeedFile] < walletSeed";

pub const GETUTXOS_USAGE: &str = "Usage: cosmos-fundraiser getutxos <bitcoinAddress>";

pub const BUILDTX_USAGE: &str = "\
Usage:
  cosmos-fundraiser buildtx <bitcoinAddress> [feeRate]

  'feeRate' is used to calculate the Bitcoin transaction fee,
  measured in satoshis per byte";

pub const SIGNTX_USAGE: &str = "Usage: cosmos-fundraiser signtx <txHex> [walletSeedFile] < walletSeed";

pub const BROADCASTTX_USAGE: &str = "Usage: cosmos-fundraiser broadcasttx <txHex>";

pub const CONSTRUCTANDSIGNTX_USAGE: &str = "\
Usage:
  cosmos-fundraiser constructandsigntx <walletSeedFile> <utxosFile> [feeRate]

  'utxosFile' holds a JSON array of {\"txid\", \"vout\", \"value\"} objects";

pub const ETHTX_USAGE: &str = "Usage: cosmos-fundraiser ethtx [walletSeedFile] < walletSeed";

pub const SPLITSEED_USAGE: &str = "\
Usage: cosmos-fundraiser splitseed [threshold] [shares] < walletSeed

  Prints one share per line. Any 'threshold' of them rebuild the seed
  with joinseed. Defaults to 2 of 3.";

pub const JOINSEED_USAGE: &str = "Usage: cosmos-fundraiser joinseed < shares";

/// Printed by `buildtx` when the address holds nothing to spend.
pub const NO_UNSPENT_OUTPUTS: &str = "\
Address has no unspent outputs

Please send some BTC to your intermediate address, then run this
command again.";

/// Errors returned by [`dispatch`].
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("\"{0}\" is not a valid command")]
    InvalidCommand(String),

    /// Missing or invalid arguments; carries the usage text.
    #[error("{0}")]
    Usage(&'static str),

    /// Seed material could not be read or parsed.
    #[error("error: {source}\n{usage}")]
    Seed {
        #[source]
        source: LifecycleError,
        usage: &'static str,
    },

    #[error("{}", NO_UNSPENT_OUTPUTS)]
    NoUnspentOutputs,

    #[error("cannot read {path}: {reason}")]
    InputFile { path: String, reason: String },

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("output error: {0}")]
    Output(#[from] io::Error),
}

/// Every offline command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Status,
    GenWallet,
    BtcAddress,
    CosmosAddress,
    GetUtxos,
    BuildTx,
    SignTx,
    BroadcastTx,
    ConstructAndSignTx,
    EthTx,
    SplitSeed,
    JoinSeed,
}

impl Command {
    pub const ALL: [Command; 12] = [
        Command::Status,
        Command::GenWallet,
        Command::BtcAddress,
        Command::CosmosAddress,
        Command::GetUtxos,
        Command::BuildTx,
        Command::SignTx,
        Command::BroadcastTx,
        Command::ConstructAndSignTx,
        Command::EthTx,
        Command::SplitSeed,
        Command::JoinSeed,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Command::Status => "status",
            Command::GenWallet => "genwallet",
            Command::BtcAddress => "btcaddress",
            Command::CosmosAddress => "cosmosaddress",
            Command::GetUtxos => "getutxos",
            Command::BuildTx => "buildtx",
            Command::SignTx => "signtx",
            Command::BroadcastTx => "broadcasttx",
            Command::ConstructAndSignTx => "constructandsigntx",
            Command::EthTx => "ethtx",
            Command::SplitSeed => "splitseed",
            Command::JoinSeed => "joinseed",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| CommandError::InvalidCommand(s.to_string()))
    }
}

/// Streams and collaborators for one command invocation.
pub struct Session<'a> {
    pub settings: &'a Settings,
    pub services: &'a Services,
    pub input: &'a mut dyn BufRead,
    pub output: &'a mut dyn Write,
    /// Input is a terminal: prompt for seeds and read a single line.
    pub interactive: bool,
}

/// Look up `name` and run it with `args`.
pub async fn dispatch(
    session: &mut Session<'_>,
    name: &str,
    args: &[String],
) -> Result<(), CommandError> {
    let command: Command = name.parse()?;
    tracing::debug!(%command, args = args.len(), "dispatching");
    let arg = |i: usize| args.get(i).map(String::as_str);

    match command {
        Command::Status => status(session).await,
        Command::GenWallet => genwallet(session, args),
        Command::BtcAddress => btcaddress(session, arg(0)),
        Command::CosmosAddress => cosmosaddress(session, args),
        Command::GetUtxos => getutxos(session, arg(0)).await,
        Command::BuildTx => buildtx(session, arg(0), arg(1)).await,
        Command::SignTx => signtx(session, arg(0), arg(1)),
        Command::BroadcastTx => broadcasttx(session, arg(0)).await,
        Command::ConstructAndSignTx => constructandsigntx(session, arg(0), arg(1), arg(2)),
        Command::EthTx => ethtx(session, arg(0)),
        Command::SplitSeed => splitseed(session, arg(0), arg(1)),
        Command::JoinSeed => joinseed(session),
    }
}

impl Session<'_> {
    fn network(&self) -> Network {
        self.settings.bitcoin.network.network()
    }

    fn print(&mut self, text: &str) -> Result<(), CommandError> {
        writeln!(self.output, "{text}")?;
        Ok(())
    }

    /// Seed from `path`, else from the session input.
    fn read_seed(&mut self, path: Option<&str>) -> Result<Seed, LifecycleError> {
        match path {
            Some(path) => lifecycle::read_seed_file(Path::new(path)),
            None if self.interactive => {
                lifecycle::read_seed(&mut *self.input, Some(&mut *self.output))
            }
            None => lifecycle::read_seed(&mut *self.input, None),
        }
    }

    fn read_wallet(&mut self, path: Option<&str>, usage: &'static str) -> Result<Wallet, CommandError> {
        let network = self.network();
        self.read_seed(path)
            .and_then(|seed| Wallet::derive(seed, network).map_err(LifecycleError::from))
            .map_err(|source| CommandError::Seed { source, usage })
    }
}

async fn status(session: &mut Session<'_>) -> Result<(), CommandError> {
    let status = session.services.status.fetch_status().await?;
    let shown = if status.fundraiser_ended {
        serde_json::to_value(&status)
    } else {
        Ok(serde_json::json!({ "fundraiserEnded": false }))
    };
    let text = shown
        .and_then(|v| serde_json::to_string_pretty(&v))
        .map_err(|e| WalletError::Serialization(e.to_string()))?;
    session.print(&text)
}

fn genwallet(session: &mut Session<'_>, args: &[String]) -> Result<(), CommandError> {
    let usage = || CommandError::Usage(GENWALLET_USAGE);
    let mut words = mnemonic::GENERATED_WORDS;
    let mut extra = None;
    let mut rest = args.iter();
    while let Some(flag) = rest.next() {
        match flag.as_str() {
            "--words" => {
                words = rest
                    .next()
                    .and_then(|w| w.parse::<usize>().ok())
                    .filter(|w| mnemonic::entropy_len(*w).is_some())
                    .ok_or_else(usage)?;
            }
            "--entropy" => extra = Some(rest.next().ok_or_else(usage)?.as_str()),
            _ => return Err(usage()),
        }
    }

    let phrase = Zeroizing::new(mnemonic::generate_mnemonic_with(words, extra)?);
    tracing::debug!(words, mixed = extra.is_some(), "generated mnemonic");
    if session.interactive {
        let warning = format!("!!!WARNING!!! Do NOT forget these {words} words.");
        session.print(&warning)?;
        session.print(&phrase)?;
        return session.print(&warning);
    }
    session.print(&phrase)
}

fn btcaddress(session: &mut Session<'_>, path: Option<&str>) -> Result<(), CommandError> {
    let wallet = session.read_wallet(path, BTCADDRESS_USAGE)?;
    session.print(wallet.address(Chain::Bitcoin))
}

fn cosmosaddress(session: &mut Session<'_>, args: &[String]) -> Result<(), CommandError> {
    let mut verbose = false;
    let mut path = None;
    for arg in args {
        match arg.as_str() {
            "--verbose" | "-v" => verbose = true,
            flag if flag.starts_with('-') => return Err(CommandError::Usage(COSMOSADDRESS_USAGE)),
            file if path.is_none() => path = Some(file),
            _ => return Err(CommandError::Usage(COSMOSADDRESS_USAGE)),
        }
    }

    let wallet = session.read_wallet(path, COSMOSADDRESS_USAGE)?;
    session.print(wallet.address(Chain::Cosmos))?;
    session.print(&wallet.cosmos_bech32()?)?;
    session.print(&wallet.cosmos_pub_bech32()?)?;
    if verbose {
        for line in key_diagnostics(wallet.cosmos_public_key()) {
            session.print(&line)?;
        }
    }
    Ok(())
}

/// Hash chain from the Cosmos public key to its account hash.
fn key_diagnostics(public_key: &[u8; 33]) -> [String; 3] {
    use bitcoin::hashes::{ripemd160, sha256, Hash};
    let sha = sha256::Hash::hash(public_key);
    let ripe = ripemd160::Hash::hash(sha.as_byte_array());
    [
        format!("Cosmos Public Key: 0x{}", hex::encode_upper(public_key)),
        format!("Sha256(Cosmos Public Key): 0x{}", hex::encode_upper(sha.as_byte_array())),
        format!("Ripemd160(Sha256(Cosmos Public Key)): 0x{}", hex::encode_upper(ripe.as_byte_array())),
    ]
}

async fn getutxos(session: &mut Session<'_>, address: Option<&str>) -> Result<(), CommandError> {
    let address = address.ok_or(CommandError::Usage(GETUTXOS_USAGE))?;
    parse_address(address, session.network()).map_err(|_| CommandError::Usage(GETUTXOS_USAGE))?;
    let utxos = session.services.bitcoin.fetch_utxos(address).await?;
    let text = serde_json::to_string_pretty(&utxos)
        .map_err(|e| WalletError::Serialization(e.to_string()))?;
    session.print(&text)
}

fn parse_fee_rate(
    raw: Option<&str>,
    default: u64,
    usage: &'static str,
) -> Result<u64, CommandError> {
    match raw {
        None => Ok(default),
        Some(s) => match s.parse::<u64>() {
            Ok(rate) if rate > 0 => Ok(rate),
            _ => Err(CommandError::Usage(usage)),
        },
    }
}

async fn buildtx(
    session: &mut Session<'_>,
    address: Option<&str>,
    fee_rate: Option<&str>,
) -> Result<(), CommandError> {
    let address = address.ok_or(CommandError::Usage(BUILDTX_USAGE))?;
    let network = session.network();
    parse_address(address, network).map_err(|_| CommandError::Usage(BUILDTX_USAGE))?;
    let fee_rate = parse_fee_rate(fee_rate, session.settings.bitcoin.default_fee_rate, BUILDTX_USAGE)?;

    let utxos = session.services.bitcoin.fetch_utxos(address).await?;
    if utxos.is_empty() {
        return Err(CommandError::NoUnspentOutputs);
    }

    let exodus = parse_address(&session.settings.bitcoin.exodus_address, network)?;
    let final_tx = builder::create_final_tx(&utxos, fee_rate, &exodus)?;
    tracing::info!(
        address,
        fee_rate,
        fee = final_tx.fee_amount,
        paid = final_tx.paid_amount,
        "built unsigned transaction"
    );
    session.print(&final_tx.to_hex())
}

fn signtx(
    session: &mut Session<'_>,
    tx_hex: Option<&str>,
    path: Option<&str>,
) -> Result<(), CommandError> {
    let tx_hex = tx_hex.ok_or(CommandError::Usage(SIGNTX_USAGE))?;
    let tx = builder::decode_tx(tx_hex)?;
    let wallet = session.read_wallet(path, SIGNTX_USAGE)?;
    let signed = builder::sign_final_tx(&wallet, tx)?;
    session.print(&builder::encode_tx(&signed))
}

async fn broadcasttx(session: &mut Session<'_>, tx_hex: Option<&str>) -> Result<(), CommandError> {
    let tx_hex = tx_hex.ok_or(CommandError::Usage(BROADCASTTX_USAGE))?;
    builder::decode_tx(tx_hex)?;
    let txid = session.services.bitcoin.push_tx(tx_hex.trim()).await?;
    session.print(&txid)
}

fn constructandsigntx(
    session: &mut Session<'_>,
    wallet_path: Option<&str>,
    utxos_path: Option<&str>,
    fee_rate: Option<&str>,
) -> Result<(), CommandError> {
    let (Some(wallet_path), Some(utxos_path)) = (wallet_path, utxos_path) else {
        return Err(CommandError::Usage(CONSTRUCTANDSIGNTX_USAGE));
    };
    let fee_rate = parse_fee_rate(
        fee_rate,
        session.settings.bitcoin.default_fee_rate,
        CONSTRUCTANDSIGNTX_USAGE,
    )?;
    let wallet = session.read_wallet(Some(wallet_path), CONSTRUCTANDSIGNTX_USAGE)?;
    let utxos = read_utxos(Path::new(utxos_path))?;
    if utxos.is_empty() {
        return Err(CommandError::NoUnspentOutputs);
    }

    let exodus = parse_address(&session.settings.bitcoin.exodus_address, session.network())?;
    let final_tx = builder::create_final_tx(&utxos, fee_rate, &exodus)?;
    let signed = builder::sign_final_tx(&wallet, final_tx.tx)?;
    tracing::info!(
        inputs = utxos.len(),
        fee_rate,
        paid_btc = sat_to_btc(final_tx.paid_amount),
        "signed offline transaction"
    );
    session.print(&builder::encode_tx(&signed))
}

fn read_utxos(path: &Path) -> Result<Vec<Utxo>, CommandError> {
    let input_error = |reason: String| CommandError::InputFile {
        path: path.display().to_string(),
        reason,
    };
    let text = fs::read_to_string(path).map_err(|e| input_error(e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| input_error(e.to_string()))
}

fn ethtx(session: &mut Session<'_>, path: Option<&str>) -> Result<(), CommandError> {
    let wallet = session.read_wallet(path, ETHTX_USAGE)?;
    let eth = &session.settings.ethereum;
    let record = ethereum::wallet_donation(&wallet, &eth.fundraiser_contract, eth.gas_limit);
    let text = ethereum::to_pretty_json(&record)?;
    session.print(&text)
}

fn splitseed(
    session: &mut Session<'_>,
    threshold: Option<&str>,
    count: Option<&str>,
) -> Result<(), CommandError> {
    let parse = |raw: Option<&str>, default: u8| match raw {
        None => Ok(default),
        Some(s) => s.parse::<u8>().map_err(|_| CommandError::Usage(SPLITSEED_USAGE)),
    };
    let threshold = parse(threshold, shares::DEFAULT_THRESHOLD)?;
    let count = parse(count, shares::DEFAULT_SHARES)?;
    if threshold < 2 || threshold > count {
        return Err(CommandError::Usage(SPLITSEED_USAGE));
    }

    let seed = session
        .read_seed(None)
        .map_err(|source| CommandError::Seed { source, usage: SPLITSEED_USAGE })?;
    let lines = Zeroizing::new(shares::split_seed(&seed, threshold, count)?);
    for line in lines.iter() {
        session.print(line)?;
    }
    Ok(())
}

fn joinseed(session: &mut Session<'_>) -> Result<(), CommandError> {
    let mut lines = Zeroizing::new(Vec::new());
    if session.interactive {
        writeln!(session.output, "Enter seed shares, one per line, then an empty line:")?;
        session.output.flush()?;
    }
    let input = &mut *session.input;
    for line in input.lines() {
        let line = line?;
        if session.interactive && line.trim().is_empty() {
            break;
        }
        lines.push(line);
    }
    if lines.iter().all(|l| l.trim().is_empty()) {
        return Err(CommandError::Usage(JOINSEED_USAGE));
    }

    let seed = shares::join_seed(lines.as_slice())?;
    match (seed.kind(), seed.phrase()) {
        (SeedKind::Mnemonic, Some(phrase)) => session.print(phrase),
        _ => {
            let hex = seed.to_hex();
            session.print(hex.as_str())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_command_parses_by_name() {
        for command in Command::ALL {
            assert_eq!(command.name().parse::<Command>().unwrap(), command);
        }
    }

    #[test]
    fn unknown_command_message() {
        let err = "frobnicate".parse::<Command>().unwrap_err();
        assert_eq!(err.to_string(), "\"frobnicate\" is not a valid command");
    }

    #[test]
    fn names_are_case_sensitive() {
        assert!("BuildTx".parse::<Command>().is_err());
    }

    #[test]
    fn fee_rate_parsing() {
        assert_eq!(parse_fee_rate(None, 300, BUILDTX_USAGE).unwrap(), 300);
        assert_eq!(parse_fee_rate(Some("400"), 300, BUILDTX_USAGE).unwrap(), 400);
        assert!(matches!(
            parse_fee_rate(Some("0"), 300, BUILDTX_USAGE),
            Err(CommandError::Usage(_))
        ));
        assert!(matches!(
            parse_fee_rate(Some("fast"), 300, BUILDTX_USAGE),
            Err(CommandError::Usage(_))
        ));
    }

    #[test]
    fn seed_error_shows_cause_then_usage() {
        let err = CommandError::Seed {
            source: LifecycleError::Wallet(WalletError::InvalidMnemonic(
                "Mnemonic must be at least 12 words".into(),
            )),
            usage: BTCADDRESS_USAGE,
        };
        assert_eq!(
            err.to_string(),
            "error: Mnemonic must be at least 12 words\n\
             Usage: cosmos-fundraiser btcaddress [walletSeedFile] < walletSeed"
        );
    }

    #[test]
    fn key_diagnostics_end_at_account_hash() {
        let public_key: [u8; 33] = hex::decode(
            "024f4e2ad99c34d60b9ba6283c9431a8418af8673212961f97a77b6377fcd05b62",
        )
        .unwrap()
        .try_into()
        .unwrap();
        let [key, sha, ripe] = key_diagnostics(&public_key);
        assert_eq!(
            key,
            "Cosmos Public Key: 0x024F4E2AD99C34D60B9BA6283C9431A8418AF8673212961F97A77B6377FCD05B62"
        );
        assert_eq!(
            sha,
            "Sha256(Cosmos Public Key): 0x4916960E9ED5440A85FD688C1F5856F4DC4297C5C924703F1E0BE0504DAAA087"
        );
        assert_eq!(
            ripe,
            "Ripemd160(Sha256(Cosmos Public Key)): 0x28FF5C6D57D8CFD492B6FB42614536ED648E01FD"
        );
    }

    #[test]
    fn no_unspent_outputs_text() {
        assert!(CommandError::NoUnspentOutputs
            .to_string()
            .starts_with("Address has no unspent outputs\n\n"));
    }
}

//! Shared fixtures and in-memory collaborators.

use std::collections::{HashMap, VecDeque};
use std::io::{self, Cursor};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cfr_app::settings::Settings;
use cfr_app::{dispatch, CommandError, Services, Session};
use cfr_core::error::GatewayError;
use cfr_core::traits::{BitcoinGateway, EthereumGateway, Prompter, StatusSource};
use cfr_core::types::{FundraiserStatus, PaymentEvent, Utxo};
use cfr_wallet::{builder, encryption, store, Seed};

/// BIP-39 test vector phrase.
pub const ABANDON: &str = "abandon abandon abandon abandon abandon abandon \
                           abandon abandon abandon abandon abandon about";

/// Bitcoin address derived from [`ABANDON`].
pub const ABANDON_BTC: &str = "1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA";

/// Cosmos account (hex) derived from [`ABANDON`].
pub const ABANDON_COSMOS: &str = "28ff5c6d57d8cfd492b6fb42614536ed648e01fd";

/// Bech32 Cosmos public key derived from [`ABANDON`].
pub const ABANDON_COSMOSPUB: &str =
    "cosmospub1qf85u2kens6dvzum5c5re9p34pqc47r8xgffv8uh5aakxalu6pdkyndk036";

pub const FUNDED_TXID: &str = "e9a66845e05d5abc0ad04ec80f774a7e585c6e8db975962d069a522137b80c1d";

/// Unsigned donation spending [`funded_utxos`] at 100 sat/byte.
pub const UNSIGNED_HEX_100: &str = "\
01000000011d0cb83721529a062d9675b98d6e5c587e4a770fc84ed00abc5a5de04568a6e9\
0100000000ffffffff014c3001000000000017a914784d32249f013d32cb460d496ce8b709\
454972418700000000";

/// Ethereum descriptor for [`ABANDON`] with the default contract and gas.
pub const ABANDON_ETHTX: &str = r#"{
  "from": "0x9858effd232b4033e47d90003d41ec34ecaeda94",
  "to": "0xcf965cfe7c30323e9c9e41d4e398e2167506f764",
  "gas": 150000,
  "data": "0x00362a9500000000000000000000000028ff5c6d57d8cfd492b6fb42614536ed648e01fd"
}"#;

pub const PASSWORD: &str = "correct horse battery staple";

/// One 100 000 sat output.
pub fn funded_utxos() -> Vec<Utxo> {
    vec![Utxo {
        txid: FUNDED_TXID.into(),
        vout: 1,
        value: 100_000,
        script: None,
    }]
}

/// Default settings with the wallet file inside `dir`.
pub fn settings_in(dir: &Path) -> Settings {
    Settings {
        wallet_path: dir.join("cosmos_fundraiser.wallet"),
        ..Settings::default()
    }
}

/// Write a wallet file holding the [`ABANDON`] seed under [`PASSWORD`].
pub fn write_abandon_wallet(path: &Path) {
    let seed = Seed::from_mnemonic(ABANDON).unwrap();
    let encrypted = encryption::encrypt_seed(&seed, PASSWORD).unwrap();
    store::write_wallet(path, &encrypted).unwrap();
}

// ---------------------------------------------------------------------------
// Bitcoin
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct BitcoinState {
    pub utxos: HashMap<String, Vec<Utxo>>,
    pub fee_rate: u64,
    pub push_error: Option<GatewayError>,
    pub pushed: Vec<String>,
    pub utxo_fetches: Vec<String>,
    pub fee_fetches: usize,
}

/// In-memory [`BitcoinGateway`]. Clones share state.
#[derive(Clone, Default)]
pub struct MockBitcoin {
    state: Arc<Mutex<BitcoinState>>,
}

impl MockBitcoin {
    pub fn new() -> Self {
        let mock = Self::default();
        mock.state.lock().unwrap().fee_rate = 100;
        mock
    }

    pub fn with_utxos(self, address: &str, utxos: Vec<Utxo>) -> Self {
        self.state.lock().unwrap().utxos.insert(address.to_string(), utxos);
        self
    }

    pub fn with_fee_rate(self, rate: u64) -> Self {
        self.state.lock().unwrap().fee_rate = rate;
        self
    }

    pub fn failing_push(self, err: GatewayError) -> Self {
        self.state.lock().unwrap().push_error = Some(err);
        self
    }

    pub fn pushed(&self) -> Vec<String> {
        self.state.lock().unwrap().pushed.clone()
    }

    pub fn utxo_fetches(&self) -> Vec<String> {
        self.state.lock().unwrap().utxo_fetches.clone()
    }

    pub fn fee_fetches(&self) -> usize {
        self.state.lock().unwrap().fee_fetches
    }
}

#[async_trait]
impl BitcoinGateway for MockBitcoin {
    async fn fetch_utxos(&self, address: &str) -> Result<Vec<Utxo>, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.utxo_fetches.push(address.to_string());
        Ok(state.utxos.get(address).cloned().unwrap_or_default())
    }

    async fn fetch_fee_rate(&self) -> Result<u64, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.fee_fetches += 1;
        Ok(state.fee_rate)
    }

    async fn wait_for_payment(&self, address: &str) -> Result<PaymentEvent, GatewayError> {
        let utxos = self.fetch_utxos(address).await?;
        if utxos.is_empty() {
            // A real gateway would poll forever.
            return Err(GatewayError::Http(format!("no payment to {address}")));
        }
        Ok(PaymentEvent::from_utxos(address, utxos))
    }

    async fn push_tx(&self, tx_hex: &str) -> Result<String, GatewayError> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.push_error.clone() {
            return Err(err);
        }
        let tx = builder::decode_tx(tx_hex).map_err(|e| GatewayError::Status {
            status: 400,
            body: e.to_string(),
        })?;
        state.pushed.push(tx_hex.to_string());
        Ok(tx.compute_txid().to_string())
    }
}

// ---------------------------------------------------------------------------
// Ethereum and status
// ---------------------------------------------------------------------------

/// In-memory [`EthereumGateway`] returning a fixed rate.
#[derive(Clone)]
pub struct MockEthereum {
    rate: f64,
    contracts: Arc<Mutex<Vec<String>>>,
}

impl MockEthereum {
    pub fn new(rate: f64) -> Self {
        Self {
            rate,
            contracts: Arc::default(),
        }
    }

    /// Contracts the rate was requested for.
    pub fn queried(&self) -> Vec<String> {
        self.contracts.lock().unwrap().clone()
    }
}

#[async_trait]
impl EthereumGateway for MockEthereum {
    async fn fetch_atom_rate(&self, contract: &str) -> Result<f64, GatewayError> {
        self.contracts.lock().unwrap().push(contract.to_string());
        Ok(self.rate)
    }
}

/// [`StatusSource`] serving a fixed document.
pub struct MockStatus(pub serde_json::Value);

#[async_trait]
impl StatusSource for MockStatus {
    async fn fetch_status(&self) -> Result<FundraiserStatus, GatewayError> {
        serde_json::from_value(self.0.clone()).map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

pub fn services(bitcoin: &MockBitcoin, ethereum: &MockEthereum) -> Services {
    services_with_status(bitcoin, ethereum, serde_json::json!({ "fundraiserEnded": false }))
}

pub fn services_with_status(
    bitcoin: &MockBitcoin,
    ethereum: &MockEthereum,
    status: serde_json::Value,
) -> Services {
    Services {
        bitcoin: Box::new(bitcoin.clone()),
        ethereum: Box::new(ethereum.clone()),
        status: Box::new(MockStatus(status)),
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Run an offline command with `stdin` piped in. Returns the result and
/// everything written to stdout.
pub async fn run_command(
    settings: &Settings,
    services: &Services,
    name: &str,
    args: &[&str],
    stdin: &str,
) -> (Result<(), CommandError>, String) {
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    let mut input = Cursor::new(stdin.as_bytes().to_vec());
    let mut output = Vec::new();
    let result = {
        let mut session = Session {
            settings,
            services,
            input: &mut input,
            output: &mut output,
            interactive: false,
        };
        dispatch(&mut session, name, &args).await
    };
    (result, String::from_utf8(output).unwrap())
}

// ---------------------------------------------------------------------------
// Prompter
// ---------------------------------------------------------------------------

/// A scripted answer.
#[derive(Debug, Clone)]
pub enum Answer {
    Password(String),
    Confirm(bool),
    Select(usize),
}

impl Answer {
    pub fn password(p: &str) -> Self {
        Answer::Password(p.to_string())
    }
}

/// [`Prompter`] replaying a script and recording every line shown.
///
/// Running out of answers reads as end of input.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<Answer>,
    pub transcript: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            transcript: Vec::new(),
        }
    }

    pub fn text(&self) -> String {
        self.transcript.join("\n")
    }

    pub fn count(&self, needle: &str) -> usize {
        self.transcript.iter().filter(|l| l.contains(needle)).count()
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    fn next(&mut self, message: &str) -> io::Result<Answer> {
        self.transcript.push(message.to_string());
        self.answers.pop_front().ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, format!("no answer for {message:?}"))
        })
    }
}

fn unexpected(message: &str, answer: &Answer) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("prompt {message:?} got scripted {answer:?}"),
    )
}

impl Prompter for ScriptedPrompter {
    fn say(&mut self, text: &str) -> io::Result<()> {
        self.transcript.push(text.to_string());
        Ok(())
    }

    fn password(&mut self, message: &str) -> io::Result<String> {
        match self.next(message)? {
            Answer::Password(p) => Ok(p),
            other => Err(unexpected(message, &other)),
        }
    }

    fn confirm(&mut self, message: &str, _default: bool) -> io::Result<bool> {
        match self.next(message)? {
            Answer::Confirm(b) => Ok(b),
            other => Err(unexpected(message, &other)),
        }
    }

    fn select(&mut self, message: &str, choices: &[&str]) -> io::Result<usize> {
        match self.next(message)? {
            Answer::Select(i) if i < choices.len() => Ok(i),
            other => Err(unexpected(message, &other)),
        }
    }
}

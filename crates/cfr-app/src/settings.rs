//! Layered configuration.
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. a TOML file (`--config`, else `<config dir>/cosmos-fundraiser/config.toml`
//!    when present)
//! 3. `CFR_`-prefixed environment variables, `__` between sections
//!    (`CFR_BITCOIN__ESPLORA_URL`)

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bitcoin::Network;
use cfr_core::constants::{
    DEFAULT_EXODUS_ADDRESS, DEFAULT_FEE_RATE, DEFAULT_GAS_LIMIT, DEFAULT_WALLET_PATH,
    FUNDRAISER_CONTRACT,
};
use cfr_gateway::{esplora, ethereum, status};
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

/// Campaign site hosting the donation terms.
pub const DEFAULT_TERMS_URL: &str = "https://fundraiser.cosmos.network";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "CFR";

/// Which Bitcoin network addresses and the gateway target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BitcoinNetwork {
    #[default]
    Bitcoin,
    Testnet,
}

impl BitcoinNetwork {
    pub fn network(self) -> Network {
        match self {
            BitcoinNetwork::Bitcoin => Network::Bitcoin,
            BitcoinNetwork::Testnet => Network::Testnet,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other} (expected text or json)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BitcoinSettings {
    pub network: BitcoinNetwork,
    /// Esplora base URL; the public instance for `network` when unset.
    pub esplora_url: Option<String>,
    /// Campaign address receiving the donations.
    pub exodus_address: String,
    /// Fee rate for `buildtx` and `constructandsigntx` without an explicit one.
    pub default_fee_rate: u64,
    /// Fixed fee rate for the interactive flow. The live estimate when unset.
    pub fee_rate: Option<u64>,
    pub fee_target_blocks: u32,
    pub poll_interval_secs: u64,
}

impl Default for BitcoinSettings {
    fn default() -> Self {
        Self {
            network: BitcoinNetwork::Bitcoin,
            esplora_url: None,
            exodus_address: DEFAULT_EXODUS_ADDRESS.to_string(),
            default_fee_rate: DEFAULT_FEE_RATE,
            fee_rate: None,
            fee_target_blocks: esplora::DEFAULT_FEE_TARGET_BLOCKS,
            poll_interval_secs: esplora::DEFAULT_POLL_INTERVAL.as_secs(),
        }
    }
}

impl BitcoinSettings {
    pub fn esplora_url(&self) -> &str {
        match (&self.esplora_url, self.network) {
            (Some(url), _) => url,
            (None, BitcoinNetwork::Bitcoin) => esplora::DEFAULT_MAINNET_URL,
            (None, BitcoinNetwork::Testnet) => esplora::DEFAULT_TESTNET_URL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EthereumSettings {
    pub rpc_url: String,
    pub fundraiser_contract: String,
    pub gas_limit: u64,
}

impl Default for EthereumSettings {
    fn default() -> Self {
        Self {
            rpc_url: ethereum::DEFAULT_RPC_URL.to_string(),
            fundraiser_contract: FUNDRAISER_CONTRACT.to_string(),
            gas_limit: DEFAULT_GAS_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive; `RUST_LOG` wins when set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Everything the commands and the interactive flow read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub wallet_path: PathBuf,
    pub status_url: String,
    /// Where the Terms of Service and Donation Agreement are published.
    pub terms_url: String,
    pub bitcoin: BitcoinSettings,
    pub ethereum: EthereumSettings,
    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            wallet_path: PathBuf::from(DEFAULT_WALLET_PATH),
            status_url: status::DEFAULT_STATUS_URL.to_string(),
            terms_url: DEFAULT_TERMS_URL.to_string(),
            bitcoin: BitcoinSettings::default(),
            ethereum: EthereumSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Default location of the optional config file.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cosmos-fundraiser").join("config.toml"))
}

impl Settings {
    /// Load from the default sources and the process environment.
    ///
    /// An explicit `config_file` must exist; the default one is optional.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_from(config_file, default_config_path().as_deref(), None)
    }

    /// Load with an explicit environment map instead of the process one.
    pub fn load_from(
        config_file: Option<&Path>,
        fallback_file: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        match (config_file, fallback_file) {
            (Some(path), _) => {
                builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
            }
            (None, Some(path)) => {
                builder =
                    builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
            }
            (None, None) => {}
        }
        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()?;
        tracing::debug!(?settings, "settings loaded");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env() -> Option<HashMap<String, String>> {
        Some(HashMap::new())
    }

    #[test]
    fn defaults_without_sources() {
        let s = Settings::load_from(None, None, no_env()).unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.bitcoin.default_fee_rate, 300);
        assert_eq!(s.bitcoin.fee_rate, None);
        assert_eq!(s.ethereum.gas_limit, 150_000);
        assert_eq!(s.logging.level, "warn");
        assert_eq!(s.wallet_path, PathBuf::from("./cosmos_fundraiser.wallet"));
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
wallet_path = "/tmp/donor.wallet"

[bitcoin]
network = "testnet"
fee_rate = 42

[logging]
format = "json"
"#,
        )
        .unwrap();

        let s = Settings::load_from(Some(&path), None, no_env()).unwrap();
        assert_eq!(s.wallet_path, PathBuf::from("/tmp/donor.wallet"));
        assert_eq!(s.bitcoin.network, BitcoinNetwork::Testnet);
        assert_eq!(s.bitcoin.fee_rate, Some(42));
        assert_eq!(s.bitcoin.default_fee_rate, 300);
        assert_eq!(s.bitcoin.esplora_url(), esplora::DEFAULT_TESTNET_URL);
        assert_eq!(s.logging.format, LogFormat::Json);
    }

    #[test]
    fn env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[bitcoin]\ndefault_fee_rate = 400\n").unwrap();

        let env = HashMap::from([
            ("CFR_BITCOIN__DEFAULT_FEE_RATE".to_string(), "500".to_string()),
            ("CFR_BITCOIN__ESPLORA_URL".to_string(), "http://localhost:3002".to_string()),
        ]);
        let s = Settings::load_from(Some(&path), None, Some(env)).unwrap();
        assert_eq!(s.bitcoin.default_fee_rate, 500);
        assert_eq!(s.bitcoin.esplora_url(), "http://localhost:3002");
    }

    #[test]
    fn missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(Settings::load_from(Some(&missing), None, no_env()).is_err());
    }

    #[test]
    fn missing_fallback_file_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let s = Settings::load_from(None, Some(&missing), no_env()).unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn log_format_parse() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}

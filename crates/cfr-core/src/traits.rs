//! Trait interfaces for the fundraiser collaborators.
//!
//! These traits define the seams between crates:
//! - [`BitcoinGateway`]: UTXO lookup, fee estimation, payment watching and
//!   broadcast (cfr-gateway implements)
//! - [`EthereumGateway`]: ATOM/ETH exchange rate (cfr-gateway implements)
//! - [`StatusSource`]: campaign status (cfr-gateway implements)
//! - [`Prompter`]: interactive user input (cfr-app implements)
//!
//! The flows depend only on these traits, so tests swap in in-memory
//! versions.

use std::io;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::types::{FundraiserStatus, PaymentEvent, Utxo};

/// Bitcoin network access.
#[async_trait]
pub trait BitcoinGateway: Send + Sync {
    /// Spendable outputs currently held by `address`. Not cached.
    async fn fetch_utxos(&self, address: &str) -> Result<Vec<Utxo>, GatewayError>;

    /// Current network fee rate in satoshis per byte.
    async fn fetch_fee_rate(&self) -> Result<u64, GatewayError>;

    /// Suspend until `address` has received a payment.
    ///
    /// No timeout: callers cancel out of band.
    async fn wait_for_payment(&self, address: &str) -> Result<PaymentEvent, GatewayError>;

    /// Submit a signed transaction, returning its txid.
    async fn push_tx(&self, tx_hex: &str) -> Result<String, GatewayError>;
}

/// Ethereum network access.
#[async_trait]
pub trait EthereumGateway: Send + Sync {
    /// ATOM credited per ETH by the fundraiser contract at `contract`.
    async fn fetch_atom_rate(&self, contract: &str) -> Result<f64, GatewayError>;
}

/// Source of the campaign status document.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self) -> Result<FundraiserStatus, GatewayError>;
}

/// Interactive user input.
///
/// Every user-visible line of the interactive flows goes through
/// [`say`](Self::say), so a scripted implementation can capture it.
pub trait Prompter {
    /// Show a message.
    fn say(&mut self, text: &str) -> io::Result<()>;

    /// Read a secret without echo.
    fn password(&mut self, message: &str) -> io::Result<String>;

    /// Ask a yes/no question.
    fn confirm(&mut self, message: &str, default: bool) -> io::Result<bool>;

    /// Pick one of `choices`, returning its index.
    fn select(&mut self, message: &str, choices: &[&str]) -> io::Result<usize>;
}

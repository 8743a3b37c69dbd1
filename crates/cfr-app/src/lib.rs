//! # cfr-app
//! Application layer of the Cosmos fundraiser tool.
//!
//! - [`commands`]: offline command table (`buildtx`, `signtx`, ...)
//! - [`online`]: interactive contribution flow
//! - [`prompt`]: terminal [`Prompter`](cfr_core::traits::Prompter)
//! - [`settings`]: layered configuration

pub mod commands;
pub mod online;
pub mod prompt;
pub mod settings;

pub use commands::{dispatch, Command, CommandError, Session};
pub use online::{Contribution, FlowError, Gate, Outcome, Receipt, Stage};
pub use prompt::TerminalPrompter;
pub use settings::Settings;

use std::time::Duration;

use cfr_core::error::GatewayError;
use cfr_core::traits::{BitcoinGateway, EthereumGateway, StatusSource};
use cfr_gateway::{EsploraGateway, EthRpcClient, HttpStatusSource};

/// Network collaborators shared by the commands and the interactive flow.
pub struct Services {
    pub bitcoin: Box<dyn BitcoinGateway>,
    pub ethereum: Box<dyn EthereumGateway>,
    pub status: Box<dyn StatusSource>,
}

impl Services {
    /// HTTP-backed collaborators for the configured endpoints.
    pub fn from_settings(settings: &Settings) -> Result<Self, GatewayError> {
        let btc = &settings.bitcoin;
        tracing::debug!(
            esplora = btc.esplora_url(),
            eth_rpc = %settings.ethereum.rpc_url,
            status = %settings.status_url,
            "connecting gateways"
        );
        let bitcoin = EsploraGateway::new(btc.esplora_url())?
            .with_fee_target(btc.fee_target_blocks)
            .with_poll_interval(Duration::from_secs(btc.poll_interval_secs));
        Ok(Self {
            bitcoin: Box::new(bitcoin),
            ethereum: Box::new(EthRpcClient::new(&settings.ethereum.rpc_url)?),
            status: Box::new(HttpStatusSource::new(&settings.status_url)?),
        })
    }
}

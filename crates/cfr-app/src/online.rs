//! Interactive contribution flow.
//!
//! One run walks a single donation through its stages:
//!
//! ```text
//! Init -> WalletReady -> CurrencySelected
//!   BTC: AwaitingPayment -> PaymentReceived -> FeeComputed
//!        -> AgreementConfirmed -> Broadcasting -> Done
//!   ETH: Done
//! ```
//!
//! Declining either consent gate ends the run with
//! [`Outcome::Declined`]; it is not an error and nothing is sent. A failed
//! broadcast is returned as [`FlowError::Broadcast`] and never retried.

use std::fmt;
use std::io;

use cfr_core::constants::{sat_to_btc, ATOMS_PER_BTC, MINIMUM_AMOUNT, MIN_DONATION_ETH};
use cfr_core::error::GatewayError;
use cfr_core::traits::Prompter;
use cfr_core::types::{Chain, DonationRecord, PaymentEvent};
use cfr_wallet::builder::{self, parse_address};
use cfr_wallet::lifecycle::{self, LifecycleError, LifecycleOptions};
use cfr_wallet::{ethereum, Wallet, WalletError};
use thiserror::Error;

use crate::settings::Settings;
use crate::Services;

pub const BANNER: &str = r#"
 .d8888b.   .d88888b.   .d8888b.  888b     d888  .d88888b.   .d8888b.
d88P  Y88b d88P" "Y88b d88P  Y88b 8888b   d8888 d88P" "Y88b d88P  Y88b
888    888 888     888 Y88b.      88888b.d88888 888     888 Y88b.
888        888     888  "Y888b.   888Y88888P888 888     888  "Y888b.
888        888     888     "Y88b. 888 Y888P 888 888     888     "Y88b.
888    888 888     888       "888 888  Y8P  888 888     888       "888
Y88b  d88P Y88b. .d88P Y88b  d88P 888   "   888 Y88b. .d88P Y88b  d88P
 "Y8888P"   "Y88888P"   "Y8888P"  888       888  "Y88888P"   "Y8888P"
"#;

pub const WELCOME: &str = "\
Welcome to the Cosmos Fundraiser!

Thank you for your interest in donating funds for the development of The Cosmos Network.
Let's get started!
";

pub const CURRENCY_PROMPT: &str = "Which currency will you make your donation in?";

pub const TERMS_PROMPT: &str =
    "Have you read and understand the Terms of Service and Donation Agreement?";

pub const FINALIZE_PROMPT: &str =
    "Finalize contribution? You will NOT be able undo this transaction:";

/// Position in the contribution state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    WalletReady,
    CurrencySelected,
    AwaitingPayment,
    PaymentReceived,
    FeeComputed,
    AgreementConfirmed,
    Broadcasting,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::WalletReady => "wallet_ready",
            Stage::CurrencySelected => "currency_selected",
            Stage::AwaitingPayment => "awaiting_payment",
            Stage::PaymentReceived => "payment_received",
            Stage::FeeComputed => "fee_computed",
            Stage::AgreementConfirmed => "agreement_confirmed",
            Stage::Broadcasting => "broadcasting",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    Btc,
    Eth,
}

impl Currency {
    pub const CHOICES: [&'static str; 2] = ["BTC", "ETH"];

    /// Currency at index `choice` of [`Self::CHOICES`].
    pub fn from_choice(choice: usize) -> Option<Self> {
        match choice {
            0 => Some(Currency::Btc),
            1 => Some(Currency::Eth),
            _ => None,
        }
    }
}

/// A consent question the donor can decline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    TermsOfService,
    FinalConfirmation,
}

/// What a finished donation produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Receipt {
    Bitcoin {
        txid: String,
        paid_amount: u64,
        fee_amount: u64,
    },
    Ethereum(DonationRecord),
}

/// How a run ended without error.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed(Receipt),
    Declined(Gate),
}

/// Errors that end a run.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The signed transaction was rejected or its fate is unknown.
    #[error("broadcast failed: {0}")]
    Broadcast(GatewayError),

    #[error("input error: {0}")]
    Prompt(#[from] io::Error),
}

/// One interactive donation.
pub struct Contribution<'a> {
    settings: &'a Settings,
    services: &'a Services,
    prompter: &'a mut dyn Prompter,
    lifecycle: LifecycleOptions,
    stage: Stage,
}

impl<'a> Contribution<'a> {
    pub fn new(settings: &'a Settings, services: &'a Services, prompter: &'a mut dyn Prompter) -> Self {
        Self {
            settings,
            services,
            prompter,
            lifecycle: LifecycleOptions {
                network: settings.bitcoin.network.network(),
                max_attempts: None,
            },
            stage: Stage::Init,
        }
    }

    /// Give up unlocking after `attempts` wrong passwords.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.lifecycle.max_attempts = Some(attempts);
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn advance(&mut self, next: Stage) {
        tracing::info!(from = %self.stage, stage = %next, "contribution stage");
        self.stage = next;
    }

    pub async fn run(&mut self) -> Result<Outcome, FlowError> {
        self.prompter.say(BANNER)?;
        self.prompter.say(WELCOME)?;

        let wallet = lifecycle::create_or_load(
            &self.settings.wallet_path,
            &mut *self.prompter,
            self.lifecycle,
        )?;
        self.advance(Stage::WalletReady);

        let choice = self.prompter.select(CURRENCY_PROMPT, &Currency::CHOICES)?;
        let currency = Currency::from_choice(choice).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("currency choice {choice} out of range"),
            )
        })?;
        tracing::info!(?currency, "currency selected");
        self.advance(Stage::CurrencySelected);

        match currency {
            Currency::Btc => self.donate_bitcoin(&wallet).await,
            Currency::Eth => self.donate_ethereum(&wallet).await,
        }
    }

    async fn wait_for_payment(&mut self, address: &str) -> Result<PaymentEvent, FlowError> {
        self.prompter.say(&format!(
            "\nExchange rate: 1 BTC : {ATOMS_PER_BTC} ATOM\n\
             Minimum donation: {} BTC\n\n\
             Your intermediate Bitcoin address is:\n{address}\n\n\
             Send BTC to this address to continue with your contribution.\n\
             This address is owned by you, so you can get the coins back if you\n\
             change your mind.\n",
            sat_to_btc(MINIMUM_AMOUNT)
        ))?;
        self.prompter.say("Waiting for a transaction...")?;
        self.advance(Stage::AwaitingPayment);

        let payment = self.services.bitcoin.wait_for_payment(address).await?;
        self.prompter.say(&format!("Got payment of {} BTC", sat_to_btc(payment.amount)))?;
        if payment.amount < MINIMUM_AMOUNT {
            tracing::warn!(amount = payment.amount, minimum = MINIMUM_AMOUNT, "payment below minimum");
        }
        self.advance(Stage::PaymentReceived);
        Ok(payment)
    }

    async fn fee_rate(&mut self) -> Result<u64, FlowError> {
        if let Some(rate) = self.settings.bitcoin.fee_rate {
            tracing::debug!(rate, "using configured fee rate");
            return Ok(rate);
        }
        self.prompter.say("Fetching BTC transaction fee rate...")?;
        Ok(self.services.bitcoin.fetch_fee_rate().await?)
    }

    async fn donate_bitcoin(&mut self, wallet: &Wallet) -> Result<Outcome, FlowError> {
        let address = wallet.address(Chain::Bitcoin).to_string();
        let payment = self.wait_for_payment(&address).await?;

        let fee_rate = self.fee_rate().await?;
        let exodus = parse_address(&self.settings.bitcoin.exodus_address, wallet.network())?;
        let final_tx = builder::create_final_tx(&payment.utxos, fee_rate, &exodus)?;
        tracing::info!(
            fee_rate,
            fee = final_tx.fee_amount,
            paid = final_tx.paid_amount,
            "donation transaction built"
        );
        self.advance(Stage::FeeComputed);

        self.prompter.say(&format!(
            "\nReady to finalize contribution:\n  \
             Donating: {} BTC\n  \
             Bitcoin transaction fee: {} BTC\n  \
             Atom Equivalent: {} ATOM\n  \
             Cosmos address: {}\n",
            sat_to_btc(final_tx.paid_amount),
            sat_to_btc(final_tx.fee_amount),
            final_tx.atom_amount,
            wallet.address(Chain::Cosmos),
        ))?;

        if !self.prompter.confirm(TERMS_PROMPT, false)? {
            self.prompter.say(&format!(
                "\nYou can read the Terms of Service and Donation Agreement here:\n{}\n",
                self.settings.terms_url
            ))?;
            tracing::info!(gate = ?Gate::TermsOfService, "donor declined");
            return Ok(Outcome::Declined(Gate::TermsOfService));
        }
        self.advance(Stage::AgreementConfirmed);

        if !self.prompter.confirm(FINALIZE_PROMPT, false)? {
            tracing::info!(gate = ?Gate::FinalConfirmation, "donor declined");
            return Ok(Outcome::Declined(Gate::FinalConfirmation));
        }

        let paid_amount = final_tx.paid_amount;
        let fee_amount = final_tx.fee_amount;
        let signed = builder::sign_final_tx(wallet, final_tx.tx)?;
        let txid = signed.compute_txid().to_string();

        self.advance(Stage::Broadcasting);
        self.prompter.say("Broadcasting transaction...")?;
        let reported = self
            .services
            .bitcoin
            .push_tx(&builder::encode_tx(&signed))
            .await
            .map_err(FlowError::Broadcast)?;
        if reported != txid {
            tracing::warn!(%txid, %reported, "gateway reported a different txid");
        }
        self.prompter.say("Transaction sent!")?;
        self.prompter.say(&format!("Bitcoin TXID: {txid}"))?;
        self.prompter.say("Thank you for participating in the Cosmos fundraiser!")?;
        self.advance(Stage::Done);

        Ok(Outcome::Completed(Receipt::Bitcoin {
            txid,
            paid_amount,
            fee_amount,
        }))
    }

    async fn donate_ethereum(&mut self, wallet: &Wallet) -> Result<Outcome, FlowError> {
        let settings = self.settings;
        let eth = &settings.ethereum;
        let record = ethereum::wallet_donation(wallet, &eth.fundraiser_contract, eth.gas_limit);

        self.prompter.say("Fetching ATOM/ETH exchange rate...")?;
        let rate = self
            .services
            .ethereum
            .fetch_atom_rate(&eth.fundraiser_contract)
            .await?;
        let json = ethereum::to_pretty_json(&record)?;

        self.prompter.say(&format!(
            "\nExchange rate: 1 ETH : {rate} ATOM\n\
             Minimum donation: {MIN_DONATION_ETH} ETH\n\
             Your Cosmos address: {}\n\n\
             Here's your donation transaction:\n{json}\n\n\
             To make your donation, copy and paste this information into a wallet\n\
             such as MyEtherWallet or Mist. Be sure to include an amount of ETH to\n\
             donate! Your Cosmos address is included in the data, and the donation\n\
             will be recorded for that address in the smart contract.\n\n\
             Thank you for participating in the Cosmos Fundraiser!\n",
            wallet.address(Chain::Cosmos),
        ))?;
        self.advance(Stage::Done);

        Ok(Outcome::Completed(Receipt::Ethereum(record)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names() {
        assert_eq!(Stage::AwaitingPayment.to_string(), "awaiting_payment");
        assert_eq!(Stage::Done.as_str(), "done");
    }

    #[test]
    fn broadcast_error_keeps_gateway_message() {
        let err = FlowError::Broadcast(GatewayError::Status {
            status: 400,
            body: "bad-txns-inputs-missingorspent".into(),
        });
        assert!(err.to_string().starts_with("broadcast failed: "));
        assert!(err.to_string().contains("bad-txns-inputs-missingorspent"));
    }

    #[test]
    fn currency_choices_order() {
        assert_eq!(Currency::CHOICES, ["BTC", "ETH"]);
        assert_eq!(Currency::from_choice(0), Some(Currency::Btc));
        assert_eq!(Currency::from_choice(1), Some(Currency::Eth));
        assert_eq!(Currency::from_choice(2), None);
    }
}

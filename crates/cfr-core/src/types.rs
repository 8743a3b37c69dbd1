//! Data types exchanged between the wallet, the gateways and the flows.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Chains a wallet derives an address for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Bitcoin,
    Ethereum,
    Cosmos,
}

impl Chain {
    /// Every supported chain, in derivation order.
    pub const ALL: [Chain; 3] = [Chain::Bitcoin, Chain::Ethereum, Chain::Cosmos];

    /// Lowercase identifier used in maps and output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Bitcoin => "bitcoin",
            Chain::Ethereum => "ethereum",
            Chain::Cosmos => "cosmos",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A spendable output owned by an address.
///
/// `txid` is in the usual display (reversed) byte order. `script` is the
/// hex locking script when the source reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    /// Value in satoshis.
    pub value: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

/// An incoming payment observed on the intermediate address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEvent {
    pub address: String,
    pub utxos: Vec<Utxo>,
    /// Total received, in satoshis.
    pub amount: u64,
}

impl PaymentEvent {
    /// Build an event from the outputs currently held by `address`.
    pub fn from_utxos(address: impl Into<String>, utxos: Vec<Utxo>) -> Self {
        let amount = utxos.iter().fold(0u64, |acc, u| acc.saturating_add(u.value));
        Self {
            address: address.into(),
            utxos,
            amount,
        }
    }
}

/// Unsigned Ethereum transaction shape for manual submission.
///
/// Field order is the order of the printed JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationRecord {
    pub from: String,
    pub to: String,
    pub gas: u64,
    pub data: String,
}

/// Campaign status document served by the fundraiser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundraiserStatus {
    pub fundraiser_ended: bool,
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

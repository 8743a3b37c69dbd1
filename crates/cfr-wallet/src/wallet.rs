//! In-memory wallet: a decrypted seed and the addresses derived from it.
//!
//! A [`Wallet`] is built right after a seed is generated, decrypted or read
//! from input. It lives for one process and is never serialized.

use std::collections::BTreeMap;

use bitcoin::secp256k1::{All, Secp256k1};
use bitcoin::{Address, Network, PrivateKey};
use cfr_core::types::Chain;

use crate::error::WalletError;
use crate::keys::{self, Seed};

/// Decrypted seed plus per-chain addresses.
pub struct Wallet {
    seed: Seed,
    network: Network,
    addresses: BTreeMap<Chain, String>,
    bitcoin_key: PrivateKey,
    bitcoin_address: Address,
    cosmos_public_key: [u8; 33],
    cosmos_account: [u8; 20],
    secp: Secp256k1<All>,
}

impl Wallet {
    /// Derive every chain's address from `seed`.
    ///
    /// Deterministic: the same seed and network give the same addresses.
    pub fn derive(seed: Seed, network: Network) -> Result<Self, WalletError> {
        let secp = Secp256k1::new();
        let bip32_seed = seed.to_bip32_seed()?;
        let kind = network.into();

        let bitcoin_key =
            keys::derive_key(&secp, &bip32_seed, keys::derivation_path(Chain::Bitcoin), kind)?;
        let bitcoin_address = Address::p2pkh(bitcoin_key.public_key(&secp).pubkey_hash(), kind);

        let eth_key =
            keys::derive_key(&secp, &bip32_seed, keys::derivation_path(Chain::Ethereum), kind)?;
        let cosmos_key =
            keys::derive_key(&secp, &bip32_seed, keys::derivation_path(Chain::Cosmos), kind)?;
        let cosmos_public_key = keys::cosmos_public_key(&secp, &cosmos_key);
        let cosmos_account = keys::cosmos_account(&cosmos_public_key);

        let mut addresses = BTreeMap::new();
        addresses.insert(Chain::Bitcoin, bitcoin_address.to_string());
        addresses.insert(Chain::Ethereum, keys::ethereum_address(&secp, &eth_key));
        addresses.insert(Chain::Cosmos, hex::encode(cosmos_account));

        tracing::debug!(
            network = %network,
            bitcoin = %bitcoin_address,
            "derived wallet addresses"
        );

        Ok(Self {
            seed,
            network,
            addresses,
            bitcoin_key,
            bitcoin_address,
            cosmos_public_key,
            cosmos_account,
            secp,
        })
    }

    pub fn seed(&self) -> &Seed {
        &self.seed
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Address string for `chain`.
    pub fn address(&self, chain: Chain) -> &str {
        self.addresses.get(&chain).map(String::as_str).unwrap_or_default()
    }

    /// Chain identifier to address, for every supported chain.
    pub fn addresses(&self) -> &BTreeMap<Chain, String> {
        &self.addresses
    }

    /// Intermediate P2PKH address that receives the donor's bitcoin.
    pub fn bitcoin_address(&self) -> &Address {
        &self.bitcoin_address
    }

    pub fn bitcoin_key(&self) -> &PrivateKey {
        &self.bitcoin_key
    }

    /// 20-byte Cosmos account credited with the donation.
    pub fn cosmos_account(&self) -> &[u8; 20] {
        &self.cosmos_account
    }

    /// `cosmos1...` display form of the Cosmos account.
    pub fn cosmos_bech32(&self) -> Result<String, WalletError> {
        keys::cosmos_bech32(&self.cosmos_account)
    }

    /// Compressed public key behind the Cosmos account.
    pub fn cosmos_public_key(&self) -> &[u8; 33] {
        &self.cosmos_public_key
    }

    /// `cosmospub1...` display form of the Cosmos public key.
    pub fn cosmos_pub_bech32(&self) -> Result<String, WalletError> {
        keys::cosmos_pub_bech32(&self.cosmos_public_key)
    }

    pub fn secp(&self) -> &Secp256k1<All> {
        &self.secp
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("network", &self.network)
            .field("addresses", &self.addresses)
            .finish_non_exhaustive()
    }
}

//! Ethereum donation descriptor.
//!
//! Donations go to the fundraiser contract's `donate(address)` method with
//! the donor's Cosmos account as argument. The descriptor is only printed;
//! the donor signs and sends it from their own Ethereum wallet.

use cfr_core::types::{Chain, DonationRecord};
use sha3::{Digest, Keccak256};

use crate::error::WalletError;
use crate::wallet::Wallet;

/// Four-byte selector of a Solidity function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Calldata for `donate(address)` with `account` as the argument.
pub fn donate_calldata(account: &[u8; 20]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 32);
    data.extend_from_slice(&selector("donate(address)"));
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(account);
    data
}

/// Parse a 20-byte account from hex, with or without `0x`.
pub fn parse_account(hex_str: &str) -> Result<[u8; 20], WalletError> {
    let trimmed = hex_str.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(digits)
        .map_err(|e| WalletError::InvalidAddress(format!("{hex_str}: {e}")))?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        WalletError::InvalidAddress(format!("{hex_str}: {} bytes, expected 20", b.len()))
    })
}

/// Descriptor donating from `eth_address` on behalf of `cosmos_account`.
pub fn donation_record(
    cosmos_account: &[u8; 20],
    eth_address: &str,
    contract: &str,
    gas: u64,
) -> DonationRecord {
    DonationRecord {
        from: eth_address.to_string(),
        to: contract.to_string(),
        gas,
        data: format!("0x{}", hex::encode(donate_calldata(cosmos_account))),
    }
}

/// Descriptor for a wallet's own Ethereum and Cosmos addresses.
pub fn wallet_donation(wallet: &Wallet, contract: &str, gas: u64) -> DonationRecord {
    donation_record(
        wallet.cosmos_account(),
        wallet.address(Chain::Ethereum),
        contract,
        gas,
    )
}

/// Pretty JSON with two-space indentation, fields in descriptor order.
pub fn to_pretty_json(record: &DonationRecord) -> Result<String, WalletError> {
    serde_json::to_string_pretty(record).map_err(|e| WalletError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::Network;
    use cfr_core::constants::{DEFAULT_GAS_LIMIT, FUNDRAISER_CONTRACT};

    use crate::keys::Seed;

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon \
                           abandon abandon abandon abandon abandon about";

    #[test]
    fn known_selectors() {
        assert_eq!(hex::encode(selector("donate(address)")), "00362a95");
        assert_eq!(hex::encode(selector("weiPerAtom()")), "574a5e31");
    }

    #[test]
    fn calldata_pads_account() {
        let data = donate_calldata(&[0xff; 20]);
        assert_eq!(data.len(), 36);
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(&data[16..], &[0xff; 20]);
    }

    #[test]
    fn parse_account_forms() {
        let a = parse_account("0x28ff5c6d57d8cfd492b6fb42614536ed648e01fd").unwrap();
        let b = parse_account("28ff5c6d57d8cfd492b6fb42614536ed648e01fd").unwrap();
        assert_eq!(a, b);
        assert!(parse_account("0x1234").is_err());
        assert!(parse_account("0xzz").is_err());
    }

    #[test]
    fn fixed_seed_descriptor_json() {
        let wallet = Wallet::derive(Seed::from_mnemonic(ABANDON).unwrap(), Network::Bitcoin).unwrap();
        let record = wallet_donation(&wallet, FUNDRAISER_CONTRACT, DEFAULT_GAS_LIMIT);
        let expected = r#"{
  "from": "0x9858effd232b4033e47d90003d41ec34ecaeda94",
  "to": "0xcf965cfe7c30323e9c9e41d4e398e2167506f764",
  "gas": 150000,
  "data": "0x00362a9500000000000000000000000028ff5c6d57d8cfd492b6fb42614536ed648e01fd"
}"#;
        assert_eq!(to_pretty_json(&record).unwrap(), expected);
    }
}

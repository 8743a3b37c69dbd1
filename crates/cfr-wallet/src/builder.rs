//! Bitcoin donation transaction construction and signing.
//!
//! The donation spends every output held by the intermediate address:
//! 1. [`create_final_tx`] builds an unsigned transaction paying
//!    `total - fee` to the campaign exodus address
//! 2. [`sign_final_tx`] appends an `OP_RETURN` output carrying the donor's
//!    Cosmos account and signs each input as legacy P2PKH
//!
//! Building needs no keys, so it can run on an online machine while
//! signing happens offline.

use std::str::FromStr;

use bitcoin::absolute::LockTime;
use bitcoin::address::NetworkUnchecked;
use bitcoin::consensus::encode;
use bitcoin::hashes::Hash;
use bitcoin::script::PushBytesBuf;
use bitcoin::secp256k1::Message;
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::{
    transaction, Address, Amount, Network, OutPoint, ScriptBuf, Sequence, Transaction, TxIn,
    TxOut, Txid, Witness,
};
use cfr_core::constants::atoms_for;
use cfr_core::types::Utxo;

use crate::error::WalletError;
use crate::wallet::Wallet;

/// scriptSig size assumed per input: push(72-byte signature) + push(33-byte key).
pub const SCRIPT_SIG_ESTIMATE: usize = 107;

/// An unsigned donation transaction and its display amounts.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalTransaction {
    pub tx: Transaction,
    /// Satoshis reaching the exodus address.
    pub paid_amount: u64,
    /// Network fee in satoshis.
    pub fee_amount: u64,
    /// ATOM credited for `paid_amount`. Display only.
    pub atom_amount: f64,
}

impl FinalTransaction {
    /// Hex encoding of the unsigned transaction.
    pub fn to_hex(&self) -> String {
        encode::serialize_hex(&self.tx)
    }
}

/// Parse an address and check it belongs to `network`.
pub fn parse_address(address: &str, network: Network) -> Result<Address, WalletError> {
    Address::<NetworkUnchecked>::from_str(address.trim())
        .map_err(|e| WalletError::InvalidAddress(format!("{address}: {e}")))?
        .require_network(network)
        .map_err(|e| WalletError::InvalidAddress(format!("{address}: {e}")))
}

/// Parse a hex-encoded transaction.
pub fn decode_tx(tx_hex: &str) -> Result<Transaction, WalletError> {
    let bytes = hex::decode(tx_hex.trim()).map_err(|e| WalletError::Decode(e.to_string()))?;
    encode::deserialize(&bytes).map_err(|e| WalletError::Decode(e.to_string()))
}

/// Hex-encode a transaction.
pub fn encode_tx(tx: &Transaction) -> String {
    encode::serialize_hex(tx)
}

fn donation_marker(account: &[u8; 20]) -> Result<ScriptBuf, WalletError> {
    let data = PushBytesBuf::try_from(account.to_vec())
        .map_err(|e| WalletError::BuildError(e.to_string()))?;
    Ok(ScriptBuf::new_op_return(&data))
}

fn inputs_for(utxos: &[Utxo]) -> Result<Vec<TxIn>, WalletError> {
    utxos
        .iter()
        .map(|u| {
            let txid = Txid::from_str(&u.txid)
                .map_err(|e| WalletError::Decode(format!("utxo txid {}: {e}", u.txid)))?;
            Ok(TxIn {
                previous_output: OutPoint { txid, vout: u.vout },
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::default(),
            })
        })
        .collect()
}

/// Signed size of a donation spending `input_count` P2PKH outputs.
///
/// Measured on a stand-in transaction with placeholder signatures and
/// an all-zero `OP_RETURN` marker, so it tracks the real encoding.
pub fn estimate_size(input_count: usize, exodus: &Address) -> Result<usize, WalletError> {
    let placeholder = TxIn {
        previous_output: OutPoint::null(),
        script_sig: ScriptBuf::from_bytes(vec![0u8; SCRIPT_SIG_ESTIMATE]),
        sequence: Sequence::MAX,
        witness: Witness::default(),
    };
    let tx = Transaction {
        version: transaction::Version::ONE,
        lock_time: LockTime::ZERO,
        input: vec![placeholder; input_count],
        output: vec![
            TxOut {
                value: Amount::ZERO,
                script_pubkey: exodus.script_pubkey(),
            },
            TxOut {
                value: Amount::ZERO,
                script_pubkey: donation_marker(&[0u8; 20])?,
            },
        ],
    };
    Ok(tx.total_size())
}

/// Build the unsigned donation spending all of `utxos`.
///
/// Fails with [`WalletError::InsufficientFunds`] when the fee would eat
/// the whole input value. Never returns a transaction that underpays
/// the fee rate.
pub fn create_final_tx(
    utxos: &[Utxo],
    fee_rate: u64,
    exodus: &Address,
) -> Result<FinalTransaction, WalletError> {
    if utxos.is_empty() {
        return Err(WalletError::NoUtxos);
    }
    let input = inputs_for(utxos)?;
    let available = utxos
        .iter()
        .try_fold(0u64, |acc, u| acc.checked_add(u.value))
        .ok_or_else(|| WalletError::BuildError("input value overflow".into()))?;

    let tx_bytes = estimate_size(utxos.len(), exodus)? as u64;
    let fee = tx_bytes.saturating_mul(fee_rate);
    if fee >= available {
        return Err(WalletError::InsufficientFunds {
            tx_bytes,
            fee_rate,
            fee,
            available,
        });
    }
    let paid = available - fee;

    let tx = Transaction {
        version: transaction::Version::ONE,
        lock_time: LockTime::ZERO,
        input,
        output: vec![TxOut {
            value: Amount::from_sat(paid),
            script_pubkey: exodus.script_pubkey(),
        }],
    };

    tracing::debug!(
        inputs = utxos.len(),
        tx_bytes,
        fee_rate,
        fee,
        paid,
        "built donation transaction"
    );

    Ok(FinalTransaction {
        tx,
        paid_amount: paid,
        fee_amount: fee,
        atom_amount: atoms_for(paid),
    })
}

/// Add the Cosmos marker output and sign every input with the wallet's
/// bitcoin key (legacy P2PKH, `SIGHASH_ALL`).
pub fn sign_final_tx(wallet: &Wallet, mut tx: Transaction) -> Result<Transaction, WalletError> {
    if tx.input.is_empty() {
        return Err(WalletError::SigningError("transaction has no inputs".into()));
    }

    let marker = donation_marker(wallet.cosmos_account())?;
    if !tx.output.iter().any(|o| o.script_pubkey == marker) {
        tx.output.push(TxOut {
            value: Amount::ZERO,
            script_pubkey: marker,
        });
    }

    let secp = wallet.secp();
    let key = wallet.bitcoin_key();
    let public_key = key.public_key(secp);
    let script_code = wallet.bitcoin_address().script_pubkey();

    let mut script_sigs = Vec::with_capacity(tx.input.len());
    {
        let cache = SighashCache::new(&tx);
        for index in 0..tx.input.len() {
            let sighash = cache
                .legacy_signature_hash(index, &script_code, EcdsaSighashType::All.to_u32())
                .map_err(|e| WalletError::SigningError(e.to_string()))?;
            let message = Message::from_digest(sighash.to_byte_array());
            let signature = bitcoin::ecdsa::Signature {
                signature: secp.sign_ecdsa_low_r(&message, &key.inner),
                sighash_type: EcdsaSighashType::All,
            };
            let push = PushBytesBuf::try_from(signature.to_vec())
                .map_err(|e| WalletError::SigningError(e.to_string()))?;
            script_sigs.push(
                ScriptBuf::builder()
                    .push_slice(push)
                    .push_key(&public_key)
                    .into_script(),
            );
        }
    }
    for (input, script_sig) in tx.input.iter_mut().zip(script_sigs) {
        input.script_sig = script_sig;
    }

    tracing::info!(txid = %tx.compute_txid(), inputs = tx.input.len(), "signed donation transaction");
    Ok(tx)
}

//! Wallet error types.

use thiserror::Error;

/// Errors that can occur in wallet operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// The transaction fee meets or exceeds the value being spent.
    #[error(
        "Transaction fee exceeds available amount (tx length: {tx_bytes} bytes, \
         fee rate: {fee_rate} sat/byte, fee: {fee} sat, available: {available} sat)"
    )]
    InsufficientFunds {
        /// Estimated signed transaction size in bytes.
        tx_bytes: u64,
        /// Fee rate in satoshis per byte.
        fee_rate: u64,
        /// Computed fee in satoshis.
        fee: u64,
        /// Total value of the consumed outputs in satoshis.
        available: u64,
    },

    /// No UTXOs available for spending.
    #[error("no UTXOs available")]
    NoUtxos,

    /// Invalid address string.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Seed material that cannot be used for derivation.
    #[error("invalid seed: {0}")]
    InvalidSeed(String),

    /// Invalid BIP-39 mnemonic phrase.
    #[error("{0}")]
    InvalidMnemonic(String),

    /// Key derivation failure.
    #[error("key derivation: {0}")]
    KeyDerivation(String),

    /// Encryption failure.
    #[error("encryption: {0}")]
    Encryption(String),

    /// Wrong password for wallet file.
    #[error("invalid password")]
    InvalidPassword,

    /// Encrypted fields that cannot be decrypted with any password.
    #[error("corrupted file: {0}")]
    CorruptedFile(String),

    /// Wallet file bytes do not follow the length-prefixed layout.
    #[error("malformed wallet: {0}")]
    MalformedWallet(String),

    /// A wallet field is too long for its one-byte length prefix.
    #[error("wallet field {field} is {len} bytes, longer than 255")]
    FieldTooLong {
        field: &'static str,
        len: usize,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Transaction build error.
    #[error("build error: {0}")]
    BuildError(String),

    /// Transaction signing error.
    #[error("signing error: {0}")]
    SigningError(String),

    /// Invalid hex or transaction encoding.
    #[error("decode error: {0}")]
    Decode(String),

    /// Seed share that cannot be combined.
    #[error("invalid share: {0}")]
    InvalidShare(String),

    /// Serialization error.
    #[error("serialization: {0}")]
    Serialization(String),
}

//! # cfr-wallet: seeds, encrypted wallet files and donation transactions.
//!
//! Everything here is offline. Network access lives in `cfr-gateway`.
//!
//! # Modules
//!
//! - [`error`]: `WalletError` enum
//! - [`mnemonic`]: BIP-39 phrase generation and parsing
//! - [`keys`]: Seed and per-chain key derivation
//! - [`wallet`]: in-memory wallet with derived addresses
//! - [`encryption`]: Argon2id + AES-256-GCM seed encryption
//! - [`store`]: wallet file codec and persistence
//! - [`lifecycle`]: create-or-unlock flow and seed input
//! - [`builder`]: Bitcoin donation transaction building and signing
//! - [`ethereum`]: Ethereum donation descriptor
//! - [`shares`]: Shamir seed splitting

pub mod builder;
pub mod encryption;
pub mod error;
pub mod ethereum;
pub mod keys;
pub mod lifecycle;
pub mod mnemonic;
pub mod shares;
pub mod store;
pub mod wallet;

// Re-exports for convenient access
pub use builder::{create_final_tx, sign_final_tx, FinalTransaction};
pub use encryption::{decrypt_seed, encrypt_seed, EncryptedWallet};
pub use error::WalletError;
pub use keys::{Seed, SeedKind};
pub use lifecycle::{create_or_load, LifecycleError, LifecycleOptions};
pub use wallet::Wallet;

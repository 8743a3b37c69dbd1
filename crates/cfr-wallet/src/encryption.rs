//! Password encryption of seed material.
//!
//! The key is Argon2id(password, salt); the seed is sealed with AES-256-GCM
//! under a random 12-byte iv. The three outputs are kept apart so the
//! wallet store can write them as separate fields.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::Argon2;
use zeroize::Zeroizing;

use crate::error::WalletError;
use crate::keys::Seed;

/// Salt length in bytes.
pub const SALT_LEN: usize = 32;

/// AES-GCM iv length in bytes.
pub const IV_LEN: usize = 12;

/// AES-GCM authentication tag length.
const TAG_LEN: usize = 16;

/// Shortest salt Argon2 accepts.
const MIN_SALT_LEN: usize = 8;

/// The persisted-at-rest form of a seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedWallet {
    /// Ciphertext followed by the GCM tag.
    pub encrypted_seed: Vec<u8>,
    pub salt: Vec<u8>,
    pub iv: Vec<u8>,
}

/// Derive a 256-bit key from a password and salt with Argon2id.
pub fn derive_key(password: &[u8], salt: &[u8]) -> Result<Zeroizing<[u8; 32]>, WalletError> {
    let mut key = Zeroizing::new([0u8; 32]);
    Argon2::default()
        .hash_password_into(password, salt, key.as_mut_slice())
        .map_err(|e| WalletError::Encryption(format!("key derivation: {e}")))?;
    Ok(key)
}

/// Encrypt `plaintext` under `password` with a fresh salt and iv.
pub fn encrypt(plaintext: &[u8], password: &[u8]) -> Result<EncryptedWallet, WalletError> {
    use rand::RngCore;
    let mut salt = vec![0u8; SALT_LEN];
    let mut iv = vec![0u8; IV_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    rand::rngs::OsRng.fill_bytes(&mut iv);

    let key = derive_key(password, &salt)?;
    let cipher = Aes256Gcm::new_from_slice(key.as_slice())
        .map_err(|e| WalletError::Encryption(e.to_string()))?;
    let encrypted_seed = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|e| WalletError::Encryption(e.to_string()))?;

    Ok(EncryptedWallet {
        encrypted_seed,
        salt,
        iv,
    })
}

/// Decrypt an [`EncryptedWallet`].
///
/// A wrong password or tampered field fails the GCM tag check and returns
/// [`WalletError::InvalidPassword`]. Fields with impossible shapes return
/// [`WalletError::CorruptedFile`] whatever the password.
pub fn decrypt(
    wallet: &EncryptedWallet,
    password: &[u8],
) -> Result<Zeroizing<Vec<u8>>, WalletError> {
    if wallet.iv.len() != IV_LEN {
        return Err(WalletError::CorruptedFile(format!(
            "iv is {} bytes, expected {IV_LEN}",
            wallet.iv.len()
        )));
    }
    if wallet.encrypted_seed.len() < TAG_LEN {
        return Err(WalletError::CorruptedFile(format!(
            "encrypted seed too short: {} < {TAG_LEN}",
            wallet.encrypted_seed.len()
        )));
    }
    if wallet.salt.len() < MIN_SALT_LEN {
        return Err(WalletError::CorruptedFile(format!(
            "salt too short: {} < {MIN_SALT_LEN}",
            wallet.salt.len()
        )));
    }

    let key = derive_key(password, &wallet.salt)?;
    let cipher = Aes256Gcm::new_from_slice(key.as_slice())
        .map_err(|e| WalletError::CorruptedFile(e.to_string()))?;
    cipher
        .decrypt(Nonce::from_slice(&wallet.iv), wallet.encrypted_seed.as_slice())
        .map(Zeroizing::new)
        .map_err(|_| WalletError::InvalidPassword)
}

/// Encrypt a seed's BIP-32 form under `password`.
pub fn encrypt_seed(seed: &Seed, password: &str) -> Result<EncryptedWallet, WalletError> {
    let bip32_seed = seed.to_bip32_seed()?;
    encrypt(&bip32_seed, password.as_bytes())
}

/// Recover the seed sealed by [`encrypt_seed`].
///
/// The result is always a raw seed that derives the same addresses as the
/// seed that was encrypted.
pub fn decrypt_seed(wallet: &EncryptedWallet, password: &str) -> Result<Seed, WalletError> {
    let plaintext = decrypt(wallet, password.as_bytes())?;
    Seed::from_bytes(plaintext.to_vec())
        .map_err(|e| WalletError::CorruptedFile(format!("decrypted seed unusable: {e}")))
}

//! Seed management and deterministic key derivation.
//!
//! A [`Seed`] is either raw entropy or a BIP-39 phrase. Both resolve to a
//! BIP-32 seed, from which each chain's key is derived along its BIP-44
//! path. The same seed always yields the same keys.

use std::fmt;
use std::str::FromStr;

use bitcoin::bip32::{DerivationPath, Xpriv};
use bitcoin::hashes::{hash160, Hash};
use bitcoin::secp256k1::{self, Secp256k1, Signing};
use bitcoin::{NetworkKind, PrivateKey};
use cfr_core::types::Chain;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::WalletError;
use crate::mnemonic;

/// Length of a generated raw seed.
pub const GENERATED_SEED_LEN: usize = 32;

/// Raw seeds outside this range are not valid BIP-32 seeds.
const MIN_SEED_LEN: usize = 16;
const MAX_SEED_LEN: usize = 64;

/// BIP-44 path of the first receive key for `chain`.
pub fn derivation_path(chain: Chain) -> &'static str {
    match chain {
        Chain::Bitcoin => "m/44'/0'/0'/0/0",
        Chain::Ethereum => "m/44'/60'/0'/0/0",
        Chain::Cosmos => "m/44'/118'/0'/0/0",
    }
}

/// How the seed material is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedKind {
    /// Raw BIP-32 seed bytes.
    Raw,
    /// UTF-8 BIP-39 phrase, normalized.
    Mnemonic,
}

/// Secret material from which every address is derived.
///
/// Zeroized on drop. Never logged: `Debug` is redacted.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Seed {
    material: Vec<u8>,
    #[zeroize(skip)]
    kind: SeedKind,
}

impl Seed {
    /// Generate a random raw seed from the OS cryptographic RNG.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut bytes = vec![0u8; GENERATED_SEED_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self {
            material: bytes,
            kind: SeedKind::Raw,
        }
    }

    /// Wrap raw BIP-32 seed bytes (16 to 64 bytes).
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, WalletError> {
        if !(MIN_SEED_LEN..=MAX_SEED_LEN).contains(&bytes.len()) {
            return Err(WalletError::InvalidSeed(format!(
                "seed must be {MIN_SEED_LEN} to {MAX_SEED_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self {
            material: bytes,
            kind: SeedKind::Raw,
        })
    }

    /// Parse a hex-encoded raw seed.
    pub fn from_hex(hex_str: &str) -> Result<Self, WalletError> {
        let bytes = hex::decode(hex_str.trim())
            .map_err(|e| WalletError::InvalidSeed(format!("invalid hex seed: {e}")))?;
        Self::from_bytes(bytes)
    }

    /// Validate and wrap a BIP-39 phrase.
    pub fn from_mnemonic(phrase: &str) -> Result<Self, WalletError> {
        let m = mnemonic::parse_mnemonic(phrase)?;
        Ok(Self {
            material: m.to_string().into_bytes(),
            kind: SeedKind::Mnemonic,
        })
    }

    /// Interpret user-supplied seed text.
    ///
    /// A single hex token is a raw seed; anything else is a phrase.
    pub fn parse(input: &str) -> Result<Self, WalletError> {
        let trimmed = input.trim();
        let single_token = !trimmed.is_empty() && !trimmed.contains(char::is_whitespace);
        if single_token && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            Self::from_hex(trimmed)
        } else {
            Self::from_mnemonic(trimmed)
        }
    }

    pub fn kind(&self) -> SeedKind {
        self.kind
    }

    /// The phrase, for mnemonic seeds.
    pub fn phrase(&self) -> Option<&str> {
        match self.kind {
            SeedKind::Mnemonic => std::str::from_utf8(&self.material).ok(),
            SeedKind::Raw => None,
        }
    }

    /// Raw seed bytes or phrase bytes. Handle with care.
    pub fn as_bytes(&self) -> &[u8] {
        &self.material
    }

    /// Hex form of the material, for backups of raw seeds.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(&self.material))
    }

    /// The BIP-32 seed this material resolves to.
    pub fn to_bip32_seed(&self) -> Result<Zeroizing<Vec<u8>>, WalletError> {
        match self.kind {
            SeedKind::Raw => Ok(Zeroizing::new(self.material.clone())),
            SeedKind::Mnemonic => {
                let phrase = std::str::from_utf8(&self.material)
                    .map_err(|e| WalletError::InvalidSeed(e.to_string()))?;
                let m = mnemonic::parse_mnemonic(phrase)?;
                Ok(Zeroizing::new(m.to_seed("").to_vec()))
            }
        }
    }
}

impl Clone for Seed {
    fn clone(&self) -> Self {
        Self {
            material: self.material.clone(),
            kind: self.kind,
        }
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seed")
            .field("kind", &self.kind)
            .field("material", &"[REDACTED]")
            .finish()
    }
}

/// Derive the private key at `path` from a BIP-32 seed.
pub fn derive_key<C: Signing>(
    secp: &Secp256k1<C>,
    bip32_seed: &[u8],
    path: &str,
    network: NetworkKind,
) -> Result<PrivateKey, WalletError> {
    let path = DerivationPath::from_str(path)
        .map_err(|e| WalletError::KeyDerivation(format!("{path}: {e}")))?;
    let master = Xpriv::new_master(network, bip32_seed)
        .map_err(|e| WalletError::KeyDerivation(e.to_string()))?;
    let child = master
        .derive_priv(secp, &path)
        .map_err(|e| WalletError::KeyDerivation(e.to_string()))?;
    Ok(child.to_priv())
}

/// Lowercase `0x` Ethereum address of a key: last 20 bytes of the
/// keccak-256 of the uncompressed public key.
pub fn ethereum_address<C: Signing>(secp: &Secp256k1<C>, key: &PrivateKey) -> String {
    use sha3::{Digest, Keccak256};
    let public = secp256k1::PublicKey::from_secret_key(secp, &key.inner);
    let uncompressed = public.serialize_uncompressed();
    let hash = Keccak256::digest(&uncompressed[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

/// Compressed secp256k1 public key of a Cosmos key.
pub fn cosmos_public_key<C: Signing>(secp: &Secp256k1<C>, key: &PrivateKey) -> [u8; 33] {
    secp256k1::PublicKey::from_secret_key(secp, &key.inner).serialize()
}

/// 20-byte Cosmos account hash: RIPEMD160(SHA256(compressed public key)).
pub fn cosmos_account(public_key: &[u8; 33]) -> [u8; 20] {
    hash160::Hash::hash(public_key).to_byte_array()
}

/// Bech32 `cosmos1...` form of an account hash.
pub fn cosmos_bech32(account: &[u8; 20]) -> Result<String, WalletError> {
    bech32_with_prefix("cosmos", account)
}

/// Bech32 `cosmospub1...` form of a compressed public key.
pub fn cosmos_pub_bech32(public_key: &[u8; 33]) -> Result<String, WalletError> {
    bech32_with_prefix("cosmospub", public_key)
}

fn bech32_with_prefix(prefix: &str, data: &[u8]) -> Result<String, WalletError> {
    let hrp = bech32::Hrp::parse(prefix)
        .map_err(|e| WalletError::KeyDerivation(format!("bech32 prefix {prefix}: {e}")))?;
    bech32::encode::<bech32::Bech32>(hrp, data)
        .map_err(|e| WalletError::KeyDerivation(format!("bech32 encoding: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon \
                           abandon abandon abandon abandon abandon about";

    fn abandon_seed() -> Zeroizing<Vec<u8>> {
        Seed::from_mnemonic(ABANDON).unwrap().to_bip32_seed().unwrap()
    }

    #[test]
    fn seed_generate_unique() {
        let s1 = Seed::generate();
        let s2 = Seed::generate();
        assert_eq!(s1.as_bytes().len(), GENERATED_SEED_LEN);
        assert_ne!(s1.as_bytes(), s2.as_bytes());
    }

    #[test]
    fn seed_debug_hides_material() {
        let seed = Seed::from_bytes(vec![0xAB; 32]).unwrap();
        let debug = format!("{seed:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("ab"));
    }

    #[test]
    fn raw_seed_length_bounds() {
        assert!(Seed::from_bytes(vec![1; 15]).is_err());
        assert!(Seed::from_bytes(vec![1; 16]).is_ok());
        assert!(Seed::from_bytes(vec![1; 64]).is_ok());
        assert!(Seed::from_bytes(vec![1; 65]).is_err());
    }

    #[test]
    fn parse_picks_hex_or_phrase() {
        let hex_seed = Seed::parse(&"0f".repeat(32)).unwrap();
        assert_eq!(hex_seed.kind(), SeedKind::Raw);
        assert_eq!(hex_seed.as_bytes(), &[0x0f; 32][..]);

        let phrase_seed = Seed::parse(&format!("  {ABANDON}\n")).unwrap();
        assert_eq!(phrase_seed.kind(), SeedKind::Mnemonic);
        assert_eq!(phrase_seed.phrase(), Some(ABANDON));
    }

    #[test]
    fn parse_empty_reports_word_count() {
        let err = Seed::parse("   \n").unwrap_err();
        assert_eq!(err.to_string(), "Mnemonic must be at least 12 words");
    }

    #[test]
    fn mnemonic_bip32_seed_vector() {
        assert_eq!(
            hex::encode(abandon_seed().as_slice()),
            "5eb00bbddcf069084889a8ab9155568165f5c453ccb85e70811aaed6f6da5fc1\
             9a5ac40b389cd370d086206dec8aa6c43daea6690f20ad3d8d48b2d2ce9e38e4"
        );
    }

    #[test]
    fn raw_bip32_seed_is_identity() {
        let seed = Seed::from_bytes(vec![7u8; 32]).unwrap();
        assert_eq!(seed.to_bip32_seed().unwrap().as_slice(), &[7u8; 32][..]);
    }

    #[test]
    fn ethereum_address_vector() {
        let secp = Secp256k1::new();
        let key = derive_key(&secp, &abandon_seed(), derivation_path(Chain::Ethereum), NetworkKind::Main)
            .unwrap();
        assert_eq!(
            ethereum_address(&secp, &key),
            "0x9858effd232b4033e47d90003d41ec34ecaeda94"
        );
    }

    #[test]
    fn cosmos_account_vector() {
        let secp = Secp256k1::new();
        let key = derive_key(&secp, &abandon_seed(), derivation_path(Chain::Cosmos), NetworkKind::Main)
            .unwrap();
        let public_key = cosmos_public_key(&secp, &key);
        assert_eq!(
            hex::encode(public_key),
            "024f4e2ad99c34d60b9ba6283c9431a8418af8673212961f97a77b6377fcd05b62"
        );
        assert_eq!(
            cosmos_pub_bech32(&public_key).unwrap(),
            "cosmospub1qf85u2kens6dvzum5c5re9p34pqc47r8xgffv8uh5aakxalu6pdkyndk036"
        );

        let account = cosmos_account(&public_key);
        assert_eq!(hex::encode(account), "28ff5c6d57d8cfd492b6fb42614536ed648e01fd");
        assert_eq!(
            cosmos_bech32(&account).unwrap(),
            "cosmos19rl4cm2hmr8afy4kldpxz3fka4jguq0auqdal4"
        );
    }

    #[test]
    fn derive_deterministic_and_path_dependent() {
        let secp = Secp256k1::new();
        let seed = abandon_seed();
        let a = derive_key(&secp, &seed, derivation_path(Chain::Bitcoin), NetworkKind::Main).unwrap();
        let b = derive_key(&secp, &seed, derivation_path(Chain::Bitcoin), NetworkKind::Main).unwrap();
        let c = derive_key(&secp, &seed, derivation_path(Chain::Cosmos), NetworkKind::Main).unwrap();
        assert_eq!(a.inner, b.inner);
        assert_ne!(a.inner, c.inner);
    }

    #[test]
    fn invalid_path_rejected() {
        let secp = Secp256k1::new();
        let err = derive_key(&secp, &[1u8; 32], "m/not/a/path", NetworkKind::Main).unwrap_err();
        assert!(matches!(err, WalletError::KeyDerivation(_)));
    }
}

//! BIP-39 mnemonic generation and parsing.

use bip39::{Language, Mnemonic};
use bitcoin::hashes::{sha256, Hash};
use zeroize::Zeroizing;

use crate::error::WalletError;

/// Words in a freshly generated phrase unless asked otherwise.
pub const GENERATED_WORDS: usize = 12;

/// Phrase lengths [`generate_mnemonic_with`] can produce.
pub const GENERATED_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

/// Fewest words accepted when parsing a phrase.
pub const MIN_WORDS: usize = 12;

/// Entropy bytes behind a phrase of `words` words.
pub fn entropy_len(words: usize) -> Option<usize> {
    GENERATED_WORD_COUNTS.contains(&words).then_some(words * 4 / 3)
}

/// Generate a random 12-word English phrase.
pub fn generate_mnemonic() -> Result<String, WalletError> {
    generate_mnemonic_with(GENERATED_WORDS, None)
}

/// Generate a random phrase of `words` words.
///
/// With `extra`, the OS entropy is XORed with the SHA-256 of that text, so
/// the phrase stays random even if one of the two sources is weak.
pub fn generate_mnemonic_with(words: usize, extra: Option<&str>) -> Result<String, WalletError> {
    use rand::RngCore;
    let len = entropy_len(words).ok_or_else(|| {
        WalletError::InvalidMnemonic(format!(
            "cannot generate a {words}-word mnemonic, use one of {GENERATED_WORD_COUNTS:?}"
        ))
    })?;
    let mut entropy = Zeroizing::new(vec![0u8; len]);
    rand::rngs::OsRng.fill_bytes(entropy.as_mut_slice());
    if let Some(text) = extra {
        mix_entropy(entropy.as_mut_slice(), text);
    }
    mnemonic_from_entropy(&entropy)
}

/// XOR `entropy` (at most 32 bytes) with the SHA-256 digest of `text`.
pub fn mix_entropy(entropy: &mut [u8], text: &str) {
    let digest = sha256::Hash::hash(text.as_bytes());
    for (byte, mask) in entropy.iter_mut().zip(digest.as_byte_array()) {
        *byte ^= mask;
    }
}

/// Collapse runs of whitespace and lowercase the phrase.
pub fn normalize_phrase(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Parse and checksum-validate a phrase.
///
/// Normalizes whitespace and case first. Phrases shorter than
/// [`MIN_WORDS`] are rejected before any wordlist lookup.
pub fn parse_mnemonic(phrase: &str) -> Result<Mnemonic, WalletError> {
    let normalized = normalize_phrase(phrase);
    if normalized.split(' ').filter(|w| !w.is_empty()).count() < MIN_WORDS {
        return Err(WalletError::InvalidMnemonic(format!(
            "Mnemonic must be at least {MIN_WORDS} words"
        )));
    }
    Mnemonic::parse_in(Language::English, &normalized)
        .map_err(|e| WalletError::InvalidMnemonic(format!("invalid mnemonic: {e}")))
}

/// Entropy encoded by a phrase.
pub fn mnemonic_entropy(phrase: &str) -> Result<Vec<u8>, WalletError> {
    Ok(parse_mnemonic(phrase)?.to_entropy())
}

/// Phrase encoding `entropy` (16, 20, 24, 28 or 32 bytes).
pub fn mnemonic_from_entropy(entropy: &[u8]) -> Result<String, WalletError> {
    Mnemonic::from_entropy_in(Language::English, entropy)
        .map(|m| m.to_string())
        .map_err(|e| WalletError::InvalidMnemonic(format!("invalid mnemonic: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon \
                           abandon abandon abandon abandon abandon about";

    #[test]
    fn generated_phrase_has_12_words() {
        let phrase = generate_mnemonic().unwrap();
        assert_eq!(phrase.split(' ').count(), GENERATED_WORDS, "{phrase}");
        assert!(parse_mnemonic(&phrase).is_ok());
    }

    #[test]
    fn generated_phrase_lengths() {
        for words in GENERATED_WORD_COUNTS {
            let phrase = generate_mnemonic_with(words, Some("dice rolls 3 1 4 1 5")).unwrap();
            assert_eq!(phrase.split(' ').count(), words, "{phrase}");
            assert!(parse_mnemonic(&phrase).is_ok());
        }
    }

    #[test]
    fn unsupported_length_rejected() {
        assert_eq!(entropy_len(24), Some(32));
        assert_eq!(entropy_len(13), None);
        assert!(generate_mnemonic_with(13, None).is_err());
    }

    #[test]
    fn mixing_is_sha256_xor() {
        let mut entropy = [0u8; 32];
        mix_entropy(&mut entropy, "");
        // SHA-256 of the empty string.
        assert_eq!(
            hex::encode(entropy),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        mix_entropy(&mut entropy, "");
        assert_eq!(entropy, [0u8; 32]);

        let mut short = [0xffu8; 16];
        mix_entropy(&mut short, "");
        assert_eq!(hex::encode(short), "1c4f3bbd6703e3eb65040b37669046db");
    }

    #[test]
    fn generated_phrases_differ() {
        assert_ne!(generate_mnemonic().unwrap(), generate_mnemonic().unwrap());
    }

    #[test]
    fn short_phrase_rejected_with_word_count_message() {
        let err = parse_mnemonic("believe label page great frog").unwrap_err();
        assert_eq!(err.to_string(), "Mnemonic must be at least 12 words");
    }

    #[test]
    fn empty_phrase_rejected_with_word_count_message() {
        let err = parse_mnemonic("").unwrap_err();
        assert_eq!(err.to_string(), "Mnemonic must be at least 12 words");
    }

    #[test]
    fn bad_checksum_rejected() {
        let phrase = ["abandon"; 12].join(" ");
        let err = parse_mnemonic(&phrase).unwrap_err();
        assert!(err.to_string().starts_with("invalid mnemonic"), "{err}");
    }

    #[test]
    fn unknown_word_rejected() {
        let phrase = format!("{} notaword", ["abandon"; 11].join(" "));
        assert!(parse_mnemonic(&phrase).is_err());
    }

    #[test]
    fn whitespace_and_case_normalized() {
        let messy = format!("  {}\n", ABANDON.to_uppercase().replace(' ', " \t "));
        let m = parse_mnemonic(&messy).unwrap();
        assert_eq!(m.to_string(), ABANDON);
    }

    #[test]
    fn entropy_roundtrip() {
        let entropy = mnemonic_entropy(ABANDON).unwrap();
        assert_eq!(entropy, vec![0u8; 16]);
        assert_eq!(mnemonic_from_entropy(&entropy).unwrap(), ABANDON);
    }

    #[test]
    fn from_entropy_rejects_odd_length() {
        assert!(mnemonic_from_entropy(&[1u8; 15]).is_err());
    }
}

//! Shamir secret sharing of wallet seeds over GF(256).
//!
//! A seed is split into `count` shares, any `threshold` of which recover
//! it. Each share is printed as one hex line:
//!
//! ```text
//! threshold (1 byte) || x (1 byte) || y bytes
//! ```
//!
//! The shared payload is a kind byte followed by the mnemonic's entropy
//! or the raw seed, so joining restores the seed in its original form.

use std::collections::BTreeSet;

use zeroize::Zeroizing;

use crate::error::WalletError;
use crate::keys::{Seed, SeedKind};
use crate::mnemonic;

/// Default shares needed to recover a seed.
pub const DEFAULT_THRESHOLD: u8 = 2;

/// Default shares produced.
pub const DEFAULT_SHARES: u8 = 3;

const KIND_MNEMONIC: u8 = 0;
const KIND_RAW: u8 = 1;

/// Multiplication in GF(2^8) modulo x^8 + x^4 + x^3 + x + 1.
fn gf_mul(mut a: u8, mut b: u8) -> u8 {
    let mut product = 0u8;
    while b != 0 {
        if b & 1 != 0 {
            product ^= a;
        }
        let carry = a & 0x80;
        a <<= 1;
        if carry != 0 {
            a ^= 0x1b;
        }
        b >>= 1;
    }
    product
}

/// Multiplicative inverse; `a` must be non-zero.
fn gf_inv(a: u8) -> u8 {
    // a^254 = a^-1 in GF(256)
    let mut result = 1u8;
    let mut base = a;
    let mut exp = 254u8;
    while exp != 0 {
        if exp & 1 != 0 {
            result = gf_mul(result, base);
        }
        base = gf_mul(base, base);
        exp >>= 1;
    }
    result
}

/// Evaluate a polynomial (lowest coefficient first) at `x`.
fn eval(coefficients: &[u8], x: u8) -> u8 {
    coefficients
        .iter()
        .rev()
        .fold(0u8, |acc, &c| gf_mul(acc, x) ^ c)
}

/// Split `secret` into `count` shares with the given threshold.
pub fn split(secret: &[u8], threshold: u8, count: u8) -> Result<Vec<Vec<u8>>, WalletError> {
    if threshold < 2 || threshold > count {
        return Err(WalletError::InvalidShare(format!(
            "threshold must be between 2 and the share count ({count}), got {threshold}"
        )));
    }
    if secret.is_empty() {
        return Err(WalletError::InvalidShare("empty secret".into()));
    }

    use rand::RngCore;
    let mut shares: Vec<Vec<u8>> = (1..=count)
        .map(|x| {
            let mut share = Vec::with_capacity(2 + secret.len());
            share.push(threshold);
            share.push(x);
            share
        })
        .collect();

    let mut coefficients = Zeroizing::new(vec![0u8; threshold as usize]);
    for &byte in secret {
        coefficients[0] = byte;
        rand::rngs::OsRng.fill_bytes(&mut coefficients[1..]);
        for share in shares.iter_mut() {
            let x = share[1];
            share.push(eval(&coefficients, x));
        }
    }
    Ok(shares)
}

/// Recover a secret from at least `threshold` distinct shares.
pub fn combine(shares: &[Vec<u8>]) -> Result<Zeroizing<Vec<u8>>, WalletError> {
    let first = shares
        .first()
        .ok_or_else(|| WalletError::InvalidShare("no shares given".into()))?;
    if first.len() < 3 {
        return Err(WalletError::InvalidShare("share too short".into()));
    }
    let threshold = first[0] as usize;
    let len = first.len();

    let mut seen = BTreeSet::new();
    for share in shares {
        if share.len() != len || share[0] as usize != threshold {
            return Err(WalletError::InvalidShare(
                "shares come from different splits".into(),
            ));
        }
        if share[1] == 0 || !seen.insert(share[1]) {
            return Err(WalletError::InvalidShare(format!(
                "duplicate or invalid share index {}",
                share[1]
            )));
        }
    }
    if shares.len() < threshold {
        return Err(WalletError::InvalidShare(format!(
            "need {threshold} shares, got {}",
            shares.len()
        )));
    }

    let used = &shares[..threshold];
    let mut secret = Zeroizing::new(Vec::with_capacity(len - 2));
    for i in 2..len {
        let mut value = 0u8;
        for (j, share_j) in used.iter().enumerate() {
            let xj = share_j[1];
            let mut basis = 1u8;
            for (m, share_m) in used.iter().enumerate() {
                if m != j {
                    let xm = share_m[1];
                    basis = gf_mul(basis, gf_mul(xm, gf_inv(xm ^ xj)));
                }
            }
            value ^= gf_mul(share_j[i], basis);
        }
        secret.push(value);
    }
    Ok(secret)
}

/// Split a seed into hex-encoded share lines.
pub fn split_seed(seed: &Seed, threshold: u8, count: u8) -> Result<Vec<String>, WalletError> {
    let mut payload = Zeroizing::new(Vec::new());
    match (seed.kind(), seed.phrase()) {
        (SeedKind::Mnemonic, Some(phrase)) => {
            payload.push(KIND_MNEMONIC);
            payload.extend_from_slice(&mnemonic::mnemonic_entropy(phrase)?);
        }
        _ => {
            payload.push(KIND_RAW);
            payload.extend_from_slice(seed.as_bytes());
        }
    }
    let shares = split(&payload, threshold, count)?;
    tracing::debug!(threshold, count, "seed split into shares");
    Ok(shares.iter().map(hex::encode).collect())
}

/// Recombine hex share lines into the seed they were split from.
///
/// Blank lines are ignored.
pub fn join_seed<S: AsRef<str>>(lines: &[S]) -> Result<Seed, WalletError> {
    let shares = lines
        .iter()
        .map(|l| l.as_ref().trim())
        .filter(|l| !l.is_empty())
        .map(|l| hex::decode(l).map_err(|e| WalletError::InvalidShare(format!("not hex: {e}"))))
        .collect::<Result<Vec<_>, _>>()?;
    let payload = combine(&shares)?;
    match payload.split_first() {
        Some((&KIND_MNEMONIC, entropy)) => {
            let phrase = Zeroizing::new(mnemonic::mnemonic_from_entropy(entropy)?);
            Seed::from_mnemonic(&phrase)
        }
        Some((&KIND_RAW, bytes)) => Seed::from_bytes(bytes.to_vec()),
        _ => Err(WalletError::InvalidShare("unrecognized seed encoding".into())),
    }
}

//! Wallet file codec and persistence.
//!
//! # File layout
//! ```text
//! len(encryptedSeed) u8 || encryptedSeed || len(salt) u8 || salt || len(iv) u8 || iv
//! ```
//! No header, version tag or checksum. The GCM tag inside `encryptedSeed`
//! is the only integrity check.

use std::fs;
use std::io;
use std::path::Path;

use crate::encryption::EncryptedWallet;
use crate::error::WalletError;

/// Largest field a one-byte length prefix can describe.
pub const MAX_FIELD_LEN: usize = u8::MAX as usize;

fn put_field(out: &mut Vec<u8>, field: &'static str, bytes: &[u8]) -> Result<(), WalletError> {
    let len = u8::try_from(bytes.len()).map_err(|_| WalletError::FieldTooLong {
        field,
        len: bytes.len(),
    })?;
    out.push(len);
    out.extend_from_slice(bytes);
    Ok(())
}

/// Serialize a wallet into its file bytes.
pub fn encode(wallet: &EncryptedWallet) -> Result<Vec<u8>, WalletError> {
    let mut out = Vec::with_capacity(
        3 + wallet.encrypted_seed.len() + wallet.salt.len() + wallet.iv.len(),
    );
    put_field(&mut out, "encryptedSeed", &wallet.encrypted_seed)?;
    put_field(&mut out, "salt", &wallet.salt)?;
    put_field(&mut out, "iv", &wallet.iv)?;
    Ok(out)
}

/// Cursor over the file bytes.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn field(&mut self, name: &str) -> Result<Vec<u8>, WalletError> {
        let len = *self.buf.get(self.pos).ok_or_else(|| {
            WalletError::MalformedWallet(format!("missing length prefix for {name}"))
        })? as usize;
        self.pos += 1;
        let remaining = self.buf.len() - self.pos;
        if len > remaining {
            return Err(WalletError::MalformedWallet(format!(
                "{name} length {len} exceeds remaining {remaining} bytes"
            )));
        }
        let bytes = self.buf[self.pos..self.pos + len].to_vec();
        self.pos += len;
        Ok(bytes)
    }
}

/// Parse file bytes. Overlong prefixes and trailing bytes are rejected.
pub fn decode(bytes: &[u8]) -> Result<EncryptedWallet, WalletError> {
    let mut reader = Reader { buf: bytes, pos: 0 };
    let encrypted_seed = reader.field("encryptedSeed")?;
    let salt = reader.field("salt")?;
    let iv = reader.field("iv")?;
    if reader.pos != bytes.len() {
        return Err(WalletError::MalformedWallet(format!(
            "{} trailing bytes",
            bytes.len() - reader.pos
        )));
    }
    Ok(EncryptedWallet {
        encrypted_seed,
        salt,
        iv,
    })
}

/// Read and decode the wallet file at `path`.
///
/// I/O errors are returned as-is so callers can tell "absent" from
/// "inaccessible".
pub fn read_wallet(path: &Path) -> io::Result<Result<EncryptedWallet, WalletError>> {
    let bytes = fs::read(path)?;
    Ok(decode(&bytes))
}

/// Encode and write `wallet` to `path`, owner-readable only on Unix.
pub fn write_wallet(path: &Path, wallet: &EncryptedWallet) -> Result<(), WalletError> {
    let bytes = encode(wallet)?;
    write_private(path, &bytes).map_err(|e| WalletError::IoError(e.to_string()))?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "wallet file written");
    Ok(())
}

#[cfg(unix)]
fn write_private(path: &Path, bytes: &[u8]) -> io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, bytes: &[u8]) -> io::Result<()> {
    fs::write(path, bytes)
}

//! Wallet creation and unlock.
//!
//! [`create_or_load`] is the interactive path: it creates a password
//! protected wallet file when none exists, otherwise it asks for the
//! password until decryption succeeds. [`read_seed`] and
//! [`read_seed_file`] are the scriptable path used by offline commands;
//! they take seed material directly and never touch the wallet file.

use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};

use bitcoin::Network;
use cfr_core::constants::MIN_PASSWORD_LEN;
use cfr_core::traits::Prompter;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::encryption;
use crate::error::WalletError;
use crate::keys::Seed;
use crate::store;
use crate::wallet::Wallet;

/// Prompt shown before reading a seed from a terminal.
pub const SEED_PROMPT: &str = "Please enter your wallet seed phrase:\n> ";

/// Errors that end wallet acquisition.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// The wallet path exists but cannot be read or written.
    #[error("cannot access wallet file {}: {source}", path.display())]
    Access {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading user input failed.
    #[error("input error: {0}")]
    Input(#[from] io::Error),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    /// Only reachable when [`LifecycleOptions::max_attempts`] is set.
    #[error("giving up after {0} incorrect passwords")]
    TooManyAttempts(u32),
}

/// Knobs for [`create_or_load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleOptions {
    pub network: Network,
    /// Unlock attempts before giving up. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            network: Network::Bitcoin,
            max_attempts: None,
        }
    }
}

/// Create a wallet file at `path`, or unlock the one already there.
pub fn create_or_load(
    path: &Path,
    prompter: &mut dyn Prompter,
    options: LifecycleOptions,
) -> Result<Wallet, LifecycleError> {
    match fs::metadata(path) {
        Ok(_) => {
            prompter.say(&format!("Found existing wallet file: {}", path.display()))?;
            unlock(path, prompter, options)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => create(path, prompter, options.network),
        Err(source) => Err(LifecycleError::Access {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn unlock(
    path: &Path,
    prompter: &mut dyn Prompter,
    options: LifecycleOptions,
) -> Result<Wallet, LifecycleError> {
    let encrypted = store::read_wallet(path)
        .map_err(|source| LifecycleError::Access {
            path: path.to_path_buf(),
            source,
        })??;

    let mut attempts: u32 = 0;
    loop {
        let password = Zeroizing::new(prompter.password("Enter your wallet password:")?);
        attempts += 1;
        match encryption::decrypt_seed(&encrypted, &password) {
            Ok(seed) => {
                tracing::info!(path = %path.display(), attempts, "wallet unlocked");
                return Ok(Wallet::derive(seed, options.network)?);
            }
            Err(WalletError::InvalidPassword) => {
                tracing::warn!(attempts, "incorrect wallet password");
                prompter.say("Incorrect password")?;
                if let Some(max) = options.max_attempts {
                    if attempts >= max {
                        return Err(LifecycleError::TooManyAttempts(attempts));
                    }
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn create(
    path: &Path,
    prompter: &mut dyn Prompter,
    network: Network,
) -> Result<Wallet, LifecycleError> {
    prompter.say(
        "We will now create a Cosmos wallet and a password.\n\n\
         WARNING: If you lose your password, you will lose access to your Atoms. \
         There is no way to recover or reset your password. \
         Write down your password and DO NOT LOSE IT!",
    )?;
    let password = choose_password(prompter)?;

    let seed = Seed::generate();
    let wallet = Wallet::derive(seed.clone(), network)?;
    show_backup(prompter, &seed)?;

    prompter.say("Encrypting wallet...")?;
    let encrypted = encryption::encrypt_seed(&seed, &password)?;
    store::write_wallet(path, &encrypted).map_err(|e| match e {
        WalletError::IoError(msg) => LifecycleError::Access {
            path: path.to_path_buf(),
            source: io::Error::other(msg),
        },
        other => other.into(),
    })?;
    prompter.say(&format!("Saved wallet to {}", path.display()))?;

    Ok(wallet)
}

/// Ask for a new password until a long enough one is typed twice.
fn choose_password(prompter: &mut dyn Prompter) -> Result<Zeroizing<String>, LifecycleError> {
    loop {
        let password = Zeroizing::new(prompter.password("Choose a password:")?);
        if password.chars().count() < MIN_PASSWORD_LEN {
            prompter.say(&format!("Must be at least {MIN_PASSWORD_LEN} characters"))?;
            continue;
        }
        let confirm = Zeroizing::new(prompter.password("Enter password again to confirm:")?);
        if *confirm == *password {
            return Ok(password);
        }
        prompter.say("Passwords do not match.")?;
    }
}

fn show_backup(prompter: &mut dyn Prompter, seed: &Seed) -> io::Result<()> {
    let hex = seed.to_hex();
    prompter.say(&format!(
        "\nHere is your wallet seed:\n{}\n\n\
         KEEP YOUR WALLET SECRET AND DO NOT LOSE IT!\n\
         WARNING: If you lose your wallet, you will lose access to your Atoms.\n\
         WARNING: If someone gets your wallet seed, they can take your Atoms.\n\
         WARNING: Write down your wallet seed and DO NOT LOSE IT!\n",
        hex.as_str()
    ))
}

/// Read seed material from `input`.
///
/// With `prompt` set, shows [`SEED_PROMPT`] and reads a single line;
/// otherwise reads the input to its end. The text is trimmed and parsed by
/// [`Seed::parse`].
pub fn read_seed(
    input: &mut dyn BufRead,
    prompt: Option<&mut dyn Write>,
) -> Result<Seed, LifecycleError> {
    let mut text = Zeroizing::new(String::new());
    match prompt {
        Some(out) => {
            out.write_all(SEED_PROMPT.as_bytes())?;
            out.flush()?;
            input.read_line(&mut text)?;
        }
        None => {
            input.read_to_string(&mut text)?;
        }
    }
    Ok(Seed::parse(text.trim())?)
}

/// Read seed material from a file.
pub fn read_seed_file(path: &Path) -> Result<Seed, LifecycleError> {
    let text = Zeroizing::new(fs::read_to_string(path).map_err(|source| {
        LifecycleError::Access {
            path: path.to_path_buf(),
            source,
        }
    })?);
    Ok(Seed::parse(text.trim())?)
}

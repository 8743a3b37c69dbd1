//! Wallet lifecycle against real wallet files.

use std::io::Cursor;

use bitcoin::Network;
use cfr_core::types::Chain;
use cfr_tests::helpers::*;
use cfr_wallet::encryption::{self, EncryptedWallet};
use cfr_wallet::lifecycle::{self, LifecycleError, LifecycleOptions};
use cfr_wallet::{store, Seed, Wallet, WalletError};
use proptest::prelude::*;

#[test]
fn unlock_matches_direct_derivation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("w.wallet");
    write_abandon_wallet(&path);

    let mut prompter = ScriptedPrompter::new([Answer::password(PASSWORD)]);
    let wallet =
        lifecycle::create_or_load(&path, &mut prompter, LifecycleOptions::default()).unwrap();
    let direct = Wallet::derive(Seed::from_mnemonic(ABANDON).unwrap(), Network::Bitcoin).unwrap();
    assert_eq!(wallet.addresses(), direct.addresses());
    assert_eq!(wallet.address(Chain::Bitcoin), ABANDON_BTC);
}

#[test]
fn created_wallet_unlocks_to_same_addresses() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fresh.wallet");
    let password = "twelve chars!";

    let mut create =
        ScriptedPrompter::new([Answer::password(password), Answer::password(password)]);
    let created =
        lifecycle::create_or_load(&path, &mut create, LifecycleOptions::default()).unwrap();
    assert!(create.text().contains(&format!("Saved wallet to {}", path.display())));

    let mut unlock = ScriptedPrompter::new([Answer::password(password)]);
    let unlocked =
        lifecycle::create_or_load(&path, &mut unlock, LifecycleOptions::default()).unwrap();
    assert_eq!(created.addresses(), unlocked.addresses());
}

#[test]
fn wrong_password_never_yields_wallet() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("w.wallet");
    write_abandon_wallet(&path);

    // Script runs dry after the wrong guesses: the loop keeps asking.
    let guesses = (0..6).map(|i| Answer::password(&format!("wrong guess {i}")));
    let mut prompter = ScriptedPrompter::new(guesses);
    let err = lifecycle::create_or_load(&path, &mut prompter, LifecycleOptions::default())
        .unwrap_err();
    assert!(matches!(err, LifecycleError::Input(_)), "{err}");
    assert_eq!(prompter.count("Incorrect password"), 6);
}

#[test]
fn truncated_file_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("w.wallet");
    write_abandon_wallet(&path);
    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();

    let mut prompter = ScriptedPrompter::new([Answer::password(PASSWORD)]);
    let err = lifecycle::create_or_load(&path, &mut prompter, LifecycleOptions::default())
        .unwrap_err();
    assert!(
        matches!(err, LifecycleError::Wallet(WalletError::MalformedWallet(_))),
        "{err}"
    );
    // Fails before asking for a password.
    assert_eq!(prompter.remaining(), 1);
}

#[test]
fn trailing_bytes_are_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("w.wallet");
    write_abandon_wallet(&path);
    let mut bytes = std::fs::read(&path).unwrap();
    bytes.push(0);
    std::fs::write(&path, bytes).unwrap();

    let mut prompter = ScriptedPrompter::new([Answer::password(PASSWORD)]);
    let err = lifecycle::create_or_load(&path, &mut prompter, LifecycleOptions::default())
        .unwrap_err();
    assert!(matches!(err, LifecycleError::Wallet(WalletError::MalformedWallet(_))));
}

#[test]
fn unreadable_path_is_access_error() {
    let dir = tempfile::tempdir().unwrap();
    // A directory exists but cannot be read as a wallet.
    let mut prompter = ScriptedPrompter::new([Answer::password(PASSWORD)]);
    let err = lifecycle::create_or_load(dir.path(), &mut prompter, LifecycleOptions::default())
        .unwrap_err();
    assert!(matches!(err, LifecycleError::Access { .. }), "{err}");
}

#[test]
fn wallet_file_layout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("w.wallet");
    write_abandon_wallet(&path);
    let bytes = std::fs::read(&path).unwrap();

    // BIP-39 seed (64) + GCM tag (16), then salt, then iv.
    assert_eq!(bytes[0] as usize, 80);
    assert_eq!(bytes[81] as usize, encryption::SALT_LEN);
    assert_eq!(bytes[82 + encryption::SALT_LEN] as usize, encryption::IV_LEN);
    assert_eq!(bytes.len(), 1 + 80 + 1 + encryption::SALT_LEN + 1 + encryption::IV_LEN);
}

#[cfg(unix)]
#[test]
fn wallet_file_is_private() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("w.wallet");
    write_abandon_wallet(&path);
    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn piped_seed_matches_file_seed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seed.txt");
    std::fs::write(&path, format!("\n{ABANDON}\n\n")).unwrap();

    let from_file = lifecycle::read_seed_file(&path).unwrap();
    let mut input = Cursor::new(format!("{ABANDON}\n").into_bytes());
    let from_pipe = lifecycle::read_seed(&mut input, None).unwrap();
    assert_eq!(from_file.as_bytes(), from_pipe.as_bytes());
    assert!(!dir.path().join("cosmos_fundraiser.wallet").exists());
}

#[test]
fn hex_seed_input_is_raw() {
    let seed = Seed::generate();
    let hex = seed.to_hex();
    let mut input = Cursor::new(hex.as_bytes().to_vec());
    let parsed = lifecycle::read_seed(&mut input, None).unwrap();
    assert_eq!(parsed.as_bytes(), seed.as_bytes());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn store_roundtrip_through_file(
        encrypted_seed in proptest::collection::vec(any::<u8>(), 0..=255),
        salt in proptest::collection::vec(any::<u8>(), 0..=255),
        iv in proptest::collection::vec(any::<u8>(), 0..=255),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.wallet");
        let wallet = EncryptedWallet { encrypted_seed, salt, iv };
        store::write_wallet(&path, &wallet).unwrap();
        let back = store::read_wallet(&path).unwrap().unwrap();
        prop_assert_eq!(back, wallet);
    }
}

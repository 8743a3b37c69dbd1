//! Campaign constants. Bitcoin values are in satoshis (1 BTC = 10^8 sat).

/// Satoshis per bitcoin.
pub const SATOSHIS_PER_BTC: u64 = 100_000_000;

/// ATOM credited per whole BTC donated.
pub const ATOMS_PER_BTC: u64 = 11_635;

/// Smallest accepted Bitcoin donation, in satoshis.
pub const MINIMUM_AMOUNT: u64 = 1_000_000;

/// Smallest accepted Ethereum donation, in ETH.
pub const MIN_DONATION_ETH: u64 = 1;

/// Fee rate used by `buildtx` when none is given, in satoshis per byte.
pub const DEFAULT_FEE_RATE: u64 = 300;

/// Minimum wallet password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 12;

/// Wallet file used when no path is configured.
pub const DEFAULT_WALLET_PATH: &str = "./cosmos_fundraiser.wallet";

/// Campaign address receiving Bitcoin donations. Override per campaign.
pub const DEFAULT_EXODUS_ADDRESS: &str = "3Cf7VE6SmToeEg3cCXDi9JpivSU7x4811g";

/// Fundraiser contract receiving Ethereum donations.
pub const FUNDRAISER_CONTRACT: &str = "0xcf965cfe7c30323e9c9e41d4e398e2167506f764";

/// Gas limit attached to the Ethereum donation descriptor.
pub const DEFAULT_GAS_LIMIT: u64 = 150_000;

/// Convert satoshis to BTC for display. Not for arithmetic.
pub fn sat_to_btc(sat: u64) -> f64 {
    sat as f64 / SATOSHIS_PER_BTC as f64
}

/// ATOM credited for a donation of `paid` satoshis. Display only.
pub fn atoms_for(paid: u64) -> f64 {
    (paid as u128 * ATOMS_PER_BTC as u128) as f64 / SATOSHIS_PER_BTC as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sat_to_btc_whole_coin() {
        assert_eq!(sat_to_btc(SATOSHIS_PER_BTC), 1.0);
        assert_eq!(sat_to_btc(MINIMUM_AMOUNT), 0.01);
    }

    #[test]
    fn atoms_for_one_btc() {
        assert_eq!(atoms_for(SATOSHIS_PER_BTC), ATOMS_PER_BTC as f64);
    }

    #[test]
    fn atoms_for_partial_amount() {
        let atoms = atoms_for(77_900);
        assert!((atoms - 9.063665).abs() < 1e-9, "got {atoms}");
    }
}

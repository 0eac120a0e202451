//! Well-formed addresses and signatures for tests.

use fomo_types::{TxSignature, WalletAddress};

const ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

fn base58_digits(mut n: u64) -> String {
    let mut out = Vec::new();
    loop {
        out.push(ALPHABET[(n % 58) as usize]);
        n /= 58;
        if n == 0 {
            break;
        }
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// A distinct valid wallet address per seed.
pub fn test_wallet(seed: u64) -> WalletAddress {
    let head = format!("W{:1>8}", base58_digits(seed));
    WalletAddress::new(format!("{head:1<43}")).expect("fixture wallet is base58")
}

/// A distinct valid transaction signature per seed.
pub fn test_signature(seed: u64) -> TxSignature {
    let head = format!("Sig{:1>8}", base58_digits(seed));
    TxSignature::new(format!("{head:1<88}")).expect("fixture signature is base58")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_are_distinct() {
        assert_ne!(test_wallet(1), test_wallet(2));
        assert_ne!(test_wallet(57), test_wallet(58));
        assert_ne!(test_signature(0), test_signature(1));
    }
}

//! Base58 account addresses (wallets and token mints).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::FomoError;

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// A 32-byte public key renders to 32..=44 base58 characters.
const MIN_LEN: usize = 32;
const MAX_LEN: usize = 44;

fn is_base58_key(s: &str) -> bool {
    (MIN_LEN..=MAX_LEN).contains(&s.len()) && s.chars().all(|c| BASE58_ALPHABET.contains(c))
}

/// A wallet (owner) address on the ledger.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Parse and validate a wallet address.
    pub fn new(raw: impl Into<String>) -> Result<Self, FomoError> {
        let s = raw.into();
        if is_base58_key(&s) {
            Ok(Self(s))
        } else {
            Err(FomoError::InvalidAddress(s))
        }
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for WalletAddress {
    type Err = FomoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = FomoError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<WalletAddress> for String {
    fn from(a: WalletAddress) -> Self {
        a.0
    }
}

/// The on-chain identifier of a fungible token type.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MintAddress(String);

impl MintAddress {
    /// Wrapped SOL.
    pub const SOL: &'static str = "So11111111111111111111111111111111111111112";

    pub fn new(raw: impl Into<String>) -> Result<Self, FomoError> {
        let s = raw.into();
        if is_base58_key(&s) {
            Ok(Self(s))
        } else {
            Err(FomoError::InvalidMint(s))
        }
    }

    pub fn sol() -> Self {
        Self(Self::SOL.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MintAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MintAddress {
    type Err = FomoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for MintAddress {
    type Error = FomoError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<MintAddress> for String {
    fn from(m: MintAddress) -> Self {
        m.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_keys() {
        assert!(WalletAddress::new("1nc1nerator11111111111111111111111111111111").is_ok());
        assert!(MintAddress::new(MintAddress::SOL).is_ok());
    }

    #[test]
    fn rejects_short_and_non_base58() {
        assert!(WalletAddress::new("abc").is_err());
        // '0', 'O', 'I' and 'l' are not in the base58 alphabet.
        assert!(WalletAddress::new("0OIl0OIl0OIl0OIl0OIl0OIl0OIl0OIl").is_err());
        assert_eq!(
            MintAddress::new("short"),
            Err(FomoError::InvalidMint("short".into()))
        );
    }

    #[test]
    fn deserialization_validates() {
        let ok: Result<WalletAddress, _> =
            serde_json::from_str("\"jQW54EhGhwunKjHeBWTVzp2AuN6N5Zs555URT2ACtav\"");
        assert!(ok.is_ok());
        let bad: Result<WalletAddress, _> = serde_json::from_str("\"not-an-address\"");
        assert!(bad.is_err());
    }
}

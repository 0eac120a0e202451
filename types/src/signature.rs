//! Transaction signature references.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::FomoError;

/// A base58-encoded ledger transaction signature (64 bytes → 64..=88 chars).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxSignature(String);

impl TxSignature {
    pub fn new(raw: impl Into<String>) -> Result<Self, FomoError> {
        let s = raw.into();
        let well_formed = (64..=88).contains(&s.len())
            && s.chars().all(|c| c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l'));
        if well_formed {
            Ok(Self(s))
        } else {
            Err(FomoError::InvalidSignature(s))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TxSignature {
    type Err = FomoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TxSignature {
    type Error = FomoError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<TxSignature> for String {
    fn from(s: TxSignature) -> Self {
        s.0
    }
}

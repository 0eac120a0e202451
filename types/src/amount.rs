//! Token amounts.
//!
//! Amounts are raw integer units (`u64`, matching the token program's native
//! width). Configured costs are expressed in whole tokens and converted with
//! the mint's decimal precision.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

use crate::FomoError;

/// A token amount in raw (smallest) units.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TokenAmount(u64);

impl TokenAmount {
    pub const ZERO: Self = Self(0);

    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Convert a whole-token quantity into raw units for a mint with `decimals`.
    pub fn from_whole(tokens: u64, decimals: u8) -> Result<Self, FomoError> {
        10u64
            .checked_pow(u32::from(decimals))
            .and_then(|scale| tokens.checked_mul(scale))
            .map(Self)
            .ok_or(FomoError::AmountOverflow(tokens, decimals))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Render with a decimal point, trimming trailing zeros (`12.5`, `10000`).
    pub fn to_ui_string(&self, decimals: u8) -> String {
        if decimals == 0 {
            return self.0.to_string();
        }
        let scale = 10u128.pow(u32::from(decimals));
        let whole = u128::from(self.0) / scale;
        let frac = u128::from(self.0) % scale;
        if frac == 0 {
            return whole.to_string();
        }
        let frac = format!("{:0width$}", frac, width = decimals as usize);
        format!("{}.{}", whole, frac.trim_end_matches('0'))
    }
}

impl Add for TokenAmount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

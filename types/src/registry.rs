//! Listed-token registry, listing applications and trade history records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{FomoError, MintAddress, Timestamp, TxSignature, WalletAddress};

/// A tradeable asset shown in the token browser. Mint addresses are unique
/// within the listed set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedToken {
    pub id: Uuid,
    pub mint_address: MintAddress,
    pub symbol: String,
    pub name: String,
    pub logo_uri: Option<String>,
    pub decimals: u8,
    pub listed_by: Option<String>,
    pub telegram: Option<String>,
    pub twitter: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub created_at: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewListedToken {
    pub mint_address: MintAddress,
    pub symbol: String,
    pub name: String,
    pub logo_uri: Option<String>,
    pub decimals: u8,
    pub listed_by: Option<String>,
    pub telegram: Option<String>,
    pub twitter: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = FomoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(FomoError::UnknownVariant {
                kind: "application status",
                value: s.to_string(),
            }),
        }
    }
}

/// A request from a project team to get its token listed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingApplication {
    pub id: Uuid,
    pub mint_address: MintAddress,
    pub symbol: String,
    pub name: String,
    pub logo_uri: Option<String>,
    pub telegram: Option<String>,
    pub twitter: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub contact_email: Option<String>,
    /// Paid fast-track requested. Recorded only; no payment is wired to it.
    pub expedite: bool,
    pub status: ApplicationStatus,
    pub created_at: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewListingApplication {
    pub mint_address: MintAddress,
    pub symbol: String,
    pub name: String,
    pub logo_uri: Option<String>,
    pub telegram: Option<String>,
    pub twitter: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub contact_email: Option<String>,
    pub expedite: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// A swap executed from the trading panel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: Uuid,
    pub wallet_address: WalletAddress,
    pub tx_signature: TxSignature,
    pub token_symbol: String,
    pub side: TradeSide,
    pub amount_in: f64,
    pub amount_out: f64,
    pub created_at: Timestamp,
}

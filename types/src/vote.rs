//! Vote records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{FomoError, ProposalId, Timestamp, TxSignature, WalletAddress};

/// The side a vote is cast on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteChoice {
    For,
    Against,
}

impl VoteChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::For => "for",
            Self::Against => "against",
        }
    }
}

impl fmt::Display for VoteChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteChoice {
    type Err = FomoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "for" => Ok(Self::For),
            "against" => Ok(Self::Against),
            _ => Err(FomoError::UnknownVariant {
                kind: "vote choice",
                value: s.to_string(),
            }),
        }
    }
}

/// A single accepted vote. Immutable once written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: Uuid,
    pub proposal_id: ProposalId,
    pub voter: WalletAddress,
    pub choice: VoteChoice,
    /// Weighted amount added to the proposal's `total_votes`.
    pub weight: u64,
    pub burn_tx: TxSignature,
    pub reward_tx: TxSignature,
    pub created_at: Timestamp,
}

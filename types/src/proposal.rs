//! Governance proposals.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{FomoError, Timestamp, WalletAddress};

/// Human-readable sequential proposal code (`FIP-001`, `FIP-002`, ...).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProposalId(String);

impl ProposalId {
    pub const PREFIX: &'static str = "FIP-";

    /// The id assigned to the `seq`-th proposal (1-based).
    pub fn from_sequence(seq: u64) -> Self {
        Self(format!("{}{:03}", Self::PREFIX, seq))
    }

    pub fn parse(raw: impl Into<String>) -> Result<Self, FomoError> {
        let s = raw.into();
        match s.strip_prefix(Self::PREFIX) {
            Some(digits) if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) => {
                Ok(Self(s))
            }
            _ => Err(FomoError::InvalidProposalId(s)),
        }
    }

    pub fn sequence(&self) -> u64 {
        self.0[Self::PREFIX.len()..].parse().unwrap_or(0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ProposalId {
    type Err = FomoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ProposalId {
    type Error = FomoError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<ProposalId> for String {
    fn from(id: ProposalId) -> Self {
        id.0
    }
}

/// Lifecycle status. Only `Active` is ever assigned by this codebase; the
/// other states are set externally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Pending,
    Active,
    Passed,
    Rejected,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Passed => "passed",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enumerated proposal tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalCategory {
    Protocol,
    Treasury,
    Listing,
    Marketing,
    Other,
}

impl FromStr for ProposalCategory {
    type Err = FomoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "protocol" => Ok(Self::Protocol),
            "treasury" => Ok(Self::Treasury),
            "listing" => Ok(Self::Listing),
            "marketing" => Ok(Self::Marketing),
            "other" => Ok(Self::Other),
            _ => Err(FomoError::UnknownVariant {
                kind: "proposal category",
                value: s.to_string(),
            }),
        }
    }
}

/// A governance proposal as persisted by the data store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub title: String,
    pub description: String,
    pub category: ProposalCategory,
    pub status: ProposalStatus,
    /// Count of accepted `for` vote records.
    pub votes_for: u64,
    /// Count of accepted `against` vote records.
    pub votes_against: u64,
    /// Burn-weighted counter: grows by the burn amount on every accepted vote.
    pub total_votes: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Display string, not an identity.
    pub author: String,
    /// Receives the creator reward. Not an access-control owner.
    pub creator_wallet: WalletAddress,
    pub created_at: Timestamp,
}

impl Proposal {
    /// Number of accepted vote records.
    pub fn vote_count(&self) -> u64 {
        self.votes_for + self.votes_against
    }
}

/// Fields supplied when inserting a proposal; the store assigns id,
/// tallies, status and creation time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProposal {
    pub title: String,
    pub description: String,
    pub category: ProposalCategory,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub author: String,
    pub creator_wallet: WalletAddress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_are_zero_padded() {
        assert_eq!(ProposalId::from_sequence(1).as_str(), "FIP-001");
        assert_eq!(ProposalId::from_sequence(1234).as_str(), "FIP-1234");
        assert_eq!(ProposalId::from_sequence(42).sequence(), 42);
    }

    #[test]
    fn parse_rejects_foreign_ids() {
        assert!(ProposalId::parse("FIP-007").is_ok());
        assert!(ProposalId::parse("FIP-").is_err());
        assert!(ProposalId::parse("BIP-001").is_err());
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("Treasury".parse::<ProposalCategory>(), Ok(ProposalCategory::Treasury));
        assert!("governance".parse::<ProposalCategory>().is_err());
    }
}

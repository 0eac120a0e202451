//! Persisted state machine for the two-step governance payment.
//!
//! A record is written in `Initiated` before the first transfer and advanced
//! after every confirmation, so an interrupted flow can be resumed or flagged
//! for reconciliation.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{NewProposal, ProposalId, Timestamp, TxSignature, VoteChoice, WalletAddress};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Initiated,
    BurnConfirmed,
    RewardConfirmed,
    Recorded,
    /// Failed before any funds moved.
    Abandoned,
    /// Funds moved but the store write failed; needs manual reconciliation.
    NeedsReconciliation,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::BurnConfirmed => "burn_confirmed",
            Self::RewardConfirmed => "reward_confirmed",
            Self::Recorded => "recorded",
            Self::Abandoned => "abandoned",
            Self::NeedsReconciliation => "needs_reconciliation",
        }
    }
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the payment buys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentPurpose {
    Vote {
        proposal_id: ProposalId,
        choice: VoteChoice,
        creator: WalletAddress,
    },
    ProposalCreation {
        proposal: NewProposal,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub payer: WalletAddress,
    pub purpose: PaymentPurpose,
    pub state: PaymentState,
    pub burn_tx: Option<TxSignature>,
    pub reward_tx: Option<TxSignature>,
    /// Submitted for the current step but never confirmed; it may still land.
    pub pending_tx: Option<TxSignature>,
    /// Set once the vote or proposal row exists.
    pub recorded_proposal: Option<ProposalId>,
    pub failure: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PaymentRecord {
    pub fn new(payer: WalletAddress, purpose: PaymentPurpose, now: Timestamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            payer,
            purpose,
            state: PaymentState::Initiated,
            burn_tx: None,
            reward_tx: None,
            pending_tx: None,
            recorded_proposal: None,
            failure: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Terminal states need no further action.
    pub fn is_settled(&self) -> bool {
        matches!(self.state, PaymentState::Recorded | PaymentState::Abandoned)
    }

    /// Whether any transfer has confirmed for this payment.
    pub fn funds_moved(&self) -> bool {
        self.burn_tx.is_some() || self.reward_tx.is_some()
    }

    /// Which step the pending signature belongs to: the burn until it has
    /// confirmed, the reward after.
    pub fn pending_burn(&self) -> Option<&TxSignature> {
        self.pending_tx.as_ref().filter(|_| self.burn_tx.is_none())
    }

    pub fn pending_reward(&self) -> Option<&TxSignature> {
        self.pending_tx.as_ref().filter(|_| self.burn_tx.is_some())
    }

    pub fn advance(&mut self, state: PaymentState, now: Timestamp) {
        self.state = state;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(c: char) -> TxSignature {
        TxSignature::new(c.to_string().repeat(88)).unwrap()
    }

    fn vote_record() -> PaymentRecord {
        let payer = WalletAddress::new("jQW54EhGhwunKjHeBWTVzp2AuN6N5Zs555URT2ACtav").unwrap();
        let creator = WalletAddress::new("1nc1nerator11111111111111111111111111111111").unwrap();
        let purpose = PaymentPurpose::Vote {
            proposal_id: ProposalId::from_sequence(1),
            choice: VoteChoice::For,
            creator,
        };
        PaymentRecord::new(payer, purpose, Timestamp::new(10))
    }

    #[test]
    fn pending_signature_belongs_to_the_unconfirmed_step() {
        let mut record = vote_record();
        record.pending_tx = Some(sig('a'));
        assert_eq!(record.pending_burn(), Some(&sig('a')));
        assert_eq!(record.pending_reward(), None);
        assert!(!record.funds_moved());

        record.burn_tx = Some(sig('a'));
        record.pending_tx = Some(sig('b'));
        assert_eq!(record.pending_burn(), None);
        assert_eq!(record.pending_reward(), Some(&sig('b')));
    }

    #[test]
    fn pending_signature_survives_the_store_encoding() {
        let mut record = vote_record();
        record.burn_tx = Some(sig('a'));
        record.pending_tx = Some(sig('b'));
        record.advance(PaymentState::NeedsReconciliation, Timestamp::new(20));
        let bytes = bincode::serialize(&record).unwrap();
        let back: PaymentRecord = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, record);
    }
}

//! Ledger writer: persists the vote or proposal once payment confirmed.
//!
//! The daily cap, signature reuse and the tally increment are enforced by
//! the store inside one atomic operation.

use std::sync::Arc;

use fomo_store::{GovernanceStore, RecordedVote, VoteInsert};
use fomo_types::{
    NewProposal, Proposal, ProposalId, Timestamp, TxSignature, VoteChoice, WalletAddress,
};
use tracing::{error, info};

use crate::LedgerWriteError;

pub struct LedgerWriter<S> {
    store: Arc<S>,
    vote_weight: u64,
    max_votes_per_day: u32,
}

/// A paid vote ready to be recorded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaidVote {
    pub proposal_id: ProposalId,
    pub voter: WalletAddress,
    pub choice: VoteChoice,
    pub burn_tx: TxSignature,
    pub reward_tx: TxSignature,
}

impl<S: GovernanceStore> LedgerWriter<S> {
    /// `vote_weight` is the burn amount in whole tokens.
    pub fn new(store: Arc<S>, vote_weight: u64, max_votes_per_day: u32) -> Self {
        Self {
            store,
            vote_weight,
            max_votes_per_day,
        }
    }

    pub fn record_vote(
        &self,
        vote: PaidVote,
        now: Timestamp,
    ) -> Result<RecordedVote, LedgerWriteError> {
        let insert = VoteInsert {
            proposal_id: vote.proposal_id.clone(),
            voter: vote.voter.clone(),
            choice: vote.choice,
            weight: self.vote_weight,
            burn_tx: vote.burn_tx.clone(),
            reward_tx: vote.reward_tx.clone(),
            created_at: now,
        };
        match self.store.record_vote(insert, self.max_votes_per_day) {
            Ok(recorded) => {
                info!(
                    proposal = %recorded.proposal.id,
                    wallet = %recorded.vote.voter,
                    choice = %recorded.vote.choice,
                    total_votes = recorded.proposal.total_votes,
                    "vote recorded"
                );
                Ok(recorded)
            }
            Err(source) => {
                error!(
                    proposal = %vote.proposal_id,
                    wallet = %vote.voter,
                    burn_tx = %vote.burn_tx,
                    reward_tx = %vote.reward_tx,
                    error = %source,
                    "vote payment confirmed but not recorded"
                );
                Err(LedgerWriteError {
                    burn_tx: vote.burn_tx,
                    reward_tx: Some(vote.reward_tx),
                    source,
                })
            }
        }
    }

    pub fn record_proposal(
        &self,
        proposal: NewProposal,
        burn_tx: TxSignature,
        now: Timestamp,
    ) -> Result<Proposal, LedgerWriteError> {
        let creator = proposal.creator_wallet.clone();
        match self.store.insert_paid_proposal(proposal, &burn_tx, now) {
            Ok(row) => {
                info!(proposal = %row.id, wallet = %creator, burn_tx = %burn_tx, "proposal created");
                Ok(row)
            }
            Err(source) => {
                error!(
                    wallet = %creator,
                    burn_tx = %burn_tx,
                    error = %source,
                    "proposal payment confirmed but not recorded"
                );
                Err(LedgerWriteError {
                    burn_tx,
                    reward_tx: None,
                    source,
                })
            }
        }
    }
}

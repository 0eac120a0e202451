//! Vote storage trait.

use crate::StoreError;
use fomo_types::{
    DayIndex, Proposal, ProposalId, Timestamp, TxSignature, Vote, VoteChoice, WalletAddress,
};

/// A vote to be recorded after both payments confirmed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteInsert {
    pub proposal_id: ProposalId,
    pub voter: WalletAddress,
    pub choice: VoteChoice,
    /// Added to the proposal's `total_votes`.
    pub weight: u64,
    pub burn_tx: TxSignature,
    pub reward_tx: TxSignature,
    pub created_at: Timestamp,
}

/// Result of an accepted vote: the row, and the proposal after the increment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedVote {
    pub vote: Vote,
    pub proposal: Proposal,
    /// Votes by this wallet on this proposal today, including this one.
    pub votes_today: u32,
}

pub trait VoteStore {
    /// Record a vote in one atomic operation:
    /// - the proposal must exist,
    /// - neither signature may have been used by an earlier vote,
    /// - the wallet must have fewer than `max_per_day` votes on the proposal
    ///   on the vote's calendar day,
    /// - the vote row is inserted, the chosen side's count grows by 1 and
    ///   `total_votes` grows by `weight`.
    fn record_vote(&self, vote: VoteInsert, max_per_day: u32) -> Result<RecordedVote, StoreError>;

    fn votes_today(
        &self,
        proposal: &ProposalId,
        wallet: &WalletAddress,
        day: DayIndex,
    ) -> Result<u32, StoreError>;

    /// Every vote cast by `wallet`, newest first.
    fn votes_by_wallet(&self, wallet: &WalletAddress) -> Result<Vec<Vote>, StoreError>;

    fn votes_for_proposal(&self, proposal: &ProposalId) -> Result<Vec<Vote>, StoreError>;
}

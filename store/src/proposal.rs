//! Proposal storage trait.

use crate::StoreError;
use fomo_types::{NewProposal, Proposal, ProposalId, Timestamp, TxSignature, WalletAddress};

pub trait ProposalStore {
    /// All proposals, newest first.
    fn list_proposals(&self) -> Result<Vec<Proposal>, StoreError>;

    fn get_proposal(&self, id: &ProposalId) -> Result<Option<Proposal>, StoreError>;

    /// The wallet that receives the creator reward, read fresh from the store.
    fn proposal_creator(&self, id: &ProposalId) -> Result<Option<WalletAddress>, StoreError> {
        Ok(self.get_proposal(id)?.map(|p| p.creator_wallet))
    }

    /// Insert a proposal with zeroed tallies and status `active`, assigning
    /// the next sequential id.
    fn insert_proposal(&self, proposal: NewProposal, now: Timestamp)
        -> Result<Proposal, StoreError>;

    /// [`ProposalStore::insert_proposal`] paid for by `burn_tx`: fails with
    /// [`StoreError::SignatureReused`] if the signature already paid for a
    /// vote or proposal, otherwise marks it used in the same operation.
    fn insert_paid_proposal(
        &self,
        proposal: NewProposal,
        burn_tx: &TxSignature,
        now: Timestamp,
    ) -> Result<Proposal, StoreError>;
}

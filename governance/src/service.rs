//! The vote and proposal workflows: gate → payment → record, strictly in
//! that order.

use std::sync::Arc;

use fomo_ledger::Ledger;
use fomo_store::{GovernanceStore, RecordedVote};
use fomo_types::{
    NewProposal, PaymentPurpose, PaymentRecord, PaymentState, Proposal, ProposalId, Timestamp,
    Vote, VoteChoice, WalletAddress,
};
use tracing::{error, info};
use uuid::Uuid;

use crate::payment::is_ready_to_record;
use crate::{
    EligibilityGate, GovernanceError, GovernanceParams, LedgerWriteError, LedgerWriter, PaidVote,
    PaymentOrchestrator, ProposalDraft, ValidationError, WalletSession,
};

/// Result of resuming a journaled payment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResumeOutcome {
    VoteRecorded(RecordedVote),
    ProposalRecorded(Proposal),
    /// Nothing left to do; the payment ended in this state.
    Settled(PaymentState),
    /// Still needs an operator (a burn that never confirmed).
    Unresolved(PaymentState),
}

pub struct GovernanceService<S> {
    store: Arc<S>,
    ledger: Arc<dyn Ledger>,
    params: GovernanceParams,
    gate: EligibilityGate,
    payments: PaymentOrchestrator<S>,
    writer: LedgerWriter<S>,
}

impl<S> GovernanceService<S>
where
    S: GovernanceStore + Send + Sync,
{
    pub fn new(
        store: Arc<S>,
        ledger: Arc<dyn Ledger>,
        params: GovernanceParams,
    ) -> Result<Self, GovernanceError> {
        params.validate()?;
        Ok(Self {
            gate: EligibilityGate::new(&params)?,
            payments: PaymentOrchestrator::new(Arc::clone(&store), Arc::clone(&ledger), params.clone())?,
            writer: LedgerWriter::new(Arc::clone(&store), params.burn_amount, params.max_votes_per_day),
            store,
            ledger,
            params,
        })
    }

    pub fn params(&self) -> &GovernanceParams {
        &self.params
    }

    pub fn gate(&self) -> &EligibilityGate {
        &self.gate
    }

    pub fn writer(&self) -> &LedgerWriter<S> {
        &self.writer
    }

    /// Connect a wallet: read its reward-token balance once.
    pub async fn wallet_session(
        &self,
        address: WalletAddress,
    ) -> Result<WalletSession, GovernanceError> {
        let balance = self
            .ledger
            .token_balance(&address, &self.params.reward_mint)
            .await?;
        Ok(WalletSession { address, balance })
    }

    pub async fn handle_vote(
        &self,
        wallet: Option<&WalletSession>,
        proposal_id: &ProposalId,
        choice: VoteChoice,
        now: Timestamp,
    ) -> Result<RecordedVote, GovernanceError> {
        let wallet = self.gate.require_wallet(wallet)?;
        let proposal = self
            .store
            .get_proposal(proposal_id)?
            .ok_or_else(|| ValidationError::ProposalNotFound(proposal_id.clone()))?;
        let today = self
            .store
            .votes_today(proposal_id, &wallet.address, now.day_index())?;
        self.gate.check_vote(Some(wallet), &proposal, today)?;

        let creator = self
            .store
            .proposal_creator(proposal_id)?
            .ok_or_else(|| ValidationError::ProposalNotFound(proposal_id.clone()))?;
        let record = self
            .payments
            .pay_for_vote(&wallet.address, proposal_id, choice, creator, now)
            .await?;
        self.finish_vote(record, now)
    }

    pub async fn handle_create_proposal(
        &self,
        wallet: Option<&WalletSession>,
        draft: ProposalDraft,
        now: Timestamp,
    ) -> Result<Proposal, GovernanceError> {
        self.gate.check_proposal(wallet, &draft, now.date())?;
        let wallet = self.gate.require_wallet(wallet)?;

        let proposal = NewProposal {
            title: draft.title.trim().to_string(),
            description: draft.description.trim().to_string(),
            category: draft.category,
            start_date: draft.start_date,
            end_date: draft.end_date,
            author: draft.author,
            creator_wallet: wallet.address.clone(),
        };
        let record = self
            .payments
            .pay_for_proposal(&wallet.address, proposal, now)
            .await?;
        self.finish_proposal(record, now)
    }

    /// Drive a journaled payment forward: abandon it, retry the reward
    /// step, or retry the store write, whichever applies.
    pub async fn resume_payment(
        &self,
        id: &Uuid,
        now: Timestamp,
    ) -> Result<ResumeOutcome, GovernanceError> {
        let record = self
            .store
            .get_payment(id)?
            .ok_or(GovernanceError::PaymentNotFound(*id))?;
        if record.is_settled() {
            return Ok(ResumeOutcome::Settled(record.state));
        }
        info!(payment = %id, state = %record.state, "resuming payment");

        let record = self.payments.resume(record, now).await?;
        if record.is_settled() {
            return Ok(ResumeOutcome::Settled(record.state));
        }
        if !is_ready_to_record(&record) {
            return Ok(ResumeOutcome::Unresolved(record.state));
        }
        let outcome = match record.purpose {
            PaymentPurpose::Vote { .. } => {
                self.finish_vote(record, now).map(ResumeOutcome::VoteRecorded)
            }
            PaymentPurpose::ProposalCreation { .. } => {
                self.finish_proposal(record, now).map(ResumeOutcome::ProposalRecorded)
            }
        };
        outcome.or_else(|e| match e {
            GovernanceError::LedgerWrite(ref w) if w.is_replay() => {
                Ok(ResumeOutcome::Settled(PaymentState::Recorded))
            }
            other => Err(other),
        })
    }

    pub fn proposals(&self) -> Result<Vec<Proposal>, GovernanceError> {
        Ok(self.store.list_proposals()?)
    }

    pub fn proposal(&self, id: &ProposalId) -> Result<Option<Proposal>, GovernanceError> {
        Ok(self.store.get_proposal(id)?)
    }

    pub fn user_votes(&self, wallet: &WalletAddress) -> Result<Vec<Vote>, GovernanceError> {
        Ok(self.store.votes_by_wallet(wallet)?)
    }

    pub fn votes_today(
        &self,
        proposal: &ProposalId,
        wallet: &WalletAddress,
        now: Timestamp,
    ) -> Result<u32, GovernanceError> {
        Ok(self.store.votes_today(proposal, wallet, now.day_index())?)
    }

    pub fn unsettled_payments(&self) -> Result<Vec<PaymentRecord>, GovernanceError> {
        Ok(self.store.unsettled_payments()?)
    }

    fn finish_vote(
        &self,
        mut record: PaymentRecord,
        now: Timestamp,
    ) -> Result<RecordedVote, GovernanceError> {
        let (proposal_id, choice) = match &record.purpose {
            PaymentPurpose::Vote {
                proposal_id, choice, ..
            } => (proposal_id.clone(), *choice),
            PaymentPurpose::ProposalCreation { .. } => {
                return Err(GovernanceError::IncompletePayment(record.id))
            }
        };
        let (Some(burn_tx), Some(reward_tx)) = (record.burn_tx.clone(), record.reward_tx.clone())
        else {
            return Err(GovernanceError::IncompletePayment(record.id));
        };
        let paid = PaidVote {
            proposal_id: proposal_id.clone(),
            voter: record.payer.clone(),
            choice,
            burn_tx,
            reward_tx,
        };
        match self.writer.record_vote(paid, now) {
            Ok(recorded) => {
                record.recorded_proposal = Some(proposal_id);
                self.settle(&mut record, now);
                Ok(recorded)
            }
            Err(e) => Err(self.write_failed(&mut record, e, now)),
        }
    }

    fn finish_proposal(
        &self,
        mut record: PaymentRecord,
        now: Timestamp,
    ) -> Result<Proposal, GovernanceError> {
        let proposal = match &record.purpose {
            PaymentPurpose::ProposalCreation { proposal } => proposal.clone(),
            PaymentPurpose::Vote { .. } => return Err(GovernanceError::IncompletePayment(record.id)),
        };
        let Some(burn_tx) = record.burn_tx.clone() else {
            return Err(GovernanceError::IncompletePayment(record.id));
        };
        match self.writer.record_proposal(proposal, burn_tx, now) {
            Ok(row) => {
                record.recorded_proposal = Some(row.id.clone());
                self.settle(&mut record, now);
                Ok(row)
            }
            Err(e) => Err(self.write_failed(&mut record, e, now)),
        }
    }

    fn settle(&self, record: &mut PaymentRecord, now: Timestamp) {
        record.failure = None;
        record.advance(PaymentState::Recorded, now);
        if let Err(e) = self.store.put_payment(record) {
            error!(payment = %record.id, error = %e, "record written but payment journal not settled");
        }
    }

    fn write_failed(
        &self,
        record: &mut PaymentRecord,
        err: LedgerWriteError,
        now: Timestamp,
    ) -> GovernanceError {
        if err.is_replay() {
            record.advance(PaymentState::Recorded, now);
        } else {
            record.failure = Some(err.source.to_string());
            record.advance(PaymentState::NeedsReconciliation, now);
        }
        if let Err(e) = self.store.put_payment(record) {
            error!(payment = %record.id, error = %e, "failed to journal payment state");
        }
        err.into()
    }
}

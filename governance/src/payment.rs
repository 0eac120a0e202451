//! Payment orchestrator: the burn and creator-reward transfers that must
//! confirm before a vote (or the single burn before a proposal) is recorded.
//!
//! A [`PaymentRecord`] is journaled in `Initiated` before the first transfer
//! and re-journaled after each confirmation, so an interrupted payment can be
//! resumed without burning twice.

use std::sync::Arc;

use fomo_ledger::{ConfirmationStatus, Ledger, TransferRequest};
use fomo_store::PaymentJournal;
use fomo_types::{
    NewProposal, PaymentPurpose, PaymentRecord, PaymentState, ProposalId, Timestamp, TokenAmount,
    TxSignature, VoteChoice, WalletAddress,
};
use tracing::{error, info, warn};

use crate::{GovernanceError, GovernanceParams, PaymentError, PaymentStep, TransferFailure};

pub struct PaymentOrchestrator<S> {
    journal: Arc<S>,
    ledger: Arc<dyn Ledger>,
    params: GovernanceParams,
    burn: TokenAmount,
    reward: TokenAmount,
    creation: TokenAmount,
}

impl<S> PaymentOrchestrator<S>
where
    S: PaymentJournal + Send + Sync,
{
    pub fn new(
        journal: Arc<S>,
        ledger: Arc<dyn Ledger>,
        params: GovernanceParams,
    ) -> Result<Self, GovernanceError> {
        Ok(Self {
            burn: params.burn_raw()?,
            reward: params.creator_reward_raw()?,
            creation: params.proposal_cost_raw()?,
            journal,
            ledger,
            params,
        })
    }

    /// Burn then reward for a vote. `creator` must have been read from the
    /// store immediately before this call.
    pub async fn pay_for_vote(
        &self,
        payer: &WalletAddress,
        proposal_id: &ProposalId,
        choice: VoteChoice,
        creator: WalletAddress,
        now: Timestamp,
    ) -> Result<PaymentRecord, GovernanceError> {
        let purpose = PaymentPurpose::Vote {
            proposal_id: proposal_id.clone(),
            choice,
            creator,
        };
        let mut record = PaymentRecord::new(payer.clone(), purpose, now);
        self.journal.put_payment(&record)?;
        info!(payment = %record.id, wallet = %payer, proposal = %proposal_id, "vote payment initiated");

        self.burn_step(&mut record, PaymentStep::Burn, now).await?;
        self.reward_step(&mut record, now).await?;
        Ok(record)
    }

    /// Burn the proposal-creation cost.
    pub async fn pay_for_proposal(
        &self,
        payer: &WalletAddress,
        proposal: NewProposal,
        now: Timestamp,
    ) -> Result<PaymentRecord, GovernanceError> {
        let purpose = PaymentPurpose::ProposalCreation { proposal };
        let mut record = PaymentRecord::new(payer.clone(), purpose, now);
        self.journal.put_payment(&record)?;
        info!(payment = %record.id, wallet = %payer, "proposal payment initiated");

        self.burn_step(&mut record, PaymentStep::Creation, now).await?;
        Ok(record)
    }

    /// Continue an unsettled payment up to the point where it can be
    /// recorded. A transfer submitted earlier is re-confirmed before anything
    /// new is sent; a payment with no burn on chain is abandoned instead of
    /// burned again.
    pub async fn resume(
        &self,
        mut record: PaymentRecord,
        now: Timestamp,
    ) -> Result<PaymentRecord, GovernanceError> {
        if record.is_settled() || is_ready_to_record(&record) {
            return Ok(record);
        }
        if let Some(sig) = record.pending_burn().cloned() {
            match self.confirm_signature(sig).await {
                Ok(sig) => {
                    record.burn_tx = Some(sig.clone());
                    record.pending_tx = None;
                    record.failure = None;
                    record.advance(PaymentState::BurnConfirmed, now);
                    self.journal.put_payment(&record)?;
                    info!(payment = %record.id, burn_tx = %sig, "pending burn confirmed");
                }
                Err(TransferFailure::ConfirmationFailed(reason)) => {
                    record.pending_tx = None;
                    record.failure = Some(format!("burn failed on chain ({reason})"));
                    record.advance(PaymentState::Abandoned, now);
                    self.journal.put_payment(&record)?;
                    warn!(payment = %record.id, %reason, "pending burn failed on chain; abandoned");
                    return Ok(record);
                }
                Err(kind) => return self.still_pending(record, kind, now),
            }
        }
        if record.burn_tx.is_none() {
            if record.state == PaymentState::NeedsReconciliation {
                // No signature to check; only an operator can tell.
                return Ok(record);
            }
            record.failure = Some("interrupted before the burn confirmed".into());
            record.advance(PaymentState::Abandoned, now);
            self.journal.put_payment(&record)?;
            warn!(payment = %record.id, "abandoned payment without a confirmed burn");
            return Ok(record);
        }
        if let Some(sig) = record.pending_reward().cloned() {
            match self.confirm_signature(sig).await {
                Ok(sig) => {
                    record.reward_tx = Some(sig.clone());
                    record.pending_tx = None;
                    record.failure = None;
                    record.advance(PaymentState::RewardConfirmed, now);
                    self.journal.put_payment(&record)?;
                    info!(payment = %record.id, reward_tx = %sig, "pending creator reward confirmed");
                    return Ok(record);
                }
                Err(TransferFailure::ConfirmationFailed(reason)) => {
                    // Landed with an error; no tokens moved.
                    warn!(payment = %record.id, %reason, "pending creator reward failed on chain");
                    record.pending_tx = None;
                }
                Err(kind) => return self.still_pending(record, kind, now),
            }
        }
        if matches!(record.purpose, PaymentPurpose::Vote { .. }) && record.reward_tx.is_none() {
            self.reward_step(&mut record, now).await?;
        }
        Ok(record)
    }

    /// The earlier transfer is still unconfirmed; keep waiting on it.
    fn still_pending(
        &self,
        mut record: PaymentRecord,
        kind: TransferFailure,
        now: Timestamp,
    ) -> Result<PaymentRecord, GovernanceError> {
        warn!(payment = %record.id, error = %kind, "pending transfer still unconfirmed");
        record.failure = Some(kind.to_string());
        record.updated_at = now;
        self.journal.put_payment(&record)?;
        Ok(record)
    }

    fn burn_request(&self, payer: &WalletAddress, amount: TokenAmount) -> TransferRequest {
        TransferRequest {
            from: payer.clone(),
            to: self.params.burn_address.clone(),
            mint: self.params.reward_mint.clone(),
            amount,
            decimals: self.params.reward_decimals,
        }
    }

    async fn burn_step(
        &self,
        record: &mut PaymentRecord,
        step: PaymentStep,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        let amount = match step {
            PaymentStep::Creation => self.creation,
            _ => self.burn,
        };
        let request = self.burn_request(&record.payer, amount);
        match self.transfer_and_confirm(&request).await {
            Ok(sig) => {
                record.burn_tx = Some(sig.clone());
                record.pending_tx = None;
                record.advance(PaymentState::BurnConfirmed, now);
                self.journal_best_effort(record);
                info!(payment = %record.id, burn_tx = %sig, "burn confirmed");
                Ok(())
            }
            Err(kind) => {
                record.failure = Some(kind.to_string());
                record.pending_tx = kind.pending_signature().cloned();
                let state = if kind.may_have_moved_funds() {
                    PaymentState::NeedsReconciliation
                } else {
                    PaymentState::Abandoned
                };
                record.advance(state, now);
                self.journal_best_effort(record);
                warn!(payment = %record.id, %step, error = %kind, "burn transfer failed");
                Err(PaymentError {
                    payment_id: record.id,
                    step,
                    kind,
                    burn_tx: None,
                }
                .into())
            }
        }
    }

    async fn reward_step(
        &self,
        record: &mut PaymentRecord,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        let creator = match &record.purpose {
            PaymentPurpose::Vote { creator, .. } => creator.clone(),
            PaymentPurpose::ProposalCreation { .. } => return Ok(()),
        };
        let burn_tx = record.burn_tx.clone();
        let request = TransferRequest {
            from: record.payer.clone(),
            to: creator,
            mint: self.params.reward_mint.clone(),
            amount: self.reward,
            decimals: self.params.reward_decimals,
        };
        match self.transfer_and_confirm(&request).await {
            Ok(sig) => {
                record.reward_tx = Some(sig.clone());
                record.pending_tx = None;
                record.failure = None;
                record.advance(PaymentState::RewardConfirmed, now);
                self.journal_best_effort(record);
                info!(payment = %record.id, reward_tx = %sig, "creator reward confirmed");
                Ok(())
            }
            Err(kind) => {
                record.failure = Some(kind.to_string());
                record.pending_tx = kind.pending_signature().cloned();
                record.advance(PaymentState::NeedsReconciliation, now);
                self.journal_best_effort(record);
                error!(
                    payment = %record.id,
                    wallet = %record.payer,
                    burn_tx = %burn_tx.as_ref().map(TxSignature::as_str).unwrap_or("-"),
                    error = %kind,
                    "creator reward failed after burn; needs reconciliation"
                );
                Err(PaymentError {
                    payment_id: record.id,
                    step: PaymentStep::Reward,
                    kind,
                    burn_tx,
                }
                .into())
            }
        }
    }

    async fn transfer_and_confirm(
        &self,
        request: &TransferRequest,
    ) -> Result<TxSignature, TransferFailure> {
        let sig = self.ledger.transfer(request).await?;
        self.confirm_signature(sig).await
    }

    /// Once a signature exists, any error checking it leaves the transfer
    /// unconfirmed rather than failed.
    async fn confirm_signature(&self, sig: TxSignature) -> Result<TxSignature, TransferFailure> {
        match self.ledger.confirm(&sig).await {
            Ok(ConfirmationStatus::Confirmed) => Ok(sig),
            Ok(ConfirmationStatus::Failed(reason)) => {
                Err(TransferFailure::ConfirmationFailed(reason))
            }
            Ok(ConfirmationStatus::TimedOut) => Err(TransferFailure::Timeout(sig)),
            Err(e) => Err(TransferFailure::Unconfirmed {
                signature: sig,
                reason: e.to_string(),
            }),
        }
    }

    /// After a transfer was attempted, a journal failure must not hide the
    /// transfer outcome from the caller; it is logged with the record.
    fn journal_best_effort(&self, record: &PaymentRecord) {
        if let Err(e) = self.journal.put_payment(record) {
            error!(
                payment = %record.id,
                state = %record.state,
                burn_tx = ?record.burn_tx,
                reward_tx = ?record.reward_tx,
                pending_tx = ?record.pending_tx,
                error = %e,
                "failed to journal payment state"
            );
        }
    }
}

/// All transfers the purpose needs have confirmed.
pub fn is_ready_to_record(record: &PaymentRecord) -> bool {
    match record.purpose {
        PaymentPurpose::Vote { .. } => record.burn_tx.is_some() && record.reward_tx.is_some(),
        PaymentPurpose::ProposalCreation { .. } => record.burn_tx.is_some(),
    }
}

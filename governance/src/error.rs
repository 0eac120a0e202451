//! Governance error taxonomy.
//!
//! - [`ValidationError`]: an eligibility check failed; nothing happened.
//! - [`PaymentError`]: a transfer failed; which step failed tells whether the
//!   burn already moved funds.
//! - [`LedgerWriteError`]: every payment confirmed but the store refused the
//!   record; funds moved and nothing was recorded.

use fomo_ledger::LedgerError;
use fomo_store::StoreError;
use fomo_types::{ProposalId, ProposalStatus, TxSignature};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please connect your wallet first.")]
    WalletNotConnected,

    #[error("Insufficient FOMO balance: {need} required, you have {have}.")]
    InsufficientBalance { need: String, have: String },

    #[error("Proposal {0} not found.")]
    ProposalNotFound(ProposalId),

    #[error("Voting is closed: this proposal is {0}.")]
    ProposalNotActive(ProposalStatus),

    #[error("Daily vote limit reached: {cap} votes per proposal per day.")]
    DailyCapReached { cap: u32 },

    #[error("Please enter a proposal title.")]
    EmptyTitle,

    #[error("Please enter a proposal description.")]
    EmptyDescription,

    #[error("Start date cannot be in the past.")]
    StartInPast,

    #[error("End date must be after the start date.")]
    EndNotAfterStart,

    #[error("Proposals can run for at most {max} days (requested {days}).")]
    DurationTooLong { days: i64, max: u32 },
}

/// Which transfer of the governance payment failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentStep {
    /// Vote burn to the burn sink.
    Burn,
    /// Vote reward to the proposal creator.
    Reward,
    /// Proposal-creation cost to the burn sink.
    Creation,
}

impl fmt::Display for PaymentStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Burn => "burn",
            Self::Reward => "creator reward",
            Self::Creation => "proposal creation",
        })
    }
}

/// Why a transfer did not confirm.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TransferFailure {
    #[error("wallet not connected or signer unavailable ({0})")]
    SignerUnavailable(String),

    #[error("rejected by wallet ({0})")]
    Rejected(String),

    #[error("submission failed ({0})")]
    Submission(String),

    #[error("destination account creation failed ({0})")]
    AccountCreation(String),

    #[error("transaction failed on chain ({0})")]
    ConfirmationFailed(String),

    /// Submitted but not confirmed in time; it may still land.
    #[error("confirmation timed out for {0}")]
    Timeout(TxSignature),

    /// Submitted, then the status check itself failed; it may still land.
    #[error("could not confirm {signature} ({reason})")]
    Unconfirmed {
        signature: TxSignature,
        reason: String,
    },
}

impl TransferFailure {
    /// Whether tokens may have left the wallet despite the failure.
    pub fn may_have_moved_funds(&self) -> bool {
        self.pending_signature().is_some()
    }

    /// The submitted signature whose outcome is still unknown.
    pub fn pending_signature(&self) -> Option<&TxSignature> {
        match self {
            Self::Timeout(sig) | Self::Unconfirmed { signature: sig, .. } => Some(sig),
            _ => None,
        }
    }
}

impl From<LedgerError> for TransferFailure {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::SignerUnavailable(m) => Self::SignerUnavailable(m),
            LedgerError::Rejected(m) => Self::Rejected(m),
            LedgerError::AccountCreation(m) => Self::AccountCreation(m),
            LedgerError::Submission(m) => Self::Submission(m),
            LedgerError::Rpc(m) | LedgerError::InvalidResponse(m) => Self::Submission(m),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{step} transfer failed: {kind}")]
pub struct PaymentError {
    pub payment_id: Uuid,
    pub step: PaymentStep,
    pub kind: TransferFailure,
    /// Set when the burn confirmed before the failing step.
    pub burn_tx: Option<TxSignature>,
}

impl PaymentError {
    /// The burn went through and the reward did not.
    pub fn burned_without_reward(&self) -> bool {
        self.step == PaymentStep::Reward && self.burn_tx.is_some()
    }
}

#[derive(Debug, Error)]
#[error("payment confirmed but the record was not written: {source}")]
pub struct LedgerWriteError {
    pub burn_tx: TxSignature,
    pub reward_tx: Option<TxSignature>,
    #[source]
    pub source: StoreError,
}

impl LedgerWriteError {
    /// The signatures were already used by a recorded vote.
    pub fn is_replay(&self) -> bool {
        matches!(self.source, StoreError::SignatureReused(_))
    }

    pub fn signatures(&self) -> Vec<&TxSignature> {
        std::iter::once(&self.burn_tx).chain(self.reward_tx.as_ref()).collect()
    }
}

#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    LedgerWrite(#[from] LedgerWriteError),

    #[error("data store error: {0}")]
    Store(#[from] StoreError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("payment {0} not found")]
    PaymentNotFound(Uuid),

    #[error("payment {0} has no confirmed transfers to record")]
    IncompletePayment(Uuid),

    #[error("invalid governance parameters: {0}")]
    InvalidParams(String),
}

impl GovernanceError {
    /// Banner text for the person who triggered the action.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::Payment(e) if e.burned_without_reward() && e.kind.may_have_moved_funds() => {
                format!(
                    "Your burn succeeded (burn tx {}) and the creator reward ({}) may have been \
                     sent. Check your wallet before resuming payment id {}.",
                    e.burn_tx.as_ref().map(|s| s.as_str()).unwrap_or_default(),
                    e.kind,
                    e.payment_id
                )
            }
            Self::Payment(e) if e.burned_without_reward() => format!(
                "The creator reward transfer failed after your burn succeeded (burn tx {}). \
                 Your payment is saved; retry it with payment id {}.",
                e.burn_tx.as_ref().map(|s| s.as_str()).unwrap_or_default(),
                e.payment_id
            ),
            Self::Payment(e) if e.kind.may_have_moved_funds() => format!(
                "The {} transfer was sent but not confirmed ({}). \
                 Check your wallet before trying again.",
                e.step, e.kind
            ),
            Self::Payment(e) => format!(
                "The {} transfer failed: {}. No funds were moved.",
                e.step, e.kind
            ),
            Self::LedgerWrite(e) => {
                let ids: Vec<&str> = e.signatures().into_iter().map(|s| s.as_str()).collect();
                format!(
                    "Your payment went through but could not be recorded. \
                     Please contact support with these transaction IDs: {}",
                    ids.join(", ")
                )
            }
            Self::PaymentNotFound(id) => format!("Payment {id} not found."),
            Self::Store(_) | Self::Ledger(_) | Self::IncompletePayment(_) | Self::InvalidParams(_) => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fomo_nullables::test_signature;

    #[test]
    fn ledger_write_message_lists_both_signatures() {
        let err = GovernanceError::LedgerWrite(LedgerWriteError {
            burn_tx: test_signature(1),
            reward_tx: Some(test_signature(2)),
            source: StoreError::Backend("disk full".into()),
        });
        let msg = err.user_message();
        assert!(msg.contains("contact support"));
        assert!(msg.contains(test_signature(1).as_str()));
        assert!(msg.contains(test_signature(2).as_str()));
    }

    #[test]
    fn reward_failure_after_burn_is_distinguished() {
        let err = PaymentError {
            payment_id: Uuid::nil(),
            step: PaymentStep::Reward,
            kind: TransferFailure::Rejected("user declined".into()),
            burn_tx: Some(test_signature(3)),
        };
        assert!(err.burned_without_reward());
        let msg = GovernanceError::Payment(err).user_message();
        assert!(msg.contains("after your burn succeeded"));
    }

    #[test]
    fn burn_failure_reports_no_funds_moved() {
        let err = GovernanceError::Payment(PaymentError {
            payment_id: Uuid::nil(),
            step: PaymentStep::Burn,
            kind: TransferFailure::from(LedgerError::SignerUnavailable("no wallet".into())),
            burn_tx: None,
        });
        assert!(err.user_message().contains("No funds were moved"));
    }

    #[test]
    fn unconfirmed_reward_is_not_reported_as_retryable() {
        let err = GovernanceError::Payment(PaymentError {
            payment_id: Uuid::nil(),
            step: PaymentStep::Reward,
            kind: TransferFailure::Timeout(test_signature(4)),
            burn_tx: Some(test_signature(3)),
        });
        let msg = err.user_message();
        assert!(msg.contains("may have been sent"));
        assert!(!msg.contains("retry"));
    }

    #[test]
    fn status_check_error_keeps_the_signature() {
        let kind = TransferFailure::Unconfirmed {
            signature: test_signature(5),
            reason: "getSignatureStatuses: HTTP 503".into(),
        };
        assert!(kind.may_have_moved_funds());
        assert_eq!(kind.pending_signature(), Some(&test_signature(5)));
        let msg = GovernanceError::Payment(PaymentError {
            payment_id: Uuid::nil(),
            step: PaymentStep::Burn,
            kind,
            burn_tx: None,
        })
        .user_message();
        assert!(!msg.contains("No funds were moved"));
    }
}

//! Nullable ledger: scripted balances, transfers and confirmations.
//!
//! Every call is recorded so tests can assert exactly which ledger
//! operations a workflow performed (and that it performed none).

use async_trait::async_trait;
use fomo_ledger::{ConfirmationStatus, Ledger, LedgerError, TransferRequest};
use fomo_types::{MintAddress, TokenAmount, TxSignature, WalletAddress};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::fixtures::test_signature;

/// A ledger operation observed by [`NullLedger`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerCall {
    Balance {
        owner: WalletAddress,
        mint: MintAddress,
    },
    Transfer(TransferRequest),
    Confirm(TxSignature),
}

/// How the next transfer behaves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Submitted and confirmed; balances move.
    Succeed,
    /// The wallet holder declines to sign.
    Reject,
    /// No wallet connected.
    SignerUnavailable,
    /// The node refuses the signed transaction.
    SubmissionError,
    /// Creating the destination token account fails.
    AccountCreationError,
    /// Submitted, but lands on chain with an error.
    ConfirmFailed,
    /// Submitted, but never confirms.
    ConfirmTimeout,
    /// Lands and moves balances, but every status check fails with an RPC
    /// error until [`NullLedger::mark_confirmed`].
    ConfirmError,
}

#[derive(Default)]
struct State {
    balances: HashMap<(WalletAddress, MintAddress), TokenAmount>,
    calls: Vec<LedgerCall>,
    outcomes: VecDeque<TransferOutcome>,
    statuses: HashMap<TxSignature, ConfirmationStatus>,
    confirm_errors: HashSet<TxSignature>,
    next_signature: u64,
    balance_error: Option<String>,
}

/// An in-memory [`Ledger`]. Transfers succeed unless scripted otherwise.
#[derive(Default)]
pub struct NullLedger {
    state: Mutex<State>,
}

impl NullLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&self, owner: &WalletAddress, mint: &MintAddress, amount: TokenAmount) {
        self.lock()
            .balances
            .insert((owner.clone(), mint.clone()), amount);
    }

    /// Current balance without recording a call.
    pub fn balance_of(&self, owner: &WalletAddress, mint: &MintAddress) -> TokenAmount {
        self.lock()
            .balances
            .get(&(owner.clone(), mint.clone()))
            .copied()
            .unwrap_or(TokenAmount::ZERO)
    }

    /// Queue outcomes for the next transfers, in order.
    pub fn script(&self, outcomes: impl IntoIterator<Item = TransferOutcome>) {
        self.lock().outcomes.extend(outcomes);
    }

    /// Make balance queries fail with an RPC error.
    pub fn fail_balance_queries(&self, message: Option<&str>) {
        self.lock().balance_error = message.map(str::to_string);
    }

    /// Mark a signature produced elsewhere as confirmed.
    pub fn mark_confirmed(&self, signature: &TxSignature) {
        let mut state = self.lock();
        state.confirm_errors.remove(signature);
        state
            .statuses
            .insert(signature.clone(), ConfirmationStatus::Confirmed);
    }

    /// Transfers sent to `to`, in order.
    pub fn transfers_to(&self, to: &WalletAddress) -> Vec<TransferRequest> {
        self.transfers()
            .into_iter()
            .filter(|req| &req.to == to)
            .collect()
    }

    pub fn calls(&self) -> Vec<LedgerCall> {
        self.lock().calls.clone()
    }

    pub fn transfers(&self) -> Vec<TransferRequest> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                LedgerCall::Transfer(req) => Some(req.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn transfer_count(&self) -> usize {
        self.transfers().len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl State {
    fn issue_signature(&mut self, status: ConfirmationStatus) -> TxSignature {
        self.next_signature += 1;
        let sig = test_signature(1_000_000 + self.next_signature);
        self.statuses.insert(sig.clone(), status);
        sig
    }

    fn apply(&mut self, request: &TransferRequest) {
        let from = (request.from.clone(), request.mint.clone());
        let to = (request.to.clone(), request.mint.clone());
        let debited = self
            .balances
            .get(&from)
            .copied()
            .unwrap_or(TokenAmount::ZERO)
            .checked_sub(request.amount)
            .unwrap_or(TokenAmount::ZERO);
        self.balances.insert(from, debited);
        let credited = self
            .balances
            .get(&to)
            .copied()
            .unwrap_or(TokenAmount::ZERO)
            .saturating_add(request.amount);
        self.balances.insert(to, credited);
    }
}

#[async_trait]
impl Ledger for NullLedger {
    async fn token_balance(
        &self,
        owner: &WalletAddress,
        mint: &MintAddress,
    ) -> Result<TokenAmount, LedgerError> {
        let mut state = self.lock();
        state.calls.push(LedgerCall::Balance {
            owner: owner.clone(),
            mint: mint.clone(),
        });
        if let Some(message) = &state.balance_error {
            return Err(LedgerError::Rpc(message.clone()));
        }
        Ok(state
            .balances
            .get(&(owner.clone(), mint.clone()))
            .copied()
            .unwrap_or(TokenAmount::ZERO))
    }

    async fn transfer(&self, request: &TransferRequest) -> Result<TxSignature, LedgerError> {
        let mut state = self.lock();
        state.calls.push(LedgerCall::Transfer(request.clone()));
        let outcome = state.outcomes.pop_front().unwrap_or(TransferOutcome::Succeed);
        match outcome {
            TransferOutcome::Succeed => {
                state.apply(request);
                Ok(state.issue_signature(ConfirmationStatus::Confirmed))
            }
            TransferOutcome::Reject => Err(LedgerError::Rejected("User rejected the request.".into())),
            TransferOutcome::SignerUnavailable => {
                Err(LedgerError::SignerUnavailable("no wallet connected".into()))
            }
            TransferOutcome::SubmissionError => Err(LedgerError::Submission(
                "Transaction simulation failed: insufficient funds".into(),
            )),
            TransferOutcome::AccountCreationError => Err(LedgerError::AccountCreation(
                "could not create associated token account".into(),
            )),
            TransferOutcome::ConfirmFailed => Ok(state.issue_signature(ConfirmationStatus::Failed(
                "custom program error: 0x1".into(),
            ))),
            TransferOutcome::ConfirmTimeout => Ok(state.issue_signature(ConfirmationStatus::TimedOut)),
            TransferOutcome::ConfirmError => {
                state.apply(request);
                let sig = state.issue_signature(ConfirmationStatus::Confirmed);
                state.confirm_errors.insert(sig.clone());
                Ok(sig)
            }
        }
    }

    async fn confirm(&self, signature: &TxSignature) -> Result<ConfirmationStatus, LedgerError> {
        let mut state = self.lock();
        state.calls.push(LedgerCall::Confirm(signature.clone()));
        if state.confirm_errors.contains(signature) {
            return Err(LedgerError::Rpc("getSignatureStatuses: HTTP 503".into()));
        }
        Ok(state
            .statuses
            .get(signature)
            .cloned()
            .unwrap_or(ConfirmationStatus::TimedOut))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test_wallet;

    fn request(amount: u64) -> TransferRequest {
        TransferRequest {
            from: test_wallet(1),
            to: test_wallet(2),
            mint: MintAddress::sol(),
            amount: TokenAmount::new(amount),
            decimals: 9,
        }
    }

    #[tokio::test]
    async fn successful_transfer_moves_balance() {
        let ledger = NullLedger::new();
        ledger.set_balance(&test_wallet(1), &MintAddress::sol(), TokenAmount::new(100));
        let sig = ledger.transfer(&request(40)).await.unwrap();
        assert_eq!(ledger.confirm(&sig).await.unwrap(), ConfirmationStatus::Confirmed);
        assert_eq!(ledger.balance_of(&test_wallet(1), &MintAddress::sol()).raw(), 60);
        assert_eq!(ledger.balance_of(&test_wallet(2), &MintAddress::sol()).raw(), 40);
    }

    #[tokio::test]
    async fn scripted_outcomes_apply_in_order() {
        let ledger = NullLedger::new();
        ledger.script([TransferOutcome::Succeed, TransferOutcome::Reject]);
        assert!(ledger.transfer(&request(1)).await.is_ok());
        assert!(matches!(
            ledger.transfer(&request(1)).await,
            Err(LedgerError::Rejected(_))
        ));
        assert!(ledger.transfer(&request(1)).await.is_ok());
        assert_eq!(ledger.transfer_count(), 3);
    }

    #[tokio::test]
    async fn unknown_signature_never_confirms() {
        let ledger = NullLedger::new();
        let status = ledger.confirm(&test_signature(5)).await.unwrap();
        assert_eq!(status, ConfirmationStatus::TimedOut);
        ledger.mark_confirmed(&test_signature(5));
        let status = ledger.confirm(&test_signature(5)).await.unwrap();
        assert_eq!(status, ConfirmationStatus::Confirmed);
    }

    #[tokio::test]
    async fn status_check_errors_until_marked_confirmed() {
        let ledger = NullLedger::new();
        ledger.set_balance(&test_wallet(1), &MintAddress::sol(), TokenAmount::new(100));
        ledger.script([TransferOutcome::ConfirmError]);
        let sig = ledger.transfer(&request(40)).await.unwrap();
        assert!(matches!(ledger.confirm(&sig).await, Err(LedgerError::Rpc(_))));
        assert_eq!(ledger.balance_of(&test_wallet(2), &MintAddress::sol()).raw(), 40);
        ledger.mark_confirmed(&sig);
        assert_eq!(ledger.confirm(&sig).await.unwrap(), ConfirmationStatus::Confirmed);
    }
}

//! The ledger trait consumed by the governance workflow.

use async_trait::async_trait;
use fomo_types::{MintAddress, TokenAmount, TxSignature, WalletAddress};

use crate::LedgerError;

/// A token transfer from the acting wallet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferRequest {
    pub from: WalletAddress,
    pub to: WalletAddress,
    pub mint: MintAddress,
    pub amount: TokenAmount,
    pub decimals: u8,
}

/// Outcome of waiting for a submitted transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfirmationStatus {
    Confirmed,
    /// Landed on chain with an error.
    Failed(String),
    /// Not confirmed within the configured deadline.
    TimedOut,
}

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Total balance of `owner` across its token accounts for `mint`.
    async fn token_balance(
        &self,
        owner: &WalletAddress,
        mint: &MintAddress,
    ) -> Result<TokenAmount, LedgerError>;

    /// Build, sign and submit a transfer, creating the destination holding
    /// account first when absent. Returns once the transfer is submitted;
    /// callers confirm it with [`Ledger::confirm`].
    async fn transfer(&self, request: &TransferRequest) -> Result<TxSignature, LedgerError>;

    async fn confirm(&self, signature: &TxSignature) -> Result<ConfirmationStatus, LedgerError>;
}

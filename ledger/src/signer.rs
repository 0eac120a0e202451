//! Wallet signing seam.
//!
//! The acting wallet holds the key, so building and signing the transaction
//! happens behind [`TransferSigner`]. The ledger client only submits the
//! signed bytes.

use async_trait::async_trait;
use fomo_types::{MintAddress, WalletAddress};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::LedgerError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    /// Create the destination owner's associated token account for the mint.
    CreateAssociatedAccount,
    /// Checked token transfer between associated accounts.
    Transfer,
}

/// Everything a wallet needs to build one transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferPlan {
    pub kind: PlanKind,
    pub payer: WalletAddress,
    pub destination_owner: WalletAddress,
    pub mint: MintAddress,
    /// Raw units; zero for account creation.
    pub amount: u64,
    pub decimals: u8,
    pub recent_blockhash: String,
}

#[async_trait]
pub trait TransferSigner: Send + Sync {
    /// The wallet this signer signs for.
    fn payer(&self) -> &WalletAddress;

    /// Build and sign the planned transaction; returns it base64-encoded.
    async fn sign_transfer(&self, plan: &TransferPlan) -> Result<String, LedgerError>;
}

#[derive(Deserialize)]
struct SignResponse {
    signed_transaction: String,
}

/// A signer reached over HTTP (a wallet bridge). `POST {url}` with the plan as
/// JSON; `403` means the holder declined.
#[derive(Clone)]
pub struct RemoteSigner {
    http: reqwest::Client,
    url: String,
    payer: WalletAddress,
}

impl RemoteSigner {
    pub fn new(url: impl Into<String>, payer: WalletAddress) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LedgerError::SignerUnavailable(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            url: url.into(),
            payer,
        })
    }
}

#[async_trait]
impl TransferSigner for RemoteSigner {
    fn payer(&self) -> &WalletAddress {
        &self.payer
    }

    async fn sign_transfer(&self, plan: &TransferPlan) -> Result<String, LedgerError> {
        debug!(kind = ?plan.kind, to = %plan.destination_owner, "requesting signature");
        let response = self
            .http
            .post(&self.url)
            .json(plan)
            .send()
            .await
            .map_err(|e| LedgerError::SignerUnavailable(e.to_string()))?;

        match response.status() {
            StatusCode::FORBIDDEN => {
                let reason = response.text().await.unwrap_or_default();
                Err(LedgerError::Rejected(if reason.is_empty() {
                    "declined by wallet".to_string()
                } else {
                    reason
                }))
            }
            status if status.is_success() => {
                let body: SignResponse = response
                    .json()
                    .await
                    .map_err(|e| LedgerError::InvalidResponse(format!("signer: {e}")))?;
                Ok(body.signed_transaction)
            }
            status => Err(LedgerError::SignerUnavailable(format!(
                "signer returned HTTP {status}"
            ))),
        }
    }
}

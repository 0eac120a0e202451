//! Solana JSON-RPC implementation of [`Ledger`].

use async_trait::async_trait;
use fomo_types::{MintAddress, TokenAmount, TxSignature, WalletAddress};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::ledger::{ConfirmationStatus, Ledger, TransferRequest};
use crate::signer::{PlanKind, TransferPlan, TransferSigner};
use crate::LedgerError;

/// Connection settings for [`RpcLedger`].
#[derive(Clone, Debug)]
pub struct RpcLedgerConfig {
    pub url: String,
    pub request_timeout: Duration,
    /// How long [`Ledger::confirm`] waits before reporting a timeout.
    pub confirm_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for RpcLedgerConfig {
    fn default() -> Self {
        Self {
            url: "https://solana-rpc.publicnode.com".to_string(),
            request_timeout: Duration::from_secs(30),
            confirm_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(1_000),
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureStatus {
    err: Option<Value>,
    confirmation_status: Option<String>,
}

/// Ledger client over Solana JSON-RPC.
///
/// Reads (balances, confirmations) work without a signer; transfers need one.
#[derive(Clone)]
pub struct RpcLedger {
    http: reqwest::Client,
    config: RpcLedgerConfig,
    signer: Option<Arc<dyn TransferSigner>>,
    request_id: Arc<AtomicU64>,
}

impl RpcLedger {
    pub fn new(config: RpcLedgerConfig) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LedgerError::Rpc(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            config,
            signer: None,
            request_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Attach the acting wallet.
    pub fn with_signer(mut self, signer: Arc<dyn TransferSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        debug!(method, id, "ledger RPC request");

        let response = self
            .http
            .post(&self.config.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LedgerError::Rpc(format!("{method}: {e}")))?;

        if !response.status().is_success() {
            return Err(LedgerError::Rpc(format!(
                "{method}: HTTP {}",
                response.status()
            )));
        }

        let body: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(format!("{method}: {e}")))?;

        if let Some(err) = body.error {
            return Err(LedgerError::Rpc(format!(
                "{method}: {} ({})",
                err.message, err.code
            )));
        }
        body.result
            .ok_or_else(|| LedgerError::InvalidResponse(format!("{method}: missing result")))
    }

    /// Raw balances of every token account `owner` holds for `mint`.
    async fn token_accounts(
        &self,
        owner: &WalletAddress,
        mint: &MintAddress,
    ) -> Result<Vec<u64>, LedgerError> {
        let result = self
            .call(
                "getTokenAccountsByOwner",
                json!([owner.as_str(), { "mint": mint.as_str() }, { "encoding": "jsonParsed" }]),
            )
            .await?;

        let accounts = result
            .get("value")
            .and_then(Value::as_array)
            .ok_or_else(|| LedgerError::InvalidResponse("token accounts: missing value".into()))?;

        accounts
            .iter()
            .map(|account| {
                account
                    .pointer("/account/data/parsed/info/tokenAmount/amount")
                    .and_then(Value::as_str)
                    .and_then(|raw| raw.parse::<u64>().ok())
                    .ok_or_else(|| {
                        LedgerError::InvalidResponse("token account without parsed amount".into())
                    })
            })
            .collect()
    }

    async fn latest_blockhash(&self) -> Result<String, LedgerError> {
        let result = self
            .call("getLatestBlockhash", json!([{ "commitment": "confirmed" }]))
            .await?;
        result
            .pointer("/value/blockhash")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| LedgerError::InvalidResponse("latest blockhash: missing value".into()))
    }

    async fn submit(&self, signed_transaction: String) -> Result<TxSignature, LedgerError> {
        let result = self
            .call(
                "sendTransaction",
                json!([signed_transaction, { "encoding": "base64", "preflightCommitment": "confirmed" }]),
            )
            .await
            .map_err(|e| match e {
                LedgerError::Rpc(msg) => LedgerError::Submission(msg),
                other => other,
            })?;
        let raw = result
            .as_str()
            .ok_or_else(|| LedgerError::InvalidResponse("sendTransaction: not a string".into()))?;
        TxSignature::new(raw).map_err(|e| LedgerError::InvalidResponse(e.to_string()))
    }

    async fn signature_status(
        &self,
        signature: &TxSignature,
    ) -> Result<Option<SignatureStatus>, LedgerError> {
        let result = self
            .call(
                "getSignatureStatuses",
                json!([[signature.as_str()], { "searchTransactionHistory": true }]),
            )
            .await?;
        let status = result
            .pointer("/value/0")
            .cloned()
            .ok_or_else(|| LedgerError::InvalidResponse("signature statuses: missing value".into()))?;
        if status.is_null() {
            return Ok(None);
        }
        serde_json::from_value(status)
            .map(Some)
            .map_err(|e| LedgerError::InvalidResponse(format!("signature status: {e}")))
    }

    async fn sign_and_send(
        &self,
        signer: &dyn TransferSigner,
        kind: PlanKind,
        request: &TransferRequest,
    ) -> Result<TxSignature, LedgerError> {
        let plan = TransferPlan {
            kind,
            payer: request.from.clone(),
            destination_owner: request.to.clone(),
            mint: request.mint.clone(),
            amount: match kind {
                PlanKind::CreateAssociatedAccount => 0,
                PlanKind::Transfer => request.amount.raw(),
            },
            decimals: request.decimals,
            recent_blockhash: self.latest_blockhash().await?,
        };
        let signed = signer.sign_transfer(&plan).await?;
        self.submit(signed).await
    }

    async fn create_destination_account(
        &self,
        signer: &dyn TransferSigner,
        request: &TransferRequest,
    ) -> Result<(), LedgerError> {
        info!(owner = %request.to, mint = %request.mint, "creating destination token account");
        let signature = self
            .sign_and_send(signer, PlanKind::CreateAssociatedAccount, request)
            .await
            .map_err(|e| match e {
                e @ (LedgerError::Rejected(_) | LedgerError::SignerUnavailable(_)) => e,
                other => LedgerError::AccountCreation(other.to_string()),
            })?;
        match self.confirm(&signature).await? {
            ConfirmationStatus::Confirmed => Ok(()),
            ConfirmationStatus::Failed(reason) => Err(LedgerError::AccountCreation(reason)),
            ConfirmationStatus::TimedOut => Err(LedgerError::AccountCreation(format!(
                "account creation {signature} not confirmed in time"
            ))),
        }
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn token_balance(
        &self,
        owner: &WalletAddress,
        mint: &MintAddress,
    ) -> Result<TokenAmount, LedgerError> {
        let total = self
            .token_accounts(owner, mint)
            .await?
            .into_iter()
            .fold(0u64, u64::saturating_add);
        Ok(TokenAmount::new(total))
    }

    async fn transfer(&self, request: &TransferRequest) -> Result<TxSignature, LedgerError> {
        let signer = self
            .signer
            .as_deref()
            .ok_or_else(|| LedgerError::SignerUnavailable("no wallet connected".into()))?;
        if signer.payer() != &request.from {
            return Err(LedgerError::SignerUnavailable(format!(
                "connected wallet {} cannot sign for {}",
                signer.payer(),
                request.from
            )));
        }

        if self.token_accounts(&request.to, &request.mint).await?.is_empty() {
            self.create_destination_account(signer, request).await?;
        }

        let signature = self.sign_and_send(signer, PlanKind::Transfer, request).await?;
        info!(%signature, to = %request.to, amount = %request.amount, "transfer submitted");
        Ok(signature)
    }

    async fn confirm(&self, signature: &TxSignature) -> Result<ConfirmationStatus, LedgerError> {
        let deadline = Instant::now() + self.config.confirm_timeout;
        loop {
            if let Some(status) = self.signature_status(signature).await? {
                if let Some(err) = status.err {
                    return Ok(ConfirmationStatus::Failed(err.to_string()));
                }
                if matches!(
                    status.confirmation_status.as_deref(),
                    Some("confirmed") | Some("finalized")
                ) {
                    return Ok(ConfirmationStatus::Confirmed);
                }
            }
            if Instant::now() >= deadline {
                warn!(%signature, "confirmation timed out");
                return Ok(ConfirmationStatus::TimedOut);
            }
            sleep(self.config.poll_interval).await;
        }
    }
}

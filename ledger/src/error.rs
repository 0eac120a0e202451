use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("wallet not connected or signer unavailable: {0}")]
    SignerUnavailable(String),

    #[error("transaction rejected by wallet: {0}")]
    Rejected(String),

    #[error("destination account creation failed: {0}")]
    AccountCreation(String),

    #[error("transaction submission failed: {0}")]
    Submission(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("invalid RPC response: {0}")]
    InvalidResponse(String),
}

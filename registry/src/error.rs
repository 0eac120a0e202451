use fomo_store::StoreError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Please fill in all required fields.")]
    MissingFields,

    #[error("Invalid mint address: {0}")]
    InvalidMint(String),

    #[error("Invalid wallet address: {0}")]
    InvalidWallet(String),

    #[error("Token already listed.")]
    AlreadyListed,

    #[error("Token not found.")]
    TokenNotFound,

    #[error("Application {0} not found.")]
    ApplicationNotFound(Uuid),

    /// Same message for an unknown user and a wrong password.
    #[error("Authentication failed.")]
    AuthenticationFailed,

    #[error("Session expired or invalid.")]
    Unauthorized,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("random source unavailable: {0}")]
    Random(String),

    #[error("data store error: {0}")]
    Store(#[from] StoreError),
}

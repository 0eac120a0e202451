use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("daily vote cap reached: {cast} of {cap} votes cast today")]
    DailyCapReached { cast: u32, cap: u32 },

    #[error("transaction signature already used: {0}")]
    SignatureReused(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database is corrupted: {0}")]
    Corruption(String),
}

//! Top-level error type shared across crates.

use thiserror::Error;

/// Parse and validation errors for the fundamental types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FomoError {
    #[error("invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("invalid mint address: {0}")]
    InvalidMint(String),

    #[error("invalid transaction signature: {0}")]
    InvalidSignature(String),

    #[error("invalid proposal id: {0}")]
    InvalidProposalId(String),

    #[error("unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("amount overflow: {0} whole tokens at {1} decimals")]
    AmountOverflow(u64, u8),
}

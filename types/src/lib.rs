//! Fundamental types for FOMODEX.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! wallet and mint addresses, token amounts, transaction signatures, timestamps,
//! and the records persisted by the data store (proposals, votes, payments,
//! registry entries, admin credentials).

pub mod address;
pub mod admin;
pub mod amount;
pub mod error;
pub mod payment;
pub mod proposal;
pub mod registry;
pub mod signature;
pub mod time;
pub mod vote;

pub use address::{MintAddress, WalletAddress};
pub use admin::{AdminCredential, AdminSession};
pub use amount::TokenAmount;
pub use error::FomoError;
pub use payment::{PaymentPurpose, PaymentRecord, PaymentState};
pub use proposal::{NewProposal, Proposal, ProposalCategory, ProposalId, ProposalStatus};
pub use registry::{
    ApplicationStatus, ListedToken, ListingApplication, NewListedToken, NewListingApplication,
    TradeRecord, TradeSide,
};
pub use signature::TxSignature;
pub use time::{DayIndex, Timestamp};
pub use vote::{Vote, VoteChoice};

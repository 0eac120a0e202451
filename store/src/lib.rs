//! Abstract data-store traits for FOMODEX.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.
//!
//! Each method is a single atomic operation against the backend: callers never
//! read a row, modify it in memory and write it back.

pub mod admin;
pub mod error;
pub mod payment;
pub mod proposal;
pub mod registry;
pub mod trade;
pub mod vote;

pub use admin::AdminStore;
pub use error::StoreError;
pub use payment::PaymentJournal;
pub use proposal::ProposalStore;
pub use registry::RegistryStore;
pub use trade::TradeStore;
pub use vote::{RecordedVote, VoteInsert, VoteStore};

/// Everything the governance workflow needs from a store.
pub trait GovernanceStore: ProposalStore + VoteStore + PaymentJournal {}

impl<T: ProposalStore + VoteStore + PaymentJournal> GovernanceStore for T {}

/// The full data-store surface served by a node.
pub trait DataStore: GovernanceStore + RegistryStore + AdminStore + TradeStore {}

impl<T: GovernanceStore + RegistryStore + AdminStore + TradeStore> DataStore for T {}

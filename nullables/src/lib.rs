//! Nullable infrastructure for deterministic testing.
//!
//! All external dependencies (clock, ledger network, data store) are
//! abstracted behind traits. This crate provides test-friendly
//! implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically (scripted transfer failures,
//!   injected store faults)
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod fixtures;
pub mod ledger;
pub mod store;

pub use clock::NullClock;
pub use fixtures::{test_signature, test_wallet};
pub use ledger::{LedgerCall, NullLedger, TransferOutcome};
pub use store::NullStore;

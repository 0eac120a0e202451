//! Token-weighted governance for FOMODEX.
//!
//! A vote costs a fixed burn (sent to the burn sink) plus a fixed creator
//! reward (sent to the proposal's creator wallet). Creating a proposal burns
//! a fixed cost. The workflow is:
//!
//! 1. [`EligibilityGate`]: connected, enough balance, proposal active, under
//!    the per-day cap. No side effects.
//! 2. [`PaymentOrchestrator`]: burn, then reward, each confirmed before the
//!    next, journaled as a [`fomo_types::PaymentRecord`] state machine.
//! 3. [`LedgerWriter`]: one atomic store operation inserts the vote and
//!    bumps the tallies (`votes_for`/`votes_against` by one, `total_votes`
//!    by the burn amount).
//!
//! [`GovernanceService`] runs the three in order.

pub mod eligibility;
pub mod error;
pub mod params;
pub mod payment;
pub mod service;
pub mod writer;

pub use eligibility::{EligibilityGate, ProposalDraft, WalletSession};
pub use error::{
    GovernanceError, LedgerWriteError, PaymentError, PaymentStep, TransferFailure,
    ValidationError,
};
pub use params::{GovernanceParams, BURN_SINK, FOMO_MINT};
pub use payment::{is_ready_to_record, PaymentOrchestrator};
pub use service::{GovernanceService, ResumeOutcome};
pub use writer::{LedgerWriter, PaidVote};

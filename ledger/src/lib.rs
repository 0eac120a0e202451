//! Token ledger interface.
//!
//! The governance workflow depends only on the [`Ledger`] trait:
//! - token balance of an owner for a mint
//! - transfer from the acting wallet, creating the destination's associated
//!   token account first when it does not exist
//! - confirmation of a submitted transaction
//!
//! [`RpcLedger`] implements it against a Solana JSON-RPC endpoint. Signing is
//! delegated to a [`TransferSigner`], which stands for the connected wallet.

pub mod error;
pub mod ledger;
pub mod rpc;
pub mod signer;

pub use error::LedgerError;
pub use ledger::{ConfirmationStatus, Ledger, TransferRequest};
pub use rpc::{RpcLedger, RpcLedgerConfig};
pub use signer::{PlanKind, RemoteSigner, TransferPlan, TransferSigner};

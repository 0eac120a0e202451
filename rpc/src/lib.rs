//! HTTP API for FOMODEX.
//!
//! Provides endpoints for:
//! - Governance proposals, paid votes and per-day vote counts
//! - Wallet balances, vote history and trade history
//! - Listed tokens, market prices and listing applications
//! - Admin sessions and token curation
//! - Health and Prometheus metrics

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod server;

pub use error::{ApiResponse, RpcError};
pub use metrics::ApiMetrics;
pub use server::{router, ApiStore, AppState, RpcServer};

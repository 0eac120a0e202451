//! Token registry, listing applications, admin authentication and trade
//! history for the FOMODEX front end.

pub mod auth;
pub mod error;
pub mod registry;
pub mod trades;

pub use auth::{AdminAuth, DEFAULT_SESSION_TTL_SECS};
pub use error::RegistryError;
pub use registry::{ApplicationForm, ApplicationsByStatus, Registry, TokenForm};
pub use trades::{NewTrade, TradeHistory, DEFAULT_HISTORY_LIMIT};

//! FOMODEX node: configuration, logging, background caches, market feed and
//! the wiring that ties storage, the ledger client and the services together.

pub mod config;
pub mod error;
pub mod logging;
pub mod market;
pub mod metrics;
pub mod node;
pub mod pollers;
pub mod shutdown;

pub use config::{MarketConfig, NodeConfig, PollerConfig};
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use market::{MarketFeed, MarketSnapshot, MarketToken};
pub use metrics::NodeMetrics;
pub use node::FomoNode;
pub use pollers::{BalanceCache, CachedBalance, PriceCache, TokenCache};
pub use shutdown::ShutdownController;

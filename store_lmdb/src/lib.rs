//! LMDB storage backend for FOMODEX.
//!
//! Implements all storage traits from `fomo-store` using the `heed` LMDB
//! bindings. Each logical table maps to one LMDB database within a single
//! environment.

mod codec;

pub mod admin;
pub mod environment;
pub mod error;
pub mod payment;
pub mod proposal;
pub mod registry;
pub mod trade;
pub mod vote;

pub use environment::{LmdbEnvironment, CURRENT_SCHEMA_VERSION};
pub use error::LmdbError;

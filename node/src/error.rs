use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] fomo_store::StoreError),

    #[error("storage environment error: {0}")]
    Lmdb(#[from] fomo_store_lmdb::LmdbError),

    #[error("ledger error: {0}")]
    Ledger(#[from] fomo_ledger::LedgerError),

    #[error("governance error: {0}")]
    Governance(#[from] fomo_governance::GovernanceError),

    #[error("registry error: {0}")]
    Registry(#[from] fomo_registry::RegistryError),

    #[error("market feed error: {0}")]
    Market(String),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

//! Node wiring: storage, ledger client, governance and registry services,
//! background caches, and their lifecycle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use fomo_governance::GovernanceService;
use fomo_ledger::{Ledger, RpcLedger};
use fomo_registry::{AdminAuth, Registry, TradeHistory};
use fomo_store_lmdb::LmdbEnvironment;
use fomo_types::{MintAddress, WalletAddress};

use crate::market::MarketFeed;
use crate::pollers::{
    spawn_balance_poller, spawn_price_poller, spawn_token_poller, BalanceCache, PriceCache,
    TokenCache,
};
use crate::{NodeConfig, NodeError, NodeMetrics, ShutdownController};

/// LMDB named databases the node opens.
const MAX_DBS: u32 = 16;

pub struct FomoNode {
    pub config: NodeConfig,
    pub store: Arc<LmdbEnvironment>,
    pub ledger: Arc<dyn Ledger>,
    pub governance: Arc<GovernanceService<LmdbEnvironment>>,
    pub registry: Arc<Registry<LmdbEnvironment>>,
    pub auth: Arc<AdminAuth<LmdbEnvironment>>,
    pub trades: Arc<TradeHistory<LmdbEnvironment>>,
    pub balances: Arc<BalanceCache>,
    pub tokens: Arc<TokenCache>,
    pub prices: Arc<PriceCache>,
    pub metrics: Arc<NodeMetrics>,
    market: Arc<MarketFeed>,
    default_mints: Vec<MintAddress>,
    shutdown: ShutdownController,
    task_handles: Vec<JoinHandle<()>>,
}

impl FomoNode {
    /// Open the data directory and connect to the configured ledger RPC.
    pub fn open(config: NodeConfig) -> Result<Self, NodeError> {
        let ledger: Arc<dyn Ledger> = Arc::new(RpcLedger::new(config.ledger_config())?);
        Self::with_ledger(config, ledger)
    }

    pub fn with_ledger(config: NodeConfig, ledger: Arc<dyn Ledger>) -> Result<Self, NodeError> {
        config.validate()?;
        let store = Arc::new(LmdbEnvironment::open(
            &config.data_dir,
            MAX_DBS,
            config.map_size,
        )?);
        let schema = store.schema_version()?;
        info!(data_dir = %config.data_dir.display(), schema, "storage opened");

        let governance = Arc::new(GovernanceService::new(
            Arc::clone(&store),
            Arc::clone(&ledger),
            config.governance.clone(),
        )?);
        let registry = Arc::new(Registry::new(Arc::clone(&store)));
        let auth = Arc::new(AdminAuth::new(
            Arc::clone(&store),
            config.admin_session_ttl_secs,
        )?);
        let trades = Arc::new(TradeHistory::new(Arc::clone(&store)));

        let default_mints = config
            .market
            .default_mints
            .iter()
            .map(|m| {
                MintAddress::new(m.as_str())
                    .map_err(|e| NodeError::Config(format!("market.default_mints: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let balances = Arc::new(BalanceCache::new(config.pollers.balance_idle_secs));
        for raw in &config.pollers.watched_wallets {
            let wallet = WalletAddress::new(raw.as_str())
                .map_err(|e| NodeError::Config(format!("pollers.watched_wallets: {e}")))?;
            balances.watch(wallet);
        }

        Ok(Self {
            market: Arc::new(MarketFeed::new(config.market.api_url.clone())?),
            metrics: Arc::new(NodeMetrics::new()?),
            tokens: Arc::new(TokenCache::new()),
            prices: Arc::new(PriceCache::new()),
            balances,
            default_mints,
            store,
            ledger,
            governance,
            registry,
            auth,
            trades,
            config,
            shutdown: ShutdownController::new(),
            task_handles: Vec::new(),
        })
    }

    /// Prime the listed-token cache, log unsettled payments, and start the
    /// pollers.
    pub fn start(&mut self) -> Result<(), NodeError> {
        let listed = self.tokens.refresh(&self.registry)?;
        self.metrics.listed_tokens.set(listed as i64);

        let unsettled = self.governance.unsettled_payments()?;
        for payment in &unsettled {
            warn!(
                payment = %payment.id,
                state = %payment.state,
                burn_tx = ?payment.burn_tx,
                reward_tx = ?payment.reward_tx,
                pending_tx = ?payment.pending_tx,
                "unsettled governance payment"
            );
        }

        let purged = self.auth.purge_expired(fomo_types::Timestamp::now())?;
        let pollers = &self.config.pollers;

        self.task_handles.push(spawn_balance_poller(
            Arc::clone(&self.balances),
            Arc::clone(&self.ledger),
            self.config.governance.reward_mint.clone(),
            Duration::from_secs(pollers.balance_secs),
            Arc::clone(&self.metrics),
            self.shutdown.subscribe(),
        ));
        self.task_handles.push(spawn_token_poller(
            Arc::clone(&self.tokens),
            Arc::clone(&self.registry),
            Duration::from_secs(pollers.tokens_secs),
            Arc::clone(&self.metrics),
            self.shutdown.subscribe(),
        ));
        self.task_handles.push(spawn_price_poller(
            Arc::clone(&self.prices),
            Arc::clone(&self.tokens),
            Arc::clone(&self.market),
            self.default_mints.clone(),
            Duration::from_secs(pollers.prices_secs),
            Arc::clone(&self.metrics),
            self.shutdown.subscribe(),
        ));

        info!(
            listed_tokens = listed,
            unsettled_payments = unsettled.len(),
            purged_sessions = purged,
            "FOMODEX node started"
        );
        Ok(())
    }

    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown.subscribe()
    }

    pub async fn wait_for_signal(&self) {
        self.shutdown.wait_for_signal().await;
    }

    pub async fn stop(&mut self) {
        info!("FOMODEX node stopping");
        self.shutdown.shutdown();
        for handle in self.task_handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "background task ended abnormally");
            }
        }
        info!("FOMODEX node stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fomo_nullables::{test_wallet, NullLedger};

    fn config(dir: &tempfile::TempDir) -> NodeConfig {
        let mut config = NodeConfig::default();
        config.data_dir = dir.path().to_path_buf();
        config.map_size = 16 * 1024 * 1024;
        config.market.api_url = "http://127.0.0.1:9".into();
        config
    }

    #[tokio::test]
    async fn starts_and_stops_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(&dir);
        cfg.pollers.watched_wallets = vec![test_wallet(1).to_string()];
        let mut node = FomoNode::with_ledger(cfg, Arc::new(NullLedger::new())).unwrap();
        node.start().unwrap();
        assert_eq!(node.balances.watched(), vec![test_wallet(1)]);
        node.stop().await;
    }

    #[test]
    fn invalid_default_mint_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(&dir);
        cfg.market.default_mints = vec!["not-a-mint".into()];
        let err = FomoNode::with_ledger(cfg, Arc::new(NullLedger::new())).err().unwrap();
        assert!(matches!(err, NodeError::Config(_)));
    }
}

//! Axum HTTP server: shared state, routes and graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use fomo_governance::GovernanceService;
use fomo_ledger::Ledger;
use fomo_node::{BalanceCache, FomoNode, PriceCache, TokenCache};
use fomo_registry::{AdminAuth, Registry, TradeHistory};
use fomo_store::DataStore;
use fomo_store_lmdb::LmdbEnvironment;

use crate::error::RpcError;
use crate::handlers;
use crate::metrics::ApiMetrics;

/// Stores the API can serve from.
pub trait ApiStore: DataStore + Send + Sync + 'static {}

impl<T: DataStore + Send + Sync + 'static> ApiStore for T {}

/// Everything a handler can reach.
pub struct AppState<S> {
    pub governance: Arc<GovernanceService<S>>,
    pub registry: Arc<Registry<S>>,
    pub auth: Arc<AdminAuth<S>>,
    pub trades: Arc<TradeHistory<S>>,
    pub ledger: Arc<dyn Ledger>,
    pub balances: Arc<BalanceCache>,
    pub tokens: Arc<TokenCache>,
    pub prices: Arc<PriceCache>,
    /// `None` when metrics are disabled; `/metrics` then answers 404.
    pub metrics: Option<Arc<ApiMetrics>>,
}

impl AppState<LmdbEnvironment> {
    /// Share the node's services and caches. API counters are registered
    /// into the node's Prometheus registry.
    pub fn from_node(node: &FomoNode) -> Result<Self, RpcError> {
        let metrics = if node.config.enable_metrics {
            let m = ApiMetrics::register(&node.metrics.registry)
                .map_err(|e| RpcError::Server(e.to_string()))?;
            Some(Arc::new(m))
        } else {
            None
        };
        Ok(Self {
            governance: Arc::clone(&node.governance),
            registry: Arc::clone(&node.registry),
            auth: Arc::clone(&node.auth),
            trades: Arc::clone(&node.trades),
            ledger: Arc::clone(&node.ledger),
            balances: Arc::clone(&node.balances),
            tokens: Arc::clone(&node.tokens),
            prices: Arc::clone(&node.prices),
            metrics,
        })
    }
}

pub fn router<S: ApiStore>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::<S>))
        .route("/metrics", get(handlers::metrics::<S>))
        .route(
            "/proposals",
            get(handlers::list_proposals::<S>).post(handlers::create_proposal::<S>),
        )
        .route("/proposals/:id", get(handlers::get_proposal::<S>))
        .route("/proposals/:id/creator", get(handlers::proposal_creator::<S>))
        .route("/proposals/:id/votes", post(handlers::cast_vote::<S>))
        .route("/proposals/:id/votes/today", get(handlers::votes_today::<S>))
        .route("/wallets/:wallet/votes", get(handlers::wallet_votes::<S>))
        .route("/wallets/:wallet/balance", get(handlers::wallet_balance::<S>))
        .route("/wallets/:wallet/trades", get(handlers::trade_history::<S>))
        .route("/trades", post(handlers::record_trade::<S>))
        .route(
            "/tokens",
            get(handlers::list_tokens::<S>).post(handlers::add_token::<S>),
        )
        .route("/tokens/:mint", delete(handlers::remove_token::<S>))
        .route("/market", get(handlers::market::<S>))
        .route(
            "/applications",
            get(handlers::list_applications::<S>).post(handlers::submit_application::<S>),
        )
        .route("/applications/:id/approve", post(handlers::approve_application::<S>))
        .route("/applications/:id/reject", post(handlers::reject_application::<S>))
        .route("/applications/:id/restore", post(handlers::restore_application::<S>))
        .route("/payments/unsettled", get(handlers::unsettled_payments::<S>))
        .route("/admin/login", post(handlers::login::<S>))
        .route("/admin/logout", post(handlers::logout::<S>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub struct RpcServer {
    pub addr: SocketAddr,
}

impl RpcServer {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Serve until a shutdown signal arrives, then drain in-flight requests.
    pub async fn serve<S: ApiStore>(
        &self,
        state: Arc<AppState<S>>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), RpcError> {
        let app = router(state);
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "HTTP API listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;
        info!("HTTP API stopped");
        Ok(())
    }
}

//! Background caches and the interval tasks that refresh them.
//!
//! Each poller owns one cache and only ever overwrites it; readers see the
//! last successful refresh. A failed refresh leaves the previous value.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use fomo_ledger::Ledger;
use fomo_registry::Registry;
use fomo_store::RegistryStore;
use fomo_types::{ListedToken, MintAddress, Timestamp, TokenAmount, WalletAddress};

use crate::market::{MarketFeed, MarketSnapshot};
use crate::NodeMetrics;

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

/// A balance and when it was read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CachedBalance {
    pub balance: TokenAmount,
    pub fetched_at: Timestamp,
}

struct BalanceEntry {
    balance: Option<CachedBalance>,
    last_seen: Timestamp,
    pinned: bool,
}

/// Reward-token balances of wallets that connected recently. A wallet not
/// requested for `idle_ttl_secs` stops being refreshed; configured wallets
/// are pinned.
pub struct BalanceCache {
    entries: RwLock<HashMap<WalletAddress, BalanceEntry>>,
    idle_ttl_secs: u64,
}

impl BalanceCache {
    pub fn new(idle_ttl_secs: u64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            idle_ttl_secs,
        }
    }

    /// Keep a wallet warm for the life of the process; it is filled on the
    /// next refresh.
    pub fn watch(&self, wallet: WalletAddress) {
        write(&self.entries)
            .entry(wallet)
            .and_modify(|e| e.pinned = true)
            .or_insert(BalanceEntry {
                balance: None,
                last_seen: Timestamp::now(),
                pinned: true,
            });
    }

    /// Cached balance for a request at `now`; a hit counts as activity.
    pub fn get(&self, wallet: &WalletAddress, now: Timestamp) -> Option<CachedBalance> {
        let mut entries = write(&self.entries);
        let entry = entries.get_mut(wallet)?;
        entry.last_seen = now;
        entry.balance
    }

    /// Record a balance read on behalf of a request and start tracking the wallet.
    pub fn set(&self, wallet: WalletAddress, balance: TokenAmount, now: Timestamp) {
        let cached = Some(CachedBalance {
            balance,
            fetched_at: now,
        });
        write(&self.entries)
            .entry(wallet)
            .and_modify(|e| {
                e.balance = cached;
                e.last_seen = now;
            })
            .or_insert(BalanceEntry {
                balance: cached,
                last_seen: now,
                pinned: false,
            });
    }

    pub fn watched(&self) -> Vec<WalletAddress> {
        read(&self.entries).keys().cloned().collect()
    }

    /// Drop unpinned wallets nobody has asked about within the idle TTL.
    pub fn evict_idle(&self, now: Timestamp) -> usize {
        let ttl = self.idle_ttl_secs;
        let mut entries = write(&self.entries);
        let before = entries.len();
        entries.retain(|_, e| e.pinned || !e.last_seen.has_expired(ttl, now));
        before - entries.len()
    }

    /// Evict idle wallets, then re-read the rest. Returns the number of
    /// failed reads.
    pub async fn refresh(&self, ledger: &dyn Ledger, mint: &MintAddress) -> usize {
        self.refresh_at(ledger, mint, Timestamp::now()).await
    }

    async fn refresh_at(&self, ledger: &dyn Ledger, mint: &MintAddress, now: Timestamp) -> usize {
        let evicted = self.evict_idle(now);
        if evicted > 0 {
            debug!(evicted, "dropped idle wallets from the balance cache");
        }
        let mut failed = 0;
        for wallet in self.watched() {
            match ledger.token_balance(&wallet, mint).await {
                Ok(balance) => {
                    // Refreshing is not activity; an evicted wallet stays gone.
                    if let Some(entry) = write(&self.entries).get_mut(&wallet) {
                        entry.balance = Some(CachedBalance {
                            balance,
                            fetched_at: now,
                        });
                    }
                }
                Err(e) => {
                    failed += 1;
                    debug!(wallet = %wallet, error = %e, "balance refresh failed");
                }
            }
        }
        failed
    }
}

/// The listed-token set as last read from the registry.
#[derive(Default)]
pub struct TokenCache {
    tokens: RwLock<Vec<ListedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tokens(&self) -> Vec<ListedToken> {
        read(&self.tokens).clone()
    }

    pub fn mints(&self) -> Vec<MintAddress> {
        read(&self.tokens)
            .iter()
            .map(|t| t.mint_address.clone())
            .collect()
    }

    pub fn refresh<S: RegistryStore>(&self, registry: &Registry<S>) -> Result<usize, fomo_registry::RegistryError> {
        let tokens = registry.list_tokens()?;
        let count = tokens.len();
        *write(&self.tokens) = tokens;
        Ok(count)
    }
}

/// Latest market snapshot.
#[derive(Default)]
pub struct PriceCache {
    snapshot: RwLock<MarketSnapshot>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MarketSnapshot {
        read(&self.snapshot).clone()
    }

    pub fn replace(&self, snapshot: MarketSnapshot) {
        *write(&self.snapshot) = snapshot;
    }
}

pub fn spawn_balance_poller(
    cache: Arc<BalanceCache>,
    ledger: Arc<dyn Ledger>,
    mint: MintAddress,
    period: Duration,
    metrics: Arc<NodeMetrics>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("balance poller shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let failed = cache.refresh(ledger.as_ref(), &mint).await;
                    let watched = cache.watched().len();
                    metrics.watched_wallets.set(watched as i64);
                    if failed == 0 {
                        metrics.cache_refreshes.with_label_values(&["balances"]).inc();
                    } else {
                        metrics.cache_refresh_failures.with_label_values(&["balances"]).inc();
                        warn!(failed, watched, "some balance reads failed");
                    }
                }
            }
        }
    })
}

/// Refreshes on the interval and immediately when the registry signals a
/// change.
pub fn spawn_token_poller<S>(
    cache: Arc<TokenCache>,
    registry: Arc<Registry<S>>,
    period: Duration,
    metrics: Arc<NodeMetrics>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()>
where
    S: RegistryStore + Send + Sync + 'static,
{
    let changes: Arc<Notify> = registry.changes();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("token poller shutting down");
                    break;
                }
                _ = changes.notified() => {}
                _ = interval.tick() => {}
            }
            match cache.refresh(&registry) {
                Ok(count) => {
                    metrics.listed_tokens.set(count as i64);
                    metrics.cache_refreshes.with_label_values(&["tokens"]).inc();
                }
                Err(e) => {
                    metrics.cache_refresh_failures.with_label_values(&["tokens"]).inc();
                    warn!(error = %e, "listed token refresh failed");
                }
            }
        }
    })
}

/// Prices for the default mints plus every listed token.
pub fn spawn_price_poller(
    cache: Arc<PriceCache>,
    tokens: Arc<TokenCache>,
    feed: Arc<MarketFeed>,
    default_mints: Vec<MintAddress>,
    period: Duration,
    metrics: Arc<NodeMetrics>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("price poller shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let mut mints = default_mints.clone();
                    mints.extend(tokens.mints());
                    let fetched = feed.fetch(&mints).await;
                    let mut snapshot = fetched.snapshot;
                    snapshot.apply_listings(&tokens.tokens());
                    metrics.market_tokens.set(snapshot.tokens.len() as i64);
                    metrics.market_chunk_failures.inc_by(fetched.failed_chunks as u64);
                    if fetched.failed_chunks > 0 && snapshot.tokens.is_empty() {
                        metrics.cache_refresh_failures.with_label_values(&["prices"]).inc();
                        continue;
                    }
                    metrics.cache_refreshes.with_label_values(&["prices"]).inc();
                    cache.replace(snapshot);
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fomo_nullables::{test_wallet, NullLedger, NullStore};
    use fomo_registry::TokenForm;

    #[tokio::test]
    async fn balance_refresh_fills_watched_wallets_and_keeps_old_value_on_failure() {
        let ledger = NullLedger::new();
        let mint = MintAddress::sol();
        let w = test_wallet(1);
        ledger.set_balance(&w, &mint, TokenAmount::new(500));

        let cache = BalanceCache::new(3600);
        cache.watch(w.clone());
        let now = Timestamp::now();
        assert_eq!(cache.get(&w, now), None);

        assert_eq!(cache.refresh(&ledger, &mint).await, 0);
        assert_eq!(cache.get(&w, now).unwrap().balance, TokenAmount::new(500));

        ledger.fail_balance_queries(Some("rpc down"));
        assert_eq!(cache.refresh(&ledger, &mint).await, 1);
        assert_eq!(cache.get(&w, now).unwrap().balance, TokenAmount::new(500));
    }

    #[tokio::test]
    async fn idle_wallets_are_dropped_and_pinned_ones_kept() {
        let ledger = NullLedger::new();
        let mint = MintAddress::sol();
        let pinned = test_wallet(1);
        let idle = test_wallet(2);
        let active = test_wallet(3);
        let t0 = Timestamp::new(1_000_000);

        let cache = BalanceCache::new(600);
        cache.watch(pinned.clone());
        cache.set(idle.clone(), TokenAmount::new(1), t0);
        cache.set(active.clone(), TokenAmount::new(2), t0);

        // Refreshes alone do not keep a wallet alive; requests do.
        assert_eq!(cache.refresh_at(&ledger, &mint, t0.plus_secs(300)).await, 0);
        assert!(cache.get(&active, t0.plus_secs(400)).is_some());
        assert_eq!(cache.refresh_at(&ledger, &mint, t0.plus_secs(700)).await, 0);

        let mut watched = cache.watched();
        watched.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        let mut expected = vec![pinned.clone(), active.clone()];
        expected.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        assert_eq!(watched, expected);
        assert_eq!(cache.get(&idle, t0.plus_secs(700)), None);

        // Balance reads for the evicted wallet stop.
        let reads_before = ledger.calls().len();
        cache.refresh_at(&ledger, &mint, t0.plus_secs(710)).await;
        assert_eq!(ledger.calls().len() - reads_before, 2);

        assert_eq!(cache.evict_idle(t0.plus_secs(100_000)), 1);
        assert_eq!(cache.watched(), vec![pinned]);
    }

    #[tokio::test]
    async fn token_poller_reacts_to_registry_changes() {
        let registry = Arc::new(Registry::new(Arc::new(NullStore::new())));
        let cache = Arc::new(TokenCache::new());
        let metrics = Arc::new(NodeMetrics::new().unwrap());
        let (tx, rx) = broadcast::channel(1);
        let handle = spawn_token_poller(
            Arc::clone(&cache),
            Arc::clone(&registry),
            Duration::from_secs(3600),
            metrics,
            rx,
        );

        // First tick fires immediately; give it a moment.
        tokio::time::sleep(Duration::from_millis(50)).await;
        registry
            .add_token(
                TokenForm {
                    mint_address: "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263".into(),
                    symbol: "bonk".into(),
                    name: "Bonk".into(),
                    ..Default::default()
                },
                "root",
                Timestamp::new(1),
            )
            .unwrap();

        let mut seen = false;
        for _ in 0..50 {
            if cache.tokens().len() == 1 {
                seen = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(seen, "token cache was not refreshed on change");

        tx.send(()).unwrap();
        handle.await.unwrap();
    }
}

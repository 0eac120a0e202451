//! Swap history per wallet.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use fomo_store::TradeStore;
use fomo_types::{Timestamp, TradeRecord, TradeSide, TxSignature, WalletAddress};

use crate::RegistryError;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// A completed swap as reported by the trading panel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewTrade {
    pub wallet_address: String,
    pub tx_signature: String,
    pub token_symbol: String,
    pub side: TradeSide,
    pub amount_in: f64,
    pub amount_out: f64,
}

pub struct TradeHistory<S> {
    store: Arc<S>,
}

impl<S: TradeStore> TradeHistory<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn record(&self, trade: NewTrade, now: Timestamp) -> Result<TradeRecord, RegistryError> {
        let wallet_address = WalletAddress::new(trade.wallet_address.trim())
            .map_err(|_| RegistryError::InvalidWallet(trade.wallet_address.clone()))?;
        let tx_signature =
            TxSignature::new(trade.tx_signature.trim()).map_err(|_| RegistryError::MissingFields)?;
        if trade.token_symbol.trim().is_empty() {
            return Err(RegistryError::MissingFields);
        }
        let record = TradeRecord {
            id: Uuid::new_v4(),
            wallet_address,
            tx_signature,
            token_symbol: trade.token_symbol.trim().to_uppercase(),
            side: trade.side,
            amount_in: trade.amount_in,
            amount_out: trade.amount_out,
            created_at: now,
        };
        self.store.record_trade(&record)?;
        debug!(wallet = %record.wallet_address, tx = %record.tx_signature, "trade recorded");
        Ok(record)
    }

    /// Newest first; `limit` of `None` uses [`DEFAULT_HISTORY_LIMIT`].
    pub fn history(
        &self,
        wallet: &WalletAddress,
        limit: Option<usize>,
    ) -> Result<Vec<TradeRecord>, RegistryError> {
        Ok(self
            .store
            .trade_history(wallet, limit.unwrap_or(DEFAULT_HISTORY_LIMIT))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fomo_nullables::{test_signature, test_wallet, NullStore};

    fn trade(wallet: &WalletAddress, seed: u64) -> NewTrade {
        NewTrade {
            wallet_address: wallet.to_string(),
            tx_signature: test_signature(seed).to_string(),
            token_symbol: "fomo".into(),
            side: TradeSide::Buy,
            amount_in: 1.5,
            amount_out: 42_000.0,
        }
    }

    #[test]
    fn history_is_newest_first_and_limited() {
        let h = TradeHistory::new(Arc::new(NullStore::new()));
        let w = test_wallet(1);
        for i in 0..5 {
            h.record(trade(&w, i), Timestamp::new(100 + i)).unwrap();
        }
        h.record(trade(&test_wallet(2), 9), Timestamp::new(500)).unwrap();

        let rows = h.history(&w, Some(3)).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].created_at, Timestamp::new(104));
        assert_eq!(rows[0].token_symbol, "FOMO");
        assert_eq!(h.history(&w, None).unwrap().len(), 5);
    }

    #[test]
    fn invalid_wallet_is_rejected() {
        let h = TradeHistory::new(Arc::new(NullStore::new()));
        let mut t = trade(&test_wallet(1), 1);
        t.wallet_address = "nope".into();
        assert!(matches!(
            h.record(t, Timestamp::new(1)),
            Err(RegistryError::InvalidWallet(_))
        ));
    }
}

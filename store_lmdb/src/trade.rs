//! LMDB implementation of TradeStore.

use fomo_store::{StoreError, TradeStore};
use fomo_types::{TradeRecord, WalletAddress};

use crate::codec::{decode, encode, timed_key, wallet_prefix};
use crate::{LmdbEnvironment, LmdbError};

impl TradeStore for LmdbEnvironment {
    fn record_trade(&self, trade: &TradeRecord) -> Result<(), StoreError> {
        let key = timed_key(&wallet_prefix(&trade.wallet_address), trade.created_at, &trade.id);
        let bytes = encode(trade)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.trades_db
            .put(&mut wtxn, &key, &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn trade_history(
        &self,
        wallet: &WalletAddress,
        limit: usize,
    ) -> Result<Vec<TradeRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self
            .trades_db
            .rev_prefix_iter(&rtxn, &wallet_prefix(wallet))
            .map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for entry in iter {
            if results.len() >= limit {
                break;
            }
            let (_key, val) = entry.map_err(LmdbError::from)?;
            results.push(decode(val)?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::tests::open_test_env;
    use fomo_nullables::{test_signature, test_wallet};
    use fomo_types::{Timestamp, TradeSide};
    use uuid::Uuid;

    fn trade(wallet: u64, at: u64) -> TradeRecord {
        TradeRecord {
            id: Uuid::new_v4(),
            wallet_address: test_wallet(wallet),
            tx_signature: test_signature(at),
            token_symbol: "FOMO".into(),
            side: TradeSide::Buy,
            amount_in: 0.5,
            amount_out: 12_345.0,
            created_at: Timestamp::new(at),
        }
    }

    #[test]
    fn history_is_newest_first_and_limited() {
        let (_dir, env) = open_test_env();
        for at in 1..=60 {
            env.record_trade(&trade(1, at)).unwrap();
        }
        env.record_trade(&trade(2, 100)).unwrap();

        let history = env.trade_history(&test_wallet(1), 50).unwrap();
        assert_eq!(history.len(), 50);
        assert_eq!(history[0].created_at, Timestamp::new(60));
        assert!(history.iter().all(|t| t.wallet_address == test_wallet(1)));
    }
}

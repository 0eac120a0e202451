//! Trade history storage trait.

use crate::StoreError;
use fomo_types::{TradeRecord, WalletAddress};

pub trait TradeStore {
    fn record_trade(&self, trade: &TradeRecord) -> Result<(), StoreError>;

    /// The wallet's most recent trades, newest first.
    fn trade_history(
        &self,
        wallet: &WalletAddress,
        limit: usize,
    ) -> Result<Vec<TradeRecord>, StoreError>;
}

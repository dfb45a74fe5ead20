//! Market data access port.

use crate::domain::error::SwingscanError;
use crate::domain::ohlcv::Bar;
use async_trait::async_trait;

#[async_trait]
pub trait DataPort: Send + Sync {
    /// The most recent `lookback` bars for `symbol`, oldest first.
    async fn fetch_bars(&self, symbol: &str, lookback: usize) -> Result<Vec<Bar>, SwingscanError>;

    async fn list_symbols(&self) -> Result<Vec<String>, SwingscanError>;
}

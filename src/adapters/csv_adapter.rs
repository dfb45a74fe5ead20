//! CSV file data adapter.
//!
//! One file per symbol at `<dir>/<SYMBOL>.csv` with the header
//! `date,open,high,low,close,volume`, dates as `YYYY-MM-DD`.

use crate::domain::error::SwingscanError;
use crate::domain::ohlcv::Bar;
use crate::ports::data_port::DataPort;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::str::FromStr;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }
}

fn field<T: FromStr>(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    symbol: &str,
) -> Result<T, SwingscanError>
where
    T::Err: std::fmt::Display,
{
    let raw = record.get(index).ok_or_else(|| SwingscanError::Fetch {
        symbol: symbol.to_string(),
        reason: format!("missing {name} column"),
    })?;
    raw.trim().parse().map_err(|e| SwingscanError::Fetch {
        symbol: symbol.to_string(),
        reason: format!("invalid {name} value '{raw}': {e}"),
    })
}

pub fn parse_bars(symbol: &str, content: &str) -> Result<Vec<Bar>, SwingscanError> {
    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let mut bars = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| SwingscanError::Fetch {
            symbol: symbol.to_string(),
            reason: format!("CSV parse error: {e}"),
        })?;

        let date_str: String = field(&record, 0, "date", symbol)?;
        let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
            SwingscanError::Fetch {
                symbol: symbol.to_string(),
                reason: format!("invalid date '{date_str}': {e}"),
            }
        })?;

        bars.push(Bar {
            date,
            open: field(&record, 1, "open", symbol)?,
            high: field(&record, 2, "high", symbol)?,
            low: field(&record, 3, "low", symbol)?,
            close: field(&record, 4, "close", symbol)?,
            volume: field(&record, 5, "volume", symbol)?,
        });
    }

    bars.sort_by_key(|b| b.date);
    Ok(bars)
}

#[async_trait]
impl DataPort for CsvAdapter {
    async fn fetch_bars(&self, symbol: &str, lookback: usize) -> Result<Vec<Bar>, SwingscanError> {
        let path = self.csv_path(symbol);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| SwingscanError::Fetch {
                symbol: symbol.to_string(),
                reason: format!("failed to read {}: {e}", path.display()),
            })?;

        let mut bars = parse_bars(symbol, &content)?;
        let skip = bars.len().saturating_sub(lookback);
        bars.drain(..skip);
        Ok(bars)
    }

    async fn list_symbols(&self) -> Result<Vec<String>, SwingscanError> {
        let mut entries = tokio::fs::read_dir(&self.base_path).await.map_err(|e| {
            SwingscanError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to read directory {}: {e}", self.base_path.display()),
            ))
        })?;

        let mut symbols = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(symbol) = name.to_string_lossy().strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

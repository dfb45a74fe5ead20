#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
pub use swingscan::domain::ohlcv::Bar;
use swingscan::domain::error::SwingscanError;
use swingscan::ports::data_port::DataPort;

/// In-memory data port with injectable failures and fetch latency. Tracks
/// how many fetches are running at once.
#[derive(Default)]
pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
    pub delays: HashMap<String, Duration>,
    pub default_delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fetches: AtomicUsize,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn with_delay(mut self, symbol: &str, delay: Duration) -> Self {
        self.delays.insert(symbol.to_string(), delay);
        self
    }

    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataPort for MockDataPort {
    async fn fetch_bars(&self, symbol: &str, lookback: usize) -> Result<Vec<Bar>, SwingscanError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.delays.get(symbol).copied().or(self.default_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(reason) = self.errors.get(symbol) {
            return Err(SwingscanError::Fetch {
                symbol: symbol.to_string(),
                reason: reason.clone(),
            });
        }
        let bars = self.data.get(symbol).cloned().unwrap_or_default();
        let skip = bars.len().saturating_sub(lookback);
        Ok(bars[skip..].to_vec())
    }

    async fn list_symbols(&self) -> Result<Vec<String>, SwingscanError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Daily bars from closes; high/low sit one point either side.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    let start = date(2023, 1, 2);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            date: start + chrono::Duration::days(i as i64),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 10_000,
        })
        .collect()
}

/// Oscillating, slowly drifting series; `seed` shifts phase and amplitude so
/// each symbol gets a distinct shape.
pub fn wave_bars(count: usize, seed: usize) -> Vec<Bar> {
    let phase = seed as f64 * 0.7;
    let amplitude = 6.0 + (seed % 5) as f64;
    let closes: Vec<f64> = (0..count)
        .map(|i| {
            let t = i as f64;
            100.0 + (t * 0.3 + phase).sin() * amplitude + t * 0.04
        })
        .collect();
    bars_from_closes(&closes)
}

/// Flat base, a 30-bar rally to 160, then a pullback that closes just above
/// the 61.8% retracement. Yields a bullish plan under the default preset.
pub fn pullback_bars() -> Vec<Bar> {
    let flat = std::iter::repeat_n(100.0, 30);
    let rise = (1..=30).map(|i| 100.0 + 2.0 * i as f64);
    let fall = (1..=18).map(|j| 160.0 - 2.0 * j as f64);
    let closes: Vec<f64> = flat.chain(rise).chain(fall).collect();
    bars_from_closes(&closes)
}

pub fn symbol_names(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("SYM{i:03}")).collect()
}

/// A mock port holding `wave_bars` for every name.
pub fn wave_universe(symbols: &[String], count: usize) -> MockDataPort {
    symbols
        .iter()
        .enumerate()
        .fold(MockDataPort::new(), |port, (i, s)| {
            port.with_bars(s, wave_bars(count, i))
        })
}

pub fn write_csv(dir: &Path, symbol: &str, bars: &[Bar]) {
    let mut file = std::fs::File::create(dir.join(format!("{symbol}.csv"))).unwrap();
    writeln!(file, "date,open,high,low,close,volume").unwrap();
    for b in bars {
        writeln!(
            file,
            "{},{},{},{},{},{}",
            b.date, b.open, b.high, b.low, b.close, b.volume
        )
        .unwrap();
    }
}

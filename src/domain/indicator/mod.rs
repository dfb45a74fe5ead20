//! Technical indicator pipeline.
//!
//! This module provides the column-oriented indicator table consumed by the
//! signal detector:
//! - `Column`: identity of a named indicator column
//! - `IndicatorConfig`: lookback windows per indicator
//! - `IndicatorSeries`: the bar sequence plus one `Option<f64>` column per indicator
//! - `compute_indicators`: builds an `IndicatorSeries` from bars
//!
//! `None` marks an undefined cell (window not yet filled). Undefined cells are
//! never coerced to zero; consumers skip them explicitly.

pub mod adx;
pub mod atr;
pub mod ema;
pub mod fibonacci;
pub mod macd;
pub mod rsi;

pub use adx::calculate_adx;
pub use atr::calculate_atr;
pub use ema::{calculate_ema, ema_values};
pub use fibonacci::calculate_fibonacci;
pub use macd::calculate_macd;
pub use rsi::calculate_rsi;

use crate::domain::error::SwingscanError;
use crate::domain::ohlcv::Bar;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type Values = Vec<Option<f64>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Rsi,
    MacdLine,
    MacdSignal,
    MacdHistogram,
    Adx,
    PlusDi,
    MinusDi,
    Atr,
    FibHigh,
    Fib236,
    Fib382,
    Fib500,
    Fib618,
    Fib786,
    FibLow,
}

impl Column {
    /// Support/resistance levels ordered from swing high down to swing low.
    pub const FIB_LEVELS: [Column; 7] = [
        Column::FibHigh,
        Column::Fib236,
        Column::Fib382,
        Column::Fib500,
        Column::Fib618,
        Column::Fib786,
        Column::FibLow,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Column::Rsi => "rsi",
            Column::MacdLine => "macd_line",
            Column::MacdSignal => "macd_signal",
            Column::MacdHistogram => "macd_histogram",
            Column::Adx => "adx",
            Column::PlusDi => "plus_di",
            Column::MinusDi => "minus_di",
            Column::Atr => "atr",
            Column::FibHigh => "fib_high",
            Column::Fib236 => "fib_236",
            Column::Fib382 => "fib_382",
            Column::Fib500 => "fib_500",
            Column::Fib618 => "fib_618",
            Column::Fib786 => "fib_786",
            Column::FibLow => "fib_low",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub adx_period: usize,
    pub atr_period: usize,
    pub fib_window: usize,
    pub fib_tolerance: f64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_period: rsi::DEFAULT_PERIOD,
            macd_fast: macd::DEFAULT_FAST,
            macd_slow: macd::DEFAULT_SLOW,
            macd_signal: macd::DEFAULT_SIGNAL,
            adx_period: adx::DEFAULT_PERIOD,
            atr_period: atr::DEFAULT_PERIOD,
            fib_window: fibonacci::DEFAULT_WINDOW,
            fib_tolerance: fibonacci::DEFAULT_TOLERANCE,
        }
    }
}

impl IndicatorConfig {
    /// Longer windows tuned for multi-week swing trades.
    pub fn swing() -> Self {
        Self {
            rsi_period: 24,
            macd_fast: 20,
            macd_slow: 50,
            macd_signal: 20,
            adx_period: 25,
            atr_period: 14,
            fib_window: 150,
            fib_tolerance: 0.02,
        }
    }

    /// Largest lookback window; fewer bars than this is insufficient data.
    pub fn required_bars(&self) -> usize {
        [
            self.rsi_period,
            self.macd_slow,
            self.adx_period,
            self.atr_period,
            self.fib_window,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), SwingscanError> {
        let windows = [
            ("rsi_period", self.rsi_period),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
            ("adx_period", self.adx_period),
            ("atr_period", self.atr_period),
            ("fib_window", self.fib_window),
        ];
        for (key, window) in windows {
            if window == 0 {
                return Err(SwingscanError::invalid(
                    "indicators",
                    key,
                    "window must be at least 1",
                ));
            }
        }
        if self.macd_fast >= self.macd_slow {
            return Err(SwingscanError::invalid(
                "indicators",
                "macd_fast",
                "macd_fast must be shorter than macd_slow",
            ));
        }
        if !(self.fib_tolerance > 0.0 && self.fib_tolerance < 1.0) {
            return Err(SwingscanError::invalid(
                "indicators",
                "fib_tolerance",
                "fib_tolerance must be between 0 and 1",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    bars: Vec<Bar>,
    columns: BTreeMap<Column, Values>,
}

impl IndicatorSeries {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self {
            bars,
            columns: BTreeMap::new(),
        }
    }

    /// Columns are built from the same bars, one value per bar.
    pub(crate) fn with_column(mut self, column: Column, values: Values) -> Self {
        debug_assert_eq!(
            values.len(),
            self.bars.len(),
            "column {column} length must match bar count"
        );
        self.columns.insert(column, values);
        self
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        self.columns.keys().copied()
    }

    pub fn column(&self, column: Column) -> &[Option<f64>] {
        self.columns.get(&column).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn value(&self, column: Column, index: usize) -> Option<f64> {
        self.column(column).get(index).copied().flatten()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.bars.len().checked_sub(1)
    }

    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }

    pub fn last_value(&self, column: Column) -> Option<f64> {
        self.last_index().and_then(|i| self.value(column, i))
    }

    /// Defined values of a column over the trailing `count` rows, oldest first.
    pub fn trailing_defined(&self, column: Column, count: usize) -> Vec<f64> {
        let values = self.column(column);
        let start = values.len().saturating_sub(count);
        values[start..].iter().flatten().copied().collect()
    }
}

/// Compute every configured indicator over `bars`.
pub fn compute_indicators(
    bars: &[Bar],
    config: &IndicatorConfig,
) -> Result<IndicatorSeries, SwingscanError> {
    config.validate()?;

    let required = config.required_bars();
    if bars.len() < required {
        return Err(SwingscanError::InsufficientData {
            bars: bars.len(),
            required,
        });
    }

    let macd = calculate_macd(bars, config.macd_fast, config.macd_slow, config.macd_signal);
    let adx = calculate_adx(bars, config.adx_period);

    let mut series = IndicatorSeries::new(bars.to_vec())
        .with_column(Column::Rsi, calculate_rsi(bars, config.rsi_period))
        .with_column(Column::MacdLine, macd.line)
        .with_column(Column::MacdSignal, macd.signal)
        .with_column(Column::MacdHistogram, macd.histogram)
        .with_column(Column::Adx, adx.adx)
        .with_column(Column::PlusDi, adx.plus_di)
        .with_column(Column::MinusDi, adx.minus_di)
        .with_column(Column::Atr, calculate_atr(bars, config.atr_period));

    for (column, values) in calculate_fibonacci(bars, config.fib_window) {
        series = series.with_column(column, values);
    }

    Ok(series)
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::ohlcv::Bar;
    use chrono::NaiveDate;

    pub fn make_bars(prices: &[f64]) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1000,
            })
            .collect()
    }

    /// Flat at 100 for 30 bars, up 2 a bar to 160, then back down 2 a bar
    /// until the close sits just above the 61.8% retracement of the 50-bar swing.
    pub fn pullback() -> Vec<f64> {
        let flat = std::iter::repeat_n(100.0, 30);
        let rise = (1..=30).map(|i| 100.0 + 2.0 * i as f64);
        let fall = (1..=18).map(|j| 160.0 - 2.0 * j as f64);
        flat.chain(rise).chain(fall).collect()
    }

    pub fn wave(count: usize) -> Vec<f64> {
        (0..count)
            .map(|i| 100.0 + (i as f64 * 0.35).sin() * 8.0 + i as f64 * 0.05)
            .collect()
    }
}

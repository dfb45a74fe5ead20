//! Signals, ranking, and the detector loop.
//!
//! `detect_signals` evaluates every registered rule at every bar where the
//! rule's inputs are defined, then ranks the firings:
//! - strength descending
//! - earliest trigger date first on ties
//! - registration order, then bar order, as the final (stable) tie-break
//!
//! The full ranked list feeds the plan builder. `RankedSignalSet` is the
//! reported view, cut to `max_signals`. Opposite-direction signals on the same
//! bar are kept side by side; the plan builder counts them as conflicts.

use crate::domain::error::SwingscanError;
use crate::domain::indicator::{Column, IndicatorConfig, IndicatorSeries};
use crate::domain::signal_rule::{Firing, RuleRegistry};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_MAX_SIGNALS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Bullish => Direction::Bearish,
            Direction::Bearish => Direction::Bullish,
        }
    }

    /// +1 for bullish, -1 for bearish.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Bullish => 1.0,
            Direction::Bearish => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Bullish => write!(f, "bullish"),
            Direction::Bearish => write!(f, "bearish"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    symbol: String,
    direction: Direction,
    kind: String,
    index: usize,
    date: NaiveDate,
    strength: f64,
    values: BTreeMap<String, f64>,
}

impl Signal {
    pub fn new(
        symbol: &str,
        kind: &str,
        index: usize,
        date: NaiveDate,
        firing: Firing,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            direction: firing.direction,
            kind: kind.to_string(),
            index,
            date,
            strength: firing.strength,
            values: firing
                .values
                .into_iter()
                .map(|(name, v)| (name.to_string(), v))
                .collect(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }

    pub fn values(&self) -> &BTreeMap<String, f64> {
        &self.values
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSignalSet {
    symbol: String,
    signals: Vec<Signal>,
    total_detected: usize,
}

impl RankedSignalSet {
    pub fn empty(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            signals: Vec::new(),
            total_detected: 0,
        }
    }

    /// Rank `signals` (given in detection order) and keep the best `max_signals`.
    pub fn rank(symbol: &str, mut signals: Vec<Signal>, max_signals: usize) -> Self {
        let total_detected = signals.len();
        rank_signals(&mut signals);
        signals.truncate(max_signals);
        Self {
            symbol: symbol.to_string(),
            signals,
            total_detected,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn total_detected(&self) -> usize {
        self.total_detected
    }

    pub fn strongest(&self) -> Option<&Signal> {
        self.signals.first()
    }
}

/// Strength descending, then earliest date. `sort_by` is stable, so equal
/// keys keep detection order.
pub fn rank_signals(signals: &mut [Signal]) {
    signals.sort_by(|a, b| {
        b.strength
            .total_cmp(&a.strength)
            .then_with(|| a.date.cmp(&b.date))
    });
}

/// Opposite-direction signals triggered within `window` bars of `primary`.
pub fn count_conflicts(signals: &[Signal], primary: &Signal, window: usize) -> usize {
    let opposite = primary.direction.opposite();
    signals
        .iter()
        .filter(|s| s.direction == opposite && s.index.abs_diff(primary.index) <= window)
        .count()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    pub max_signals: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub adx_trend_threshold: f64,
    /// Restrict detection to these rule names; empty means every registered rule.
    pub rules: Vec<String>,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            max_signals: DEFAULT_MAX_SIGNALS,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            adx_trend_threshold: 25.0,
            rules: Vec::new(),
        }
    }
}

impl SignalConfig {
    pub fn validate(&self) -> Result<(), SwingscanError> {
        if self.max_signals == 0 {
            return Err(SwingscanError::invalid(
                "signals",
                "max_signals",
                "max_signals must be at least 1",
            ));
        }
        if !(0.0..=100.0).contains(&self.rsi_oversold)
            || !(0.0..=100.0).contains(&self.rsi_overbought)
            || self.rsi_oversold >= self.rsi_overbought
        {
            return Err(SwingscanError::invalid(
                "signals",
                "rsi_oversold",
                "RSI thresholds must satisfy 0 <= oversold < overbought <= 100",
            ));
        }
        if !(0.0..=100.0).contains(&self.adx_trend_threshold) {
            return Err(SwingscanError::invalid(
                "signals",
                "adx_trend_threshold",
                "adx_trend_threshold must be between 0 and 100",
            ));
        }
        Ok(())
    }
}

/// Inputs shared by every rule evaluation.
pub struct RuleContext<'a> {
    pub series: &'a IndicatorSeries,
    pub indicators: &'a IndicatorConfig,
    pub config: &'a SignalConfig,
}

impl<'a> RuleContext<'a> {
    pub fn new(
        series: &'a IndicatorSeries,
        indicators: &'a IndicatorConfig,
        config: &'a SignalConfig,
    ) -> Self {
        Self {
            series,
            indicators,
            config,
        }
    }

    pub fn value(&self, column: Column, index: usize) -> Option<f64> {
        self.series.value(column, index)
    }

    pub fn close(&self, index: usize) -> Option<f64> {
        self.series.bars().get(index).map(|b| b.close)
    }
}

/// Evaluate every rule at every eligible bar. Returns every firing, ranked.
pub fn detect_signals(
    symbol: &str,
    ctx: &RuleContext<'_>,
    registry: &RuleRegistry,
) -> Vec<Signal> {
    let bars = ctx.series.bars();
    let mut signals = Vec::new();

    for rule in registry.rules() {
        for index in rule.lookback..bars.len() {
            if !rule.inputs_defined(ctx.series, index) {
                continue;
            }
            if let Some(firing) = (rule.eval)(ctx, index) {
                signals.push(Signal::new(symbol, &rule.name, index, bars[index].date, firing));
            }
        }
    }

    rank_signals(&mut signals);
    signals
}

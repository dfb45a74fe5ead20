//! Named signal rules.
//!
//! A rule is a pure function evaluated at one bar of an `IndicatorSeries`. The
//! detector only calls it once every required column is defined at that bar
//! and at the `lookback` bars before it, so rule bodies may treat those
//! lookups as present.
//!
//! # Cross semantics
//!
//! - cross below `t`: previous >= t and current < t
//! - cross above `t`: previous <= t and current > t

use crate::domain::error::SwingscanError;
use crate::domain::indicator::fibonacci::RETRACEMENTS;
use crate::domain::indicator::{Column, IndicatorSeries};
use crate::domain::signal::{Direction, RuleContext};

pub const RSI_OVERSOLD_CROSS: &str = "RSI oversold cross";
pub const RSI_OVERBOUGHT_CROSS: &str = "RSI overbought cross";
pub const MACD_BULLISH_FLIP: &str = "MACD histogram bullish flip";
pub const MACD_BEARISH_FLIP: &str = "MACD histogram bearish flip";
pub const ADX_TREND_CONFIRMATION: &str = "ADX trend confirmation";
pub const FIBONACCI_TOUCH: &str = "Fibonacci level touch";

/// What a rule reports when it fires.
#[derive(Debug, Clone, PartialEq)]
pub struct Firing {
    pub direction: Direction,
    pub strength: f64,
    pub values: Vec<(&'static str, f64)>,
}

pub type RuleFn = fn(&RuleContext<'_>, usize) -> Option<Firing>;

#[derive(Debug, Clone)]
pub struct SignalRule {
    pub name: String,
    pub requires: Vec<Column>,
    /// Previous bars whose inputs must also be defined (1 for cross rules).
    pub lookback: usize,
    pub eval: RuleFn,
}

impl SignalRule {
    pub fn new(name: &str, requires: &[Column], lookback: usize, eval: RuleFn) -> Self {
        Self {
            name: name.to_string(),
            requires: requires.to_vec(),
            lookback,
            eval,
        }
    }

    pub fn inputs_defined(&self, series: &IndicatorSeries, index: usize) -> bool {
        if index < self.lookback {
            return false;
        }
        (index - self.lookback..=index)
            .all(|i| self.requires.iter().all(|&c| series.value(c, i).is_some()))
    }
}

/// Ordered set of rules keyed by name; evaluation follows registration order.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: Vec<SignalRule>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn standard() -> Self {
        let rules = vec![
            SignalRule::new(RSI_OVERSOLD_CROSS, &[Column::Rsi], 1, rsi_oversold_cross),
            SignalRule::new(RSI_OVERBOUGHT_CROSS, &[Column::Rsi], 1, rsi_overbought_cross),
            SignalRule::new(
                MACD_BULLISH_FLIP,
                &[Column::MacdLine, Column::MacdSignal, Column::MacdHistogram],
                1,
                macd_bullish_flip,
            ),
            SignalRule::new(
                MACD_BEARISH_FLIP,
                &[Column::MacdLine, Column::MacdSignal, Column::MacdHistogram],
                1,
                macd_bearish_flip,
            ),
            SignalRule::new(
                ADX_TREND_CONFIRMATION,
                &[Column::Adx, Column::PlusDi, Column::MinusDi],
                1,
                adx_trend_confirmation,
            ),
            SignalRule::new(FIBONACCI_TOUCH, &Column::FIB_LEVELS, 1, fibonacci_touch),
        ];
        Self { rules }
    }

    pub fn register(&mut self, rule: SignalRule) -> Result<(), SwingscanError> {
        if self.get(&rule.name).is_some() {
            return Err(SwingscanError::invalid(
                "signals",
                "rules",
                format!("rule '{}' is already registered", rule.name),
            ));
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Keep only the named rules, preserving registration order. An empty
    /// list keeps everything.
    pub fn select(&self, names: &[String]) -> Result<Self, SwingscanError> {
        if names.is_empty() {
            return Ok(self.clone());
        }
        if let Some(unknown) = names.iter().find(|n| self.get(n).is_none()) {
            return Err(SwingscanError::invalid(
                "signals",
                "rules",
                format!("unknown rule '{unknown}'"),
            ));
        }
        let rules = self
            .rules
            .iter()
            .filter(|r| names.contains(&r.name))
            .cloned()
            .collect();
        Ok(Self { rules })
    }

    pub fn get(&self, name: &str) -> Option<&SignalRule> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub fn rules(&self) -> &[SignalRule] {
        &self.rules
    }

    pub fn names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn current_and_previous(ctx: &RuleContext<'_>, column: Column, index: usize) -> Option<(f64, f64)> {
    let prev = ctx.value(column, index.checked_sub(1)?)?;
    let curr = ctx.value(column, index)?;
    Some((curr, prev))
}

fn rsi_oversold_cross(ctx: &RuleContext<'_>, index: usize) -> Option<Firing> {
    let threshold = ctx.config.rsi_oversold;
    let (rsi, prev) = current_and_previous(ctx, Column::Rsi, index)?;
    if !(prev >= threshold && rsi < threshold) {
        return None;
    }
    Some(Firing {
        direction: Direction::Bullish,
        strength: threshold - rsi + 1.0,
        values: vec![("rsi", rsi), ("previous_rsi", prev)],
    })
}

fn rsi_overbought_cross(ctx: &RuleContext<'_>, index: usize) -> Option<Firing> {
    let threshold = ctx.config.rsi_overbought;
    let (rsi, prev) = current_and_previous(ctx, Column::Rsi, index)?;
    if !(prev <= threshold && rsi > threshold) {
        return None;
    }
    Some(Firing {
        direction: Direction::Bearish,
        strength: rsi - threshold + 1.0,
        values: vec![("rsi", rsi), ("previous_rsi", prev)],
    })
}

/// Histogram slope in basis points of the close.
fn macd_flip(ctx: &RuleContext<'_>, index: usize, direction: Direction) -> Option<Firing> {
    let (hist, prev) = current_and_previous(ctx, Column::MacdHistogram, index)?;
    let flipped = match direction {
        Direction::Bullish => prev <= 0.0 && hist > 0.0,
        Direction::Bearish => prev >= 0.0 && hist < 0.0,
    };
    if !flipped {
        return None;
    }
    let close = ctx.close(index)?;
    if close <= 0.0 {
        return None;
    }
    Some(Firing {
        direction,
        strength: (hist - prev).abs() / close * 10_000.0,
        values: vec![
            ("macd_line", ctx.value(Column::MacdLine, index)?),
            ("macd_signal", ctx.value(Column::MacdSignal, index)?),
            ("macd_histogram", hist),
        ],
    })
}

fn macd_bullish_flip(ctx: &RuleContext<'_>, index: usize) -> Option<Firing> {
    macd_flip(ctx, index, Direction::Bullish)
}

fn macd_bearish_flip(ctx: &RuleContext<'_>, index: usize) -> Option<Firing> {
    macd_flip(ctx, index, Direction::Bearish)
}

fn adx_trend_confirmation(ctx: &RuleContext<'_>, index: usize) -> Option<Firing> {
    let threshold = ctx.config.adx_trend_threshold;
    let (adx, prev) = current_and_previous(ctx, Column::Adx, index)?;
    if !(prev <= threshold && adx > threshold) {
        return None;
    }
    let plus_di = ctx.value(Column::PlusDi, index)?;
    let minus_di = ctx.value(Column::MinusDi, index)?;
    let direction = if plus_di >= minus_di {
        Direction::Bullish
    } else {
        Direction::Bearish
    };
    Some(Firing {
        direction,
        strength: (adx - threshold) + (plus_di - minus_di).abs() / 10.0,
        values: vec![("adx", adx), ("plus_di", plus_di), ("minus_di", minus_di)],
    })
}

/// Relative distance from `price` to `level`.
fn distance(price: f64, level: f64) -> Option<f64> {
    (level > 0.0).then(|| (price - level).abs() / level)
}

/// Fires when the close enters the tolerance band of the nearest retracement
/// level; a close already inside that band on the previous bar does not re-fire.
fn fibonacci_touch(ctx: &RuleContext<'_>, index: usize) -> Option<Firing> {
    let tolerance = ctx.indicators.fib_tolerance;
    let close = ctx.close(index)?;

    let (column, level, dist) = RETRACEMENTS
        .iter()
        .filter_map(|&(column, _)| {
            let level = ctx.value(column, index)?;
            Some((column, level, distance(close, level)?))
        })
        .min_by(|a, b| a.2.total_cmp(&b.2))?;
    if dist > tolerance {
        return None;
    }

    let prev = index.checked_sub(1)?;
    let prev_close = ctx.close(prev)?;
    let prev_level = ctx.value(column, prev)?;
    if distance(prev_close, prev_level)? <= tolerance {
        return None;
    }

    let direction = if close >= level {
        Direction::Bullish
    } else {
        Direction::Bearish
    };
    let ratio = RETRACEMENTS
        .iter()
        .find(|(c, _)| *c == column)
        .map(|(_, r)| *r)?;
    Some(Firing {
        direction,
        strength: (1.0 - dist / tolerance) * 5.0,
        values: vec![("close", close), ("fib_level", level), ("fib_ratio", ratio)],
    })
}

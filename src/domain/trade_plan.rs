//! Trade plan construction under risk filters.
//!
//! A plan is only ever returned when it passes every filter; otherwise the
//! builder returns the first `PlanRejection` hit, in this order:
//!
//! 1. no signal / stale signal
//! 2. stop distance outside the ATR bounds (or ATR undefined)
//! 3. no invalidation level on the stop side
//! 4. risk/reward below the minimum
//!
//! The target is the nearest Fibonacci level ahead of entry that clears
//! `min_rr_ratio`, followed by the levels beyond it. With no such level the
//! target falls back to `reward_multiple` risk units from entry.
//! 5. high volatility regime
//! 6. too many opposite-direction signals around the primary signal

use crate::domain::error::SwingscanError;
use crate::domain::indicator::{Column, IndicatorSeries};
use crate::domain::signal::{Direction, Signal, count_conflicts};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_TARGETS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    pub stop_atr_multiple: f64,
    pub min_rr_ratio: f64,
    pub min_stop_atr: f64,
    pub max_stop_atr: f64,
    /// Fallback target distance in units of risk when no level ahead clears `min_rr_ratio`.
    pub reward_multiple: f64,
    pub max_conflicts: usize,
    pub conflict_window: usize,
    pub max_signal_age: usize,
    pub regime_lookback: usize,
    pub high_volatility_ratio: f64,
    pub low_volatility_ratio: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            stop_atr_multiple: 2.0,
            min_rr_ratio: 1.5,
            min_stop_atr: 0.5,
            max_stop_atr: 3.0,
            reward_multiple: 3.0,
            max_conflicts: 1,
            conflict_window: 3,
            max_signal_age: 10,
            regime_lookback: 50,
            high_volatility_ratio: 1.5,
            low_volatility_ratio: 0.75,
        }
    }
}

impl RiskConfig {
    pub fn swing() -> Self {
        Self {
            stop_atr_multiple: 2.5,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), SwingscanError> {
        let positive = [
            ("stop_atr_multiple", self.stop_atr_multiple),
            ("min_rr_ratio", self.min_rr_ratio),
            ("max_stop_atr", self.max_stop_atr),
            ("reward_multiple", self.reward_multiple),
            ("high_volatility_ratio", self.high_volatility_ratio),
        ];
        for (key, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SwingscanError::invalid(
                    "risk",
                    key,
                    "must be a positive number",
                ));
            }
        }
        if !(self.min_stop_atr >= 0.0 && self.min_stop_atr <= self.max_stop_atr) {
            return Err(SwingscanError::invalid(
                "risk",
                "min_stop_atr",
                "min_stop_atr must be between 0 and max_stop_atr",
            ));
        }
        if !(self.low_volatility_ratio >= 0.0
            && self.low_volatility_ratio < self.high_volatility_ratio)
        {
            return Err(SwingscanError::invalid(
                "risk",
                "low_volatility_ratio",
                "low_volatility_ratio must be below high_volatility_ratio",
            ));
        }
        if self.regime_lookback == 0 {
            return Err(SwingscanError::invalid(
                "risk",
                "regime_lookback",
                "regime_lookback must be at least 1",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityRegime {
    Low,
    Normal,
    High,
}

impl VolatilityRegime {
    pub fn classify(ratio: f64, config: &RiskConfig) -> Self {
        if ratio > config.high_volatility_ratio {
            VolatilityRegime::High
        } else if ratio < config.low_volatility_ratio {
            VolatilityRegime::Low
        } else {
            VolatilityRegime::Normal
        }
    }
}

impl fmt::Display for VolatilityRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolatilityRegime::Low => write!(f, "low"),
            VolatilityRegime::Normal => write!(f, "normal"),
            VolatilityRegime::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradePlan {
    pub symbol: String,
    pub direction: Direction,
    pub signal_kind: String,
    pub signal_date: NaiveDate,
    pub entry: f64,
    pub stop: f64,
    pub targets: Vec<f64>,
    pub risk: f64,
    pub reward: f64,
    pub rr_ratio: f64,
    pub invalidation: f64,
    pub atr: f64,
    pub stop_atr: f64,
    pub volatility_ratio: f64,
    pub regime: VolatilityRegime,
}

/// reward / risk, where risk = |entry - stop| and reward = |target - entry|.
/// `None` when the risk distance is zero.
pub fn risk_reward(entry: f64, stop: f64, target: f64) -> Option<f64> {
    let risk = (entry - stop).abs();
    (risk > 0.0).then(|| (target - entry).abs() / risk)
}

/// Why no plan was produced. An outcome, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum PlanRejection {
    NoSignal,
    StaleSignal {
        age: usize,
        max_age: usize,
    },
    StopOutOfBounds {
        stop_atr: Option<f64>,
        min: f64,
        max: f64,
    },
    MissingInvalidation {
        direction: Direction,
    },
    LowRiskReward {
        rr_ratio: f64,
        min: f64,
    },
    HighVolatility {
        ratio: f64,
        max: f64,
    },
    SignalConflict {
        conflicts: usize,
        max: usize,
    },
}

impl fmt::Display for PlanRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanRejection::NoSignal => write!(f, "no signal"),
            PlanRejection::StaleSignal { age, max_age } => {
                write!(f, "freshest signal is {age} bars old (max {max_age})")
            }
            PlanRejection::StopOutOfBounds {
                stop_atr: None, ..
            } => write!(f, "ATR undefined; stop distance cannot be bounded"),
            PlanRejection::StopOutOfBounds {
                stop_atr: Some(stop_atr),
                min,
                max,
            } => write!(f, "stop distance {stop_atr:.2} ATR outside [{min}, {max}]"),
            PlanRejection::MissingInvalidation { direction } => {
                write!(f, "no invalidation level for {direction} signal")
            }
            PlanRejection::LowRiskReward { rr_ratio, min } => {
                write!(f, "risk/reward {rr_ratio:.2} below {min}")
            }
            PlanRejection::HighVolatility { ratio, max } => {
                write!(f, "volatility ratio {ratio:.2} above {max}")
            }
            PlanRejection::SignalConflict { conflicts, max } => {
                write!(f, "{conflicts} conflicting signals (max {max})")
            }
        }
    }
}

/// Current ATR divided by the mean of the trailing defined ATR values.
pub fn volatility_ratio(series: &IndicatorSeries, lookback: usize) -> Option<f64> {
    let history = series.trailing_defined(Column::Atr, lookback);
    let current = *history.last()?;
    let mean = history.iter().sum::<f64>() / history.len() as f64;
    (mean > 0.0).then(|| current / mean)
}

/// Highest-ranked signal within `max_signal_age` bars of the last bar.
fn primary_signal<'a>(
    signals: &'a [Signal],
    last_index: usize,
    config: &RiskConfig,
) -> Result<&'a Signal, PlanRejection> {
    if signals.is_empty() {
        return Err(PlanRejection::NoSignal);
    }
    let age = |s: &Signal| last_index.saturating_sub(s.index());
    if let Some(signal) = signals.iter().find(|s| age(s) <= config.max_signal_age) {
        return Ok(signal);
    }
    let freshest = signals.iter().map(age).min().unwrap_or(usize::MAX);
    Err(PlanRejection::StaleSignal {
        age: freshest,
        max_age: config.max_signal_age,
    })
}

/// Fibonacci levels defined at the last bar, swing high and low included.
fn last_levels(series: &IndicatorSeries) -> Vec<f64> {
    Column::FIB_LEVELS
        .iter()
        .filter_map(|&c| series.last_value(c))
        .collect()
}

/// Build a plan for `symbol` from its ranked signals (every detected firing,
/// strongest first, as returned by `detect_signals`).
pub fn build_trade_plan(
    symbol: &str,
    signals: &[Signal],
    series: &IndicatorSeries,
    config: &RiskConfig,
) -> Result<TradePlan, PlanRejection> {
    let last_index = series.last_index().ok_or(PlanRejection::NoSignal)?;
    let primary = primary_signal(signals, last_index, config)?;
    let direction = primary.direction();
    let entry = series.last_close().ok_or(PlanRejection::NoSignal)?;

    let atr = match series.last_value(Column::Atr) {
        Some(atr) if atr > 0.0 => atr,
        _ => {
            return Err(PlanRejection::StopOutOfBounds {
                stop_atr: None,
                min: config.min_stop_atr,
                max: config.max_stop_atr,
            });
        }
    };
    let stop = entry - direction.sign() * config.stop_atr_multiple * atr;
    let risk = (entry - stop).abs();
    let stop_atr = risk / atr;
    if stop_atr < config.min_stop_atr || stop_atr > config.max_stop_atr {
        return Err(PlanRejection::StopOutOfBounds {
            stop_atr: Some(stop_atr),
            min: config.min_stop_atr,
            max: config.max_stop_atr,
        });
    }

    let levels = last_levels(series);
    // signed distance from entry towards profit
    let ahead = |level: f64| (level - entry) * direction.sign();

    let invalidation = levels
        .iter()
        .copied()
        .filter(|&l| ahead(l) < 0.0)
        .min_by(|a, b| ahead(*b).total_cmp(&ahead(*a)))
        .ok_or(PlanRejection::MissingInvalidation { direction })?;

    let mut ahead_levels: Vec<f64> = levels.iter().copied().filter(|&l| ahead(l) > 0.0).collect();
    ahead_levels.sort_by(|a, b| ahead(*a).total_cmp(&ahead(*b)));
    ahead_levels.dedup();
    let targets: Vec<f64> = match ahead_levels
        .iter()
        .position(|&l| ahead(l) / risk >= config.min_rr_ratio)
    {
        Some(first) => ahead_levels[first..].iter().copied().take(MAX_TARGETS).collect(),
        None => vec![entry + direction.sign() * config.reward_multiple * risk],
    };

    let reward = (targets[0] - entry).abs();
    let rr_ratio = reward / risk;
    if rr_ratio < config.min_rr_ratio {
        return Err(PlanRejection::LowRiskReward {
            rr_ratio,
            min: config.min_rr_ratio,
        });
    }

    let volatility_ratio = volatility_ratio(series, config.regime_lookback).unwrap_or(1.0);
    let regime = VolatilityRegime::classify(volatility_ratio, config);
    if regime == VolatilityRegime::High {
        return Err(PlanRejection::HighVolatility {
            ratio: volatility_ratio,
            max: config.high_volatility_ratio,
        });
    }

    let conflicts = count_conflicts(signals, primary, config.conflict_window);
    if conflicts > config.max_conflicts {
        return Err(PlanRejection::SignalConflict {
            conflicts,
            max: config.max_conflicts,
        });
    }

    Ok(TradePlan {
        symbol: symbol.to_string(),
        direction,
        signal_kind: primary.kind().to_string(),
        signal_date: primary.date(),
        entry,
        stop,
        targets,
        risk,
        reward,
        rr_ratio,
        invalidation,
        atr,
        stop_atr,
        volatility_ratio,
        regime,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;
    use crate::domain::signal::{RankedSignalSet, rank_signals};
    use crate::domain::signal_rule::Firing;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    const LEN: usize = 30;

    /// Flat closes ending at `entry`, constant ATR, Fibonacci levels only on the last bar.
    fn series(entry: f64, atr: Option<f64>, levels: &[f64]) -> IndicatorSeries {
        let bars = make_bars(&vec![entry; LEN]);
        let mut series = IndicatorSeries::new(bars).with_column(Column::Atr, vec![atr; LEN]);
        for (i, &column) in Column::FIB_LEVELS.iter().enumerate() {
            let mut values = vec![None; LEN];
            values[LEN - 1] = levels.get(i).copied();
            series = series.with_column(column, values);
        }
        series
    }

    fn signal(index: usize, direction: Direction, strength: f64) -> Signal {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(index as i64);
        Signal::new(
            "TEST",
            "RSI oversold cross",
            index,
            date,
            Firing {
                direction,
                strength,
                values: vec![],
            },
        )
    }

    fn ranked(mut signals: Vec<Signal>) -> Vec<Signal> {
        rank_signals(&mut signals);
        signals
    }

    fn config(k: f64) -> RiskConfig {
        RiskConfig {
            stop_atr_multiple: k,
            ..RiskConfig::default()
        }
    }

    #[test]
    fn scenario_entry_100_stop_97_5_target_110() {
        let s = series(100.0, Some(1.25), &[120.0, 110.0, 95.0]);
        let signals = ranked(vec![signal(LEN - 1, Direction::Bullish, 3.0)]);
        let plan = build_trade_plan("TEST", &signals, &s, &config(2.0)).unwrap();
        assert_relative_eq!(plan.entry, 100.0);
        assert_relative_eq!(plan.stop, 97.5);
        assert_relative_eq!(plan.risk, 2.5);
        assert_eq!(plan.targets, vec![110.0, 120.0]);
        assert_relative_eq!(plan.reward, 10.0);
        assert_relative_eq!(plan.rr_ratio, 4.0);
        assert_relative_eq!(plan.invalidation, 95.0);
        assert_eq!(plan.regime, VolatilityRegime::Normal);
        assert_eq!(risk_reward(100.0, 97.5, 110.0), Some(4.0));
    }

    #[test]
    fn bearish_plan_mirrors_levels() {
        let s = series(100.0, Some(1.0), &[104.0, 96.0, 90.0, 80.0, 75.0]);
        let signals = ranked(vec![signal(LEN - 2, Direction::Bearish, 3.0)]);
        let plan = build_trade_plan("TEST", &signals, &s, &RiskConfig::default()).unwrap();
        assert_eq!(plan.direction, Direction::Bearish);
        assert_relative_eq!(plan.stop, 102.0);
        assert_relative_eq!(plan.invalidation, 104.0);
        assert_eq!(plan.targets, vec![96.0, 90.0, 80.0]);
        assert_relative_eq!(plan.rr_ratio, 2.0);
    }

    #[test]
    fn empty_signal_set() {
        let s = series(100.0, Some(1.0), &[110.0, 90.0]);
        let result = build_trade_plan("TEST", &[], &s, &RiskConfig::default());
        assert_eq!(result, Err(PlanRejection::NoSignal));
    }

    #[test]
    fn stale_signal() {
        let s = series(100.0, Some(1.0), &[110.0, 90.0]);
        let signals = ranked(vec![signal(5, Direction::Bullish, 3.0)]);
        let result = build_trade_plan("TEST", &signals, &s, &RiskConfig::default());
        assert_eq!(
            result,
            Err(PlanRejection::StaleSignal {
                age: LEN - 1 - 5,
                max_age: 10
            })
        );
    }

    #[test]
    fn undefined_atr_is_out_of_bounds() {
        let s = series(100.0, None, &[110.0, 90.0]);
        let signals = ranked(vec![signal(LEN - 1, Direction::Bullish, 3.0)]);
        let result = build_trade_plan("TEST", &signals, &s, &RiskConfig::default());
        assert!(matches!(
            result,
            Err(PlanRejection::StopOutOfBounds { stop_atr: None, .. })
        ));
    }

    #[test]
    fn stop_multiple_outside_bounds() {
        let s = series(100.0, Some(1.0), &[120.0, 90.0]);
        let signals = ranked(vec![signal(LEN - 1, Direction::Bullish, 3.0)]);
        let result = build_trade_plan("TEST", &signals, &s, &config(4.0));
        assert!(matches!(
            result,
            Err(PlanRejection::StopOutOfBounds { stop_atr: Some(k), .. }) if (k - 4.0).abs() < 1e-9
        ));
    }

    #[test]
    fn missing_invalidation_level() {
        let s = series(100.0, Some(1.0), &[120.0, 110.0]);
        let signals = ranked(vec![signal(LEN - 1, Direction::Bullish, 3.0)]);
        let result = build_trade_plan("TEST", &signals, &s, &RiskConfig::default());
        assert_eq!(
            result,
            Err(PlanRejection::MissingInvalidation {
                direction: Direction::Bullish
            })
        );
    }

    #[test]
    fn fallback_target_uses_reward_multiple() {
        let s = series(100.0, Some(1.0), &[95.0, 90.0]);
        let signals = ranked(vec![signal(LEN - 1, Direction::Bullish, 3.0)]);
        let plan = build_trade_plan("TEST", &signals, &s, &RiskConfig::default()).unwrap();
        // risk 2.0 * reward_multiple 3.0
        assert_eq!(plan.targets, vec![106.0]);
        assert_relative_eq!(plan.rr_ratio, 3.0);
    }

    #[test]
    fn nearest_level_below_minimum_is_skipped() {
        let s = series(100.0, Some(1.0), &[102.0, 104.0, 108.0, 112.0, 90.0]);
        let signals = ranked(vec![signal(LEN - 1, Direction::Bullish, 3.0)]);
        let plan = build_trade_plan("TEST", &signals, &s, &RiskConfig::default()).unwrap();
        // 102 is only 1R away
        assert_eq!(plan.targets, vec![104.0, 108.0, 112.0]);
        assert_relative_eq!(plan.rr_ratio, 2.0);
        assert_relative_eq!(plan.reward, 4.0);
    }

    #[test]
    fn fallback_when_no_level_clears_minimum() {
        let s = series(100.0, Some(1.0), &[101.0, 102.0, 90.0]);
        let signals = ranked(vec![signal(LEN - 1, Direction::Bullish, 3.0)]);
        let plan = build_trade_plan("TEST", &signals, &s, &RiskConfig::default()).unwrap();
        assert_eq!(plan.targets, vec![106.0]);
        assert_relative_eq!(plan.rr_ratio, 3.0);
    }

    #[test]
    fn low_risk_reward_rejected() {
        let s = series(100.0, Some(1.0), &[101.0, 90.0]);
        let signals = ranked(vec![signal(LEN - 1, Direction::Bullish, 3.0)]);
        let risk = RiskConfig {
            reward_multiple: 1.0,
            ..RiskConfig::default()
        };
        let result = build_trade_plan("TEST", &signals, &s, &risk);
        assert_eq!(
            result,
            Err(PlanRejection::LowRiskReward {
                rr_ratio: 1.0,
                min: 1.5
            })
        );
    }

    #[test]
    fn fresh_signal_behind_stronger_history_is_primary() {
        let s = series(100.0, Some(1.0), &[110.0, 90.0]);
        let mut signals: Vec<Signal> = (0..12)
            .map(|i| signal(i, Direction::Bullish, 10.0))
            .collect();
        signals.push(signal(LEN - 1, Direction::Bullish, 0.5));
        let signals = ranked(signals);

        let reported = RankedSignalSet::rank("TEST", signals.clone(), 10);
        assert!(reported.signals().iter().all(|s| s.index() < 12));

        let plan = build_trade_plan("TEST", &signals, &s, &RiskConfig::default()).unwrap();
        assert_eq!(plan.signal_date, signals.last().unwrap().date());
    }

    #[test]
    fn conflicts_count_beyond_reported_signals() {
        let s = series(100.0, Some(1.0), &[110.0, 90.0]);
        let mut signals: Vec<Signal> = (0..10)
            .map(|i| signal(i, Direction::Bullish, 10.0))
            .collect();
        signals.push(signal(LEN - 1, Direction::Bullish, 2.0));
        signals.push(signal(LEN - 1, Direction::Bearish, 1.0));
        signals.push(signal(LEN - 2, Direction::Bearish, 0.5));
        let signals = ranked(signals);

        let result = build_trade_plan("TEST", &signals, &s, &RiskConfig::default());
        assert_eq!(
            result,
            Err(PlanRejection::SignalConflict {
                conflicts: 2,
                max: 1
            })
        );
    }

    #[test]
    fn high_volatility_rejected() {
        let mut atr = vec![Some(1.0); LEN];
        atr[LEN - 1] = Some(5.0);
        let s = series(100.0, Some(1.0), &[130.0, 90.0]).with_column(Column::Atr, atr);
        let signals = ranked(vec![signal(LEN - 1, Direction::Bullish, 3.0)]);
        let result = build_trade_plan("TEST", &signals, &s, &RiskConfig::default());
        assert!(matches!(result, Err(PlanRejection::HighVolatility { .. })));
    }

    #[test]
    fn conflicting_signals_rejected() {
        let s = series(100.0, Some(1.0), &[110.0, 90.0]);
        let signals = ranked(vec![
            signal(LEN - 1, Direction::Bullish, 5.0),
            signal(LEN - 1, Direction::Bearish, 4.0),
            signal(LEN - 2, Direction::Bearish, 3.0),
        ]);
        let result = build_trade_plan("TEST", &signals, &s, &RiskConfig::default());
        assert_eq!(
            result,
            Err(PlanRejection::SignalConflict {
                conflicts: 2,
                max: 1
            })
        );
    }

    #[test]
    fn single_same_bar_conflict_is_tolerated() {
        let s = series(100.0, Some(1.0), &[110.0, 90.0]);
        let signals = ranked(vec![
            signal(LEN - 1, Direction::Bullish, 5.0),
            signal(LEN - 1, Direction::Bearish, 4.0),
        ]);
        assert!(build_trade_plan("TEST", &signals, &s, &RiskConfig::default()).is_ok());
    }

    #[test]
    fn rejection_serializes_with_reason_tag() {
        let json = serde_json::to_value(PlanRejection::LowRiskReward {
            rr_ratio: 1.0,
            min: 1.5,
        })
        .unwrap();
        assert_eq!(json["reason"], "low_risk_reward");
        assert_eq!(PlanRejection::NoSignal.to_string(), "no signal");
    }

    #[test]
    fn config_validation() {
        assert!(RiskConfig::default().validate().is_ok());
        assert!(RiskConfig::swing().validate().is_ok());
        let bad = RiskConfig {
            min_stop_atr: 4.0,
            ..RiskConfig::default()
        };
        assert!(bad.validate().unwrap_err().is_config());
    }

    proptest! {
        #[test]
        fn accepted_plans_respect_risk_filters(
            entry in 10.0f64..500.0,
            atr in 0.1f64..20.0,
            k in 0.1f64..4.0,
            offsets in prop::collection::vec(-0.5f64..0.5, 1..7),
            bullish in any::<bool>(),
        ) {
            let levels: Vec<f64> = offsets.iter().map(|o| entry * (1.0 + o)).collect();
            let s = series(entry, Some(atr), &levels);
            let direction = if bullish { Direction::Bullish } else { Direction::Bearish };
            let signals = ranked(vec![signal(LEN - 1, direction, 1.0)]);
            let risk = config(k);
            if let Ok(plan) = build_trade_plan("TEST", &signals, &s, &risk) {
                prop_assert!(plan.rr_ratio >= risk.min_rr_ratio);
                prop_assert!(plan.stop_atr >= risk.min_stop_atr - 1e-9);
                prop_assert!(plan.stop_atr <= risk.max_stop_atr + 1e-9);
                prop_assert!((plan.stop - plan.entry) * direction.sign() < 0.0);
                prop_assert!(!plan.targets.is_empty() && plan.targets.len() <= MAX_TARGETS);
            }
        }
    }
}

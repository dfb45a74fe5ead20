//! Single-symbol pipeline and cross-symbol comparison.
//!
//! `analyze_symbol` runs indicators → signals → trade plan over one bar
//! sequence. `compare_symbols` picks a winner from a scan: symbols with a plan
//! rank by risk/reward, the rest by their strongest signal, ties by symbol.

use crate::domain::config::EngineConfig;
use crate::domain::error::{SwingscanError, SymbolError};
use crate::domain::indicator::{Column, compute_indicators};
use crate::domain::ohlcv::{Bar, validate_bars};
use crate::domain::scanner::ScanResult;
use crate::domain::signal::{Direction, RankedSignalSet, RuleContext, detect_signals};
use crate::domain::signal_rule::RuleRegistry;
use crate::domain::trade_plan::{PlanRejection, TradePlan, build_trade_plan};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolAnalysis {
    pub symbol: String,
    pub as_of: NaiveDate,
    pub price: f64,
    pub bars: usize,
    /// Last defined reading of each indicator column.
    pub indicators: BTreeMap<String, f64>,
    pub signals: RankedSignalSet,
    pub plan: Option<TradePlan>,
    pub rejection: Option<PlanRejection>,
}

pub fn analyze_symbol(
    symbol: &str,
    bars: &[Bar],
    config: &EngineConfig,
    registry: &RuleRegistry,
) -> Result<SymbolAnalysis, SwingscanError> {
    validate_bars(bars)?;
    let series = compute_indicators(bars, &config.indicators)?;
    let (as_of, price) = bars
        .last()
        .map(|b| (b.date, b.close))
        .ok_or(SwingscanError::InsufficientData {
            bars: 0,
            required: config.indicators.required_bars(),
        })?;

    let ctx = RuleContext::new(&series, &config.indicators, &config.signals);
    let detected = detect_signals(symbol, &ctx, registry);
    let (plan, rejection) = match build_trade_plan(symbol, &detected, &series, &config.risk) {
        Ok(plan) => (Some(plan), None),
        Err(rejection) => (None, Some(rejection)),
    };
    let signals = RankedSignalSet::rank(symbol, detected, config.signals.max_signals);

    let indicators = series
        .columns()
        .filter_map(|c: Column| {
            let last = series.column(c).iter().rev().find_map(|v| *v)?;
            Some((c.name().to_string(), last))
        })
        .collect();

    Ok(SymbolAnalysis {
        symbol: symbol.to_string(),
        as_of,
        price,
        bars: bars.len(),
        indicators,
        signals,
        plan,
        rejection,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonEntry {
    pub symbol: String,
    /// Risk/reward when a plan exists, otherwise the strongest signal's strength.
    pub score: f64,
    pub rr_ratio: Option<f64>,
    pub top_strength: Option<f64>,
    pub direction: Option<Direction>,
    pub signal_count: usize,
}

impl ComparisonEntry {
    fn has_plan(&self) -> bool {
        self.rr_ratio.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub rankings: Vec<ComparisonEntry>,
    pub winner: Option<ComparisonEntry>,
    pub errors: BTreeMap<String, SymbolError>,
}

fn rank_entries(a: &ComparisonEntry, b: &ComparisonEntry) -> Ordering {
    b.has_plan()
        .cmp(&a.has_plan())
        .then_with(|| b.score.total_cmp(&a.score))
        .then_with(|| a.symbol.cmp(&b.symbol))
}

pub fn compare_symbols(scan: &ScanResult) -> ComparisonResult {
    let mut rankings = Vec::new();
    let mut errors = BTreeMap::new();

    for (symbol, entry) in &scan.symbols {
        if let Some(error) = &entry.error {
            errors.insert(symbol.clone(), error.clone());
            continue;
        }
        let Some(signals) = &entry.signals else {
            continue;
        };
        let top = signals.strongest();
        let rr_ratio = entry.plan.as_ref().map(|p| p.rr_ratio);
        let top_strength = top.map(|s| s.strength());
        rankings.push(ComparisonEntry {
            symbol: symbol.clone(),
            score: rr_ratio.or(top_strength).unwrap_or(0.0),
            rr_ratio,
            top_strength,
            direction: entry
                .plan
                .as_ref()
                .map(|p| p.direction)
                .or(top.map(|s| s.direction())),
            signal_count: signals.len(),
        });
    }

    rankings.sort_by(rank_entries);
    let winner = rankings
        .first()
        .filter(|e| e.has_plan() || e.signal_count > 0)
        .cloned();

    ComparisonResult {
        rankings,
        winner,
        errors,
    }
}

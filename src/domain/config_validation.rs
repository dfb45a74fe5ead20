//! Builds validated engine settings from an INI `ConfigPort`.
//!
//! Sections: `[data]`, `[scan]`, `[indicators]`, `[signals]`, `[risk]`,
//! `[regression]`. Absent keys fall back to the selected preset; present but
//! malformed values are `ConfigInvalid`.

use crate::domain::config::{EngineConfig, Preset};
use crate::domain::error::SwingscanError;
use crate::domain::regression::{ToleranceConfig, Tool};
use crate::domain::universe::parse_symbols;
use crate::ports::config_port::ConfigPort;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_BASELINE_DIR: &str = "baselines";

fn parse_value<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, SwingscanError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            SwingscanError::invalid(section, key, format!("cannot parse '{}'", raw.trim()))
        }),
    }
}

fn timeout_ms(
    config: &dyn ConfigPort,
    key: &str,
    default: Option<u64>,
) -> Result<Option<u64>, SwingscanError> {
    let secs: f64 = match config.get_string("scan", key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|_| {
            SwingscanError::invalid("scan", key, format!("cannot parse '{}'", raw.trim()))
        })?,
        _ => return Ok(default),
    };
    if !secs.is_finite() || secs <= 0.0 {
        return Err(SwingscanError::invalid("scan", key, "timeout must be positive"));
    }
    Ok(Some((secs * 1000.0).round().max(1.0) as u64))
}

pub fn load_engine_config(config: &dyn ConfigPort) -> Result<EngineConfig, SwingscanError> {
    let preset = match config.get_string("scan", "preset") {
        Some(raw) => raw.parse::<Preset>()?,
        None => Preset::Default,
    };
    let mut engine = EngineConfig::preset(preset);

    let scan = &mut engine.scan;
    scan.lookback = parse_value(config, "data", "lookback", scan.lookback)?;
    scan.max_concurrent = parse_value(config, "scan", "max_concurrent", scan.max_concurrent)?;
    scan.max_results = parse_value(config, "scan", "max_results", scan.max_results)?;
    scan.scan_timeout_ms = timeout_ms(config, "scan_timeout_secs", scan.scan_timeout_ms)?;
    scan.symbol_timeout_ms = timeout_ms(config, "symbol_timeout_secs", scan.symbol_timeout_ms)?;

    let ind = &mut engine.indicators;
    ind.rsi_period = parse_value(config, "indicators", "rsi_period", ind.rsi_period)?;
    ind.macd_fast = parse_value(config, "indicators", "macd_fast", ind.macd_fast)?;
    ind.macd_slow = parse_value(config, "indicators", "macd_slow", ind.macd_slow)?;
    ind.macd_signal = parse_value(config, "indicators", "macd_signal", ind.macd_signal)?;
    ind.adx_period = parse_value(config, "indicators", "adx_period", ind.adx_period)?;
    ind.atr_period = parse_value(config, "indicators", "atr_period", ind.atr_period)?;
    ind.fib_window = parse_value(config, "indicators", "fib_window", ind.fib_window)?;
    ind.fib_tolerance = parse_value(config, "indicators", "fib_tolerance", ind.fib_tolerance)?;

    let sig = &mut engine.signals;
    sig.max_signals = parse_value(config, "signals", "max_signals", sig.max_signals)?;
    sig.rsi_oversold = parse_value(config, "signals", "rsi_oversold", sig.rsi_oversold)?;
    sig.rsi_overbought = parse_value(config, "signals", "rsi_overbought", sig.rsi_overbought)?;
    sig.adx_trend_threshold =
        parse_value(config, "signals", "adx_trend_threshold", sig.adx_trend_threshold)?;
    if let Some(rules) = config.get_list("signals", "rules") {
        sig.rules = rules;
    }

    let risk = &mut engine.risk;
    risk.stop_atr_multiple =
        parse_value(config, "risk", "stop_atr_multiple", risk.stop_atr_multiple)?;
    risk.min_rr_ratio = parse_value(config, "risk", "min_rr_ratio", risk.min_rr_ratio)?;
    risk.min_stop_atr = parse_value(config, "risk", "min_stop_atr", risk.min_stop_atr)?;
    risk.max_stop_atr = parse_value(config, "risk", "max_stop_atr", risk.max_stop_atr)?;
    risk.reward_multiple = parse_value(config, "risk", "reward_multiple", risk.reward_multiple)?;
    risk.max_conflicts = parse_value(config, "risk", "max_conflicts", risk.max_conflicts)?;
    risk.conflict_window = parse_value(config, "risk", "conflict_window", risk.conflict_window)?;
    risk.max_signal_age = parse_value(config, "risk", "max_signal_age", risk.max_signal_age)?;
    risk.regime_lookback = parse_value(config, "risk", "regime_lookback", risk.regime_lookback)?;
    risk.high_volatility_ratio =
        parse_value(config, "risk", "high_volatility_ratio", risk.high_volatility_ratio)?;
    risk.low_volatility_ratio =
        parse_value(config, "risk", "low_volatility_ratio", risk.low_volatility_ratio)?;

    engine.validate()?;
    Ok(engine)
}

pub fn load_tolerance_config(config: &dyn ConfigPort) -> Result<ToleranceConfig, SwingscanError> {
    let mut tolerance = ToleranceConfig::default();
    tolerance.count_tolerance =
        parse_value(config, "regression", "count_tolerance", tolerance.count_tolerance)?;
    tolerance.numeric_tolerance =
        parse_value(config, "regression", "numeric_tolerance", tolerance.numeric_tolerance)?;
    if !tolerance.numeric_tolerance.is_finite() || tolerance.numeric_tolerance < 0.0 {
        return Err(SwingscanError::invalid(
            "regression",
            "numeric_tolerance",
            "numeric_tolerance must be non-negative",
        ));
    }
    if let Some(fields) = config.get_list("regression", "count_fields") {
        tolerance.count_fields = fields;
    }
    if let Some(fields) = config.get_list("regression", "identity_fields") {
        tolerance.identity_fields = fields;
    }
    if let Some(fields) = config.get_list("regression", "volatile_fields") {
        tolerance.volatile_fields = fields;
    }
    Ok(tolerance)
}

/// Symbols from `[scan] symbols`, or `None` to use every symbol the data
/// source lists.
pub fn load_symbols(config: &dyn ConfigPort) -> Result<Option<Vec<String>>, SwingscanError> {
    match config.get_string("scan", "symbols") {
        Some(raw) if !raw.trim().is_empty() => Ok(Some(parse_symbols(&raw)?)),
        _ => Ok(None),
    }
}

pub fn load_csv_dir(config: &dyn ConfigPort) -> Result<PathBuf, SwingscanError> {
    match config.get_string("data", "csv_dir") {
        Some(dir) if !dir.trim().is_empty() => Ok(PathBuf::from(dir.trim())),
        _ => Err(SwingscanError::ConfigMissing {
            section: "data".to_string(),
            key: "csv_dir".to_string(),
        }),
    }
}

pub fn load_baseline_dir(config: &dyn ConfigPort) -> PathBuf {
    config
        .get_string("regression", "baseline_dir")
        .filter(|dir| !dir.trim().is_empty())
        .map(|dir| PathBuf::from(dir.trim()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BASELINE_DIR))
}

pub fn load_tools(config: &dyn ConfigPort) -> Result<Vec<Tool>, SwingscanError> {
    match config.get_list("regression", "tools") {
        Some(names) => names.iter().map(|name| name.parse()).collect(),
        None => Ok(Tool::ALL.to_vec()),
    }
}

//! Engine configuration: one struct per pipeline stage plus named presets.

use crate::domain::error::SwingscanError;
use crate::domain::indicator::IndicatorConfig;
use crate::domain::signal::SignalConfig;
use crate::domain::trade_plan::RiskConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MAX_CONCURRENT: usize = 10;
pub const DEFAULT_MAX_RESULTS: usize = 10;
pub const DEFAULT_LOOKBACK: usize = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Default,
    Swing,
}

impl FromStr for Preset {
    type Err = SwingscanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "default" => Ok(Preset::Default),
            "swing" => Ok(Preset::Swing),
            other => Err(SwingscanError::invalid(
                "scan",
                "preset",
                format!("unknown preset '{other}', expected default or swing"),
            )),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Preset::Default => write!(f, "default"),
            Preset::Swing => write!(f, "swing"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Bars requested per symbol.
    pub lookback: usize,
    pub max_concurrent: usize,
    pub max_results: usize,
    pub scan_timeout_ms: Option<u64>,
    pub symbol_timeout_ms: Option<u64>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            lookback: DEFAULT_LOOKBACK,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            max_results: DEFAULT_MAX_RESULTS,
            scan_timeout_ms: None,
            symbol_timeout_ms: None,
        }
    }
}

impl ScanConfig {
    pub fn scan_timeout(&self) -> Option<Duration> {
        self.scan_timeout_ms.map(Duration::from_millis)
    }

    pub fn symbol_timeout(&self) -> Option<Duration> {
        self.symbol_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub preset: Preset,
    pub indicators: IndicatorConfig,
    pub signals: SignalConfig,
    pub risk: RiskConfig,
    pub scan: ScanConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            preset: Preset::Default,
            indicators: IndicatorConfig::default(),
            signals: SignalConfig::default(),
            risk: RiskConfig::default(),
            scan: ScanConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn swing() -> Self {
        Self {
            preset: Preset::Swing,
            indicators: IndicatorConfig::swing(),
            signals: SignalConfig {
                max_signals: 12,
                ..SignalConfig::default()
            },
            risk: RiskConfig::swing(),
            scan: ScanConfig::default(),
        }
    }

    pub fn preset(preset: Preset) -> Self {
        match preset {
            Preset::Default => Self::default(),
            Preset::Swing => Self::swing(),
        }
    }

    pub fn validate(&self) -> Result<(), SwingscanError> {
        self.indicators.validate()?;
        self.signals.validate()?;
        self.risk.validate()?;

        let scan = &self.scan;
        if scan.max_concurrent == 0 {
            return Err(SwingscanError::invalid(
                "scan",
                "max_concurrent",
                "max_concurrent must be at least 1",
            ));
        }
        if scan.max_results == 0 {
            return Err(SwingscanError::invalid(
                "scan",
                "max_results",
                "max_results must be at least 1",
            ));
        }
        let required = self.indicators.required_bars();
        if scan.lookback < required {
            return Err(SwingscanError::invalid(
                "data",
                "lookback",
                format!("lookback {} is shorter than the largest indicator window {required}", scan.lookback),
            ));
        }
        for (key, timeout) in [
            ("scan_timeout_secs", scan.scan_timeout_ms),
            ("symbol_timeout_secs", scan.symbol_timeout_ms),
        ] {
            if timeout == Some(0) {
                return Err(SwingscanError::invalid("scan", key, "timeout must be positive"));
            }
        }
        Ok(())
    }
}

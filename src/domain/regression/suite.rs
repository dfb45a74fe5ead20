//! Multi-tool regression run.
//!
//! Each tool is executed through the scanner, its output is compared against
//! (or, with `refresh`, written as) the stored baseline, and the outcomes are
//! totalled into a `RegressionReport`.

use crate::domain::analysis::compare_symbols;
use crate::domain::config::EngineConfig;
use crate::domain::error::SwingscanError;
use crate::domain::regression::{RegressionComparison, RegressionEngine, Status};
use crate::domain::scanner::{ScanResult, UniverseScanner};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tool {
    #[serde(rename = "scan_universe")]
    Scan,
    #[serde(rename = "analyze_security")]
    Analyze,
    #[serde(rename = "compare_securities")]
    Compare,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::Scan, Tool::Analyze, Tool::Compare];

    /// Baseline id for this tool.
    pub fn id(&self) -> &'static str {
        match self {
            Tool::Scan => "scan_universe",
            Tool::Analyze => "analyze_security",
            Tool::Compare => "compare_securities",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Tool {
    type Err = SwingscanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Tool::ALL
            .into_iter()
            .find(|t| t.id() == s)
            .ok_or_else(|| {
                SwingscanError::invalid(
                    "regression",
                    "tools",
                    format!(
                        "unknown tool '{s}', expected scan_universe, analyze_security or compare_securities"
                    ),
                )
            })
    }
}

/// A tool that could not produce output to compare.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFailure {
    pub tool: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionReport {
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub warnings: usize,
    pub failed: usize,
    pub baselines_created: usize,
    pub errors: usize,
    pub comparisons: Vec<RegressionComparison>,
    pub failures: Vec<ToolFailure>,
    pub config: EngineConfig,
}

impl RegressionReport {
    fn new(config: EngineConfig) -> Self {
        Self {
            generated_at: Utc::now(),
            total: 0,
            passed: 0,
            warnings: 0,
            failed: 0,
            baselines_created: 0,
            errors: 0,
            comparisons: Vec::new(),
            failures: Vec::new(),
            config,
        }
    }

    fn record(&mut self, comparison: RegressionComparison) {
        self.total += 1;
        match comparison.status {
            Status::Pass => self.passed += 1,
            Status::Warning => self.warnings += 1,
            Status::Fail => self.failed += 1,
            Status::BaselineCreated => self.baselines_created += 1,
        }
        self.comparisons.push(comparison);
    }

    fn record_failure(&mut self, tool: Tool, err: &SwingscanError) {
        self.total += 1;
        self.errors += 1;
        self.failures.push(ToolFailure {
            tool: tool.id().to_string(),
            reason: err.to_string(),
        });
    }

    /// No failed comparisons and no tool errors. Warnings are allowed.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }
}

pub struct RegressionSuite {
    engine: Arc<RegressionEngine>,
}

impl RegressionSuite {
    pub fn new(engine: Arc<RegressionEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &RegressionEngine {
        &self.engine
    }

    /// Run `tools` over `symbols`. Configuration errors abort the run; any
    /// other failure is recorded against its tool.
    pub async fn run(
        &self,
        scanner: &UniverseScanner,
        symbols: &[String],
        tools: &[Tool],
        refresh: bool,
    ) -> Result<RegressionReport, SwingscanError> {
        let mut report = RegressionReport::new(scanner.config().clone());
        let mut scan: Option<ScanResult> = None;

        for &tool in tools {
            let output = match self.execute(tool, scanner, symbols, &mut scan).await {
                Ok(output) => output,
                Err(e) if e.is_config() => return Err(e),
                Err(e) => {
                    tracing::warn!(tool = tool.id(), error = %e, "tool failed");
                    report.record_failure(tool, &e);
                    continue;
                }
            };

            match self.settle(tool, output, refresh).await {
                Ok(comparison) => report.record(comparison),
                Err(e) => report.record_failure(tool, &e),
            }
        }

        tracing::info!(
            total = report.total,
            passed = report.passed,
            warnings = report.warnings,
            failed = report.failed,
            baselines_created = report.baselines_created,
            errors = report.errors,
            "regression run finished"
        );
        Ok(report)
    }

    /// Compare against, or with `refresh` overwrite, the stored baseline.
    /// Store I/O is blocking, so it runs on the blocking pool.
    async fn settle(
        &self,
        tool: Tool,
        output: serde_json::Value,
        refresh: bool,
    ) -> Result<RegressionComparison, SwingscanError> {
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || {
            if refresh {
                engine.refresh(tool.id(), &output).map(|b| RegressionComparison {
                    tool: b.tool,
                    status: Status::BaselineCreated,
                    new_hash: b.hash,
                    baseline_hash: None,
                    differences: Vec::new(),
                })
            } else {
                engine.compare(tool.id(), &output)
            }
        })
        .await
        .map_err(|e| SwingscanError::Baseline {
            reason: format!("{} baseline task failed: {e}", tool.id()),
        })?
    }

    async fn execute(
        &self,
        tool: Tool,
        scanner: &UniverseScanner,
        symbols: &[String],
        scan: &mut Option<ScanResult>,
    ) -> Result<serde_json::Value, SwingscanError> {
        match tool {
            Tool::Analyze => {
                let symbol = symbols.first().ok_or_else(|| {
                    SwingscanError::invalid("scan", "symbols", "analyze_security needs a symbol")
                })?;
                Ok(serde_json::to_value(scanner.analyze(symbol).await?)?)
            }
            Tool::Scan | Tool::Compare => {
                let result = match scan {
                    Some(result) => result,
                    None => scan.insert(scanner.scan(symbols).await?),
                };
                if tool == Tool::Scan {
                    Ok(serde_json::to_value(&*result)?)
                } else {
                    Ok(serde_json::to_value(compare_symbols(result))?)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_ids_round_trip_through_from_str() {
        for tool in Tool::ALL {
            assert_eq!(tool.id().parse::<Tool>().unwrap(), tool);
        }
        assert!("backtest".parse::<Tool>().unwrap_err().is_config());
    }

    #[test]
    fn tool_serializes_as_id() {
        let json = serde_json::to_string(&Tool::Compare).unwrap();
        assert_eq!(json, r#""compare_securities""#);
    }

    #[test]
    fn report_totals() {
        let mut report = RegressionReport::new(EngineConfig::default());
        let cmp = |status| RegressionComparison {
            tool: "t".to_string(),
            status,
            new_hash: String::new(),
            baseline_hash: None,
            differences: Vec::new(),
        };
        report.record(cmp(Status::Pass));
        report.record(cmp(Status::Warning));
        assert!(report.is_success());
        report.record(cmp(Status::Fail));
        report.record_failure(Tool::Analyze, &SwingscanError::Timeout { millis: 5 });
        assert_eq!(report.total, 4);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors, 1);
        assert!(!report.is_success());
    }
}

//! Bounded-concurrency universe scanner.
//!
//! One tokio task per symbol runs fetch → indicators → signals → plan while
//! holding a semaphore permit, so at most `max_concurrent` pipelines are in
//! flight. Per-symbol failures become `SymbolError`s in the result; only
//! configuration errors abort a scan, and they do so before any task starts.

use crate::domain::analysis::{SymbolAnalysis, analyze_symbol};
use crate::domain::config::EngineConfig;
use crate::domain::error::{SwingscanError, SymbolError};
use crate::domain::ohlcv::Bar;
use crate::domain::signal::RankedSignalSet;
use crate::domain::signal_rule::RuleRegistry;
use crate::domain::trade_plan::{PlanRejection, TradePlan};
use crate::domain::universe::validate_symbols;
use crate::ports::data_port::DataPort;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub signals: Option<RankedSignalSet>,
    pub plan: Option<TradePlan>,
    pub rejection: Option<PlanRejection>,
    pub error: Option<SymbolError>,
}

impl SymbolEntry {
    pub fn analyzed(
        signals: RankedSignalSet,
        plan: Option<TradePlan>,
        rejection: Option<PlanRejection>,
    ) -> Self {
        Self {
            signals: Some(signals),
            plan,
            rejection,
            error: None,
        }
    }

    pub fn failed(error: SymbolError) -> Self {
        Self {
            signals: None,
            plan: None,
            rejection: None,
            error: Some(error),
        }
    }
}

impl From<SymbolAnalysis> for SymbolEntry {
    fn from(analysis: SymbolAnalysis) -> Self {
        Self::analyzed(analysis.signals, analysis.plan, analysis.rejection)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub requested: usize,
    pub analyzed: usize,
    pub errored: usize,
    pub plans: usize,
    pub timed_out: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub symbols: BTreeMap<String, SymbolEntry>,
    pub top_plans: Vec<TradePlan>,
    pub summary: ScanSummary,
}

impl ScanResult {
    fn assemble(symbols: BTreeMap<String, SymbolEntry>, max_results: usize, started: Instant) -> Self {
        let mut top_plans: Vec<TradePlan> =
            symbols.values().filter_map(|e| e.plan.clone()).collect();
        let plans = top_plans.len();
        top_plans.sort_by(|a, b| {
            b.rr_ratio
                .total_cmp(&a.rr_ratio)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        top_plans.truncate(max_results);

        let errored = symbols.values().filter(|e| e.error.is_some()).count();
        let timed_out = symbols
            .values()
            .filter(|e| e.error == Some(SymbolError::Timeout))
            .count();
        let summary = ScanSummary {
            requested: symbols.len(),
            analyzed: symbols.len() - errored,
            errored,
            plans,
            timed_out,
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };

        Self {
            symbols,
            top_plans,
            summary,
        }
    }

    pub fn entry(&self, symbol: &str) -> Option<&SymbolEntry> {
        self.symbols.get(symbol)
    }
}

pub struct UniverseScanner {
    data: Arc<dyn DataPort>,
    config: EngineConfig,
    registry: RuleRegistry,
}

impl UniverseScanner {
    pub fn new(data: Arc<dyn DataPort>, config: EngineConfig) -> Self {
        Self {
            data,
            config,
            registry: RuleRegistry::standard(),
        }
    }

    /// Replace the standard rule set.
    pub fn with_registry(mut self, registry: RuleRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn active_registry(&self) -> Result<RuleRegistry, SwingscanError> {
        self.config.validate()?;
        self.registry.select(&self.config.signals.rules)
    }

    /// Fetch and analyze one symbol; failures surface as errors.
    pub async fn analyze(&self, symbol: &str) -> Result<SymbolAnalysis, SwingscanError> {
        let registry = self.active_registry()?;
        validate_symbols(&[symbol.to_string()])?;
        let bars = fetch(self.data.as_ref(), symbol, &self.config).await?;
        analyze_symbol(symbol, &bars, &self.config, &registry)
    }

    pub async fn scan(&self, symbols: &[String]) -> Result<ScanResult, SwingscanError> {
        let registry = Arc::new(self.active_registry()?);
        validate_symbols(symbols)?;

        let started = Instant::now();
        let scan = &self.config.scan;
        tracing::info!(
            symbols = symbols.len(),
            max_concurrent = scan.max_concurrent,
            "scan started"
        );

        let semaphore = Arc::new(Semaphore::new(scan.max_concurrent));
        let mut tasks: JoinSet<(String, SymbolEntry)> = JoinSet::new();
        let mut pending: HashMap<Id, String> = HashMap::new();

        for symbol in symbols {
            let semaphore = Arc::clone(&semaphore);
            let data = Arc::clone(&self.data);
            let registry = Arc::clone(&registry);
            let config = self.config.clone();
            let task_symbol = symbol.clone();

            let handle = tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    let error = SymbolError::Failed {
                        reason: "scanner shut down".to_string(),
                    };
                    return (task_symbol, SymbolEntry::failed(error));
                };
                let entry = run_pipeline(data.as_ref(), &task_symbol, &config, &registry).await;
                (task_symbol, entry)
            });
            pending.insert(handle.id(), symbol.clone());
        }

        let mut entries = BTreeMap::new();
        let drained = match scan.scan_timeout() {
            Some(limit) => {
                tokio::time::timeout(limit, drain(&mut tasks, &mut pending, &mut entries))
                    .await
                    .is_ok()
            }
            None => {
                drain(&mut tasks, &mut pending, &mut entries).await;
                true
            }
        };

        if !drained {
            tasks.shutdown().await;
            tracing::warn!(remaining = pending.len(), "scan timed out");
            for (_, symbol) in pending.drain() {
                entries.insert(symbol, SymbolEntry::failed(SymbolError::Timeout));
            }
        }

        let result = ScanResult::assemble(entries, scan.max_results, started);
        tracing::info!(
            requested = result.summary.requested,
            analyzed = result.summary.analyzed,
            errored = result.summary.errored,
            plans = result.summary.plans,
            timed_out = result.summary.timed_out,
            elapsed_ms = result.summary.elapsed_ms,
            "scan finished"
        );
        Ok(result)
    }
}

async fn drain(
    tasks: &mut JoinSet<(String, SymbolEntry)>,
    pending: &mut HashMap<Id, String>,
    entries: &mut BTreeMap<String, SymbolEntry>,
) {
    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((id, (symbol, entry))) => {
                pending.remove(&id);
                entries.insert(symbol, entry);
            }
            Err(e) => {
                let Some(symbol) = pending.remove(&e.id()) else {
                    continue;
                };
                tracing::error!(symbol = %symbol, error = %e, "symbol task failed");
                let error = SymbolError::Failed {
                    reason: e.to_string(),
                };
                entries.insert(symbol, SymbolEntry::failed(error));
            }
        }
    }
}

async fn fetch(
    data: &dyn DataPort,
    symbol: &str,
    config: &EngineConfig,
) -> Result<Vec<Bar>, SwingscanError> {
    let lookback = config.scan.lookback;
    match config.scan.symbol_timeout() {
        Some(limit) => tokio::time::timeout(limit, data.fetch_bars(symbol, lookback))
            .await
            .map_err(|_| SwingscanError::Timeout {
                millis: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
            })?,
        None => data.fetch_bars(symbol, lookback).await,
    }
}

async fn run_pipeline(
    data: &dyn DataPort,
    symbol: &str,
    config: &EngineConfig,
    registry: &RuleRegistry,
) -> SymbolEntry {
    let analysis = match fetch(data, symbol, config).await {
        Ok(bars) => analyze_symbol(symbol, &bars, config, registry),
        Err(e) => Err(e),
    };
    match analysis {
        Ok(analysis) => {
            tracing::debug!(
                symbol,
                signals = analysis.signals.len(),
                plan = analysis.plan.is_some(),
                "symbol analyzed"
            );
            analysis.into()
        }
        Err(e) => {
            tracing::warn!(symbol, error = %e, "symbol skipped");
            SymbolEntry::failed(e.into())
        }
    }
}

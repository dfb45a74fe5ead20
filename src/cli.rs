//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_baseline_adapter::FileBaselineStore;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::analysis::compare_symbols;
use crate::domain::config::EngineConfig;
use crate::domain::config_validation::{
    load_baseline_dir, load_csv_dir, load_engine_config, load_symbols, load_tolerance_config,
    load_tools,
};
use crate::domain::error::SwingscanError;
use crate::domain::regression::{RegressionEngine, RegressionSuite, ToleranceConfig, Tool};
use crate::domain::scanner::UniverseScanner;
use crate::domain::signal_rule::RuleRegistry;
use crate::domain::universe::parse_symbols;
use crate::logging::{LogFormat, init_logging};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

/// Exit code for a regression run with failed comparisons or tool errors.
pub const REGRESSION_FAILED: u8 = 6;

#[derive(Parser, Debug)]
#[command(
    name = "swingscan",
    about = "Swing-trade signal scanner with regression baselines"
)]
pub struct Cli {
    #[arg(long, value_enum, global = true, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan a symbol universe for signals and trade plans
    Scan {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated symbols; defaults to [scan] symbols, then every CSV file
        #[arg(long)]
        symbols: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        max_concurrent: Option<usize>,
    },
    /// Analyze one symbol
    Analyze {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Rank several symbols and pick a winner
    Compare {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbols: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compare tool output against stored baselines
    Regress {
        #[arg(short, long)]
        config: PathBuf,
        /// Overwrite baselines with the current output
        #[arg(long)]
        refresh: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Everything a command needs from the INI file.
#[derive(Debug, Clone)]
pub struct Settings {
    pub engine: EngineConfig,
    pub csv_dir: PathBuf,
    pub symbols: Option<Vec<String>>,
    pub baseline_dir: PathBuf,
    pub tolerance: ToleranceConfig,
    pub tools: Vec<Tool>,
}

impl Settings {
    pub fn from_port(config: &dyn ConfigPort) -> Result<Self, SwingscanError> {
        let engine = load_engine_config(config)?;
        RuleRegistry::standard().select(&engine.signals.rules)?;
        Ok(Self {
            engine,
            csv_dir: load_csv_dir(config)?,
            symbols: load_symbols(config)?,
            baseline_dir: load_baseline_dir(config),
            tolerance: load_tolerance_config(config)?,
            tools: load_tools(config)?,
        })
    }

    pub fn data_port(&self) -> Arc<dyn DataPort> {
        Arc::new(CsvAdapter::new(self.csv_dir.clone()))
    }
}

pub fn load_settings(path: &Path) -> Result<Settings, SwingscanError> {
    tracing::debug!(path = %path.display(), "loading config");
    let adapter = FileConfigAdapter::from_file(path)?;
    Settings::from_port(&adapter)
}

/// `--symbols` wins, then `[scan] symbols`, then everything the data source lists.
pub async fn resolve_symbols(
    symbols_override: Option<&str>,
    settings: &Settings,
    data: &dyn DataPort,
) -> Result<Vec<String>, SwingscanError> {
    if let Some(raw) = symbols_override {
        return Ok(parse_symbols(raw)?);
    }
    if let Some(symbols) = &settings.symbols {
        return Ok(symbols.clone());
    }
    data.list_symbols().await
}

pub fn write_output<T: Serialize + ?Sized>(
    value: &T,
    output: Option<&Path>,
) -> Result<(), SwingscanError> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            fs::write(path, json)?;
            tracing::info!(path = %path.display(), "output written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging(cli.log_format);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            let err = SwingscanError::from(e);
            eprintln!("error: {err}");
            return (&err).into();
        }
    };

    match runtime.block_on(dispatch(cli.command)) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

async fn dispatch(command: Command) -> Result<ExitCode, SwingscanError> {
    match command {
        Command::Scan {
            config,
            symbols,
            output,
            max_concurrent,
        } => run_scan(&config, symbols.as_deref(), output.as_deref(), max_concurrent).await,
        Command::Analyze {
            config,
            symbol,
            output,
        } => run_analyze(&config, &symbol, output.as_deref()).await,
        Command::Compare {
            config,
            symbols,
            output,
        } => run_compare(&config, &symbols, output.as_deref()).await,
        Command::Regress {
            config,
            refresh,
            output,
        } => run_regress(&config, refresh, output.as_deref()).await,
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { config } => run_list_symbols(&config).await,
    }
}

async fn run_scan(
    config_path: &Path,
    symbols_override: Option<&str>,
    output: Option<&Path>,
    max_concurrent: Option<usize>,
) -> Result<ExitCode, SwingscanError> {
    let mut settings = load_settings(config_path)?;
    if let Some(n) = max_concurrent {
        settings.engine.scan.max_concurrent = n;
    }
    let data = settings.data_port();
    let symbols = resolve_symbols(symbols_override, &settings, data.as_ref()).await?;

    let scanner = UniverseScanner::new(data, settings.engine);
    let result = scanner.scan(&symbols).await?;
    write_output(&result, output)?;
    Ok(ExitCode::SUCCESS)
}

async fn run_analyze(
    config_path: &Path,
    symbol: &str,
    output: Option<&Path>,
) -> Result<ExitCode, SwingscanError> {
    let settings = load_settings(config_path)?;
    let symbol = symbol.trim().to_uppercase();
    let scanner = UniverseScanner::new(settings.data_port(), settings.engine);
    let analysis = scanner.analyze(&symbol).await?;
    write_output(&analysis, output)?;
    Ok(ExitCode::SUCCESS)
}

async fn run_compare(
    config_path: &Path,
    symbols: &str,
    output: Option<&Path>,
) -> Result<ExitCode, SwingscanError> {
    let settings = load_settings(config_path)?;
    let symbols = parse_symbols(symbols)?;
    let scanner = UniverseScanner::new(settings.data_port(), settings.engine);
    let scan = scanner.scan(&symbols).await?;
    let comparison = compare_symbols(&scan);
    if let Some(winner) = &comparison.winner {
        tracing::info!(winner = %winner.symbol, score = winner.score, "comparison winner");
    }
    write_output(&comparison, output)?;
    Ok(ExitCode::SUCCESS)
}

async fn run_regress(
    config_path: &Path,
    refresh: bool,
    output: Option<&Path>,
) -> Result<ExitCode, SwingscanError> {
    let settings = load_settings(config_path)?;
    let data = settings.data_port();
    let symbols = resolve_symbols(None, &settings, data.as_ref()).await?;

    let store = Arc::new(FileBaselineStore::new(settings.baseline_dir.clone()));
    let engine = Arc::new(RegressionEngine::new(store, settings.tolerance.clone()));
    let suite = RegressionSuite::new(engine);
    let scanner = UniverseScanner::new(data, settings.engine);

    let report = suite
        .run(&scanner, &symbols, &settings.tools, refresh)
        .await?;
    write_output(&report, output)?;

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(REGRESSION_FAILED))
    }
}

fn run_validate(config_path: &Path) -> Result<ExitCode, SwingscanError> {
    let settings = load_settings(config_path)?;
    eprintln!("Config {} is valid", config_path.display());
    write_output(&settings.engine, None)?;
    Ok(ExitCode::SUCCESS)
}

async fn run_list_symbols(config_path: &Path) -> Result<ExitCode, SwingscanError> {
    let settings = load_settings(config_path)?;
    let symbols = settings.data_port().list_symbols().await?;
    for symbol in &symbols {
        println!("{symbol}");
    }
    eprintln!("{} symbols in {}", symbols.len(), settings.csv_dir.display());
    Ok(ExitCode::SUCCESS)
}

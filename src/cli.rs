//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::console_report;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{PortfolioSettings, Settings, load_settings};
use crate::domain::error::TradeSignalError;
use crate::domain::indicator_service::{BatchReport, IndicatorService};
use crate::domain::position::{PositionSize, PositionSizer};
use crate::domain::signal::Signal;
use crate::domain::signal_generator::{SignalGenerator, top_buy_signals, tradeable_signals};
use crate::domain::summary::IndicatorSummary;
use crate::domain::universe::validate_universe;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::indicator_port::IndicatorPort;

#[derive(Parser, Debug)]
#[command(name = "tradesignal", about = "Technical indicator signals and position sizing")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load CSV price files for the universe into the store
    Import {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Calculate and store indicators
    Indicators {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        /// Last day of the lookback window (default: today)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Show the latest stored indicators
    Summary {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Score signals and list the best buys
    Signals {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        top: Option<usize>,
    },
    /// Size positions for tradeable signals
    Positions {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Indicators, signals and positions in one pass
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Date to calculate and score as of; later bars are ignored (default: today)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show stored data range per symbol
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Import { config, symbol } => run_import(&config, symbol.as_deref()),
        Command::Indicators {
            config,
            symbol,
            as_of,
        } => run_indicators(&config, symbol.as_deref(), as_of),
        Command::Summary { config, symbol } => run_summary(&config, symbol.as_deref()),
        Command::Signals {
            config,
            symbol,
            top,
        } => run_signals(&config, symbol.as_deref(), top),
        Command::Positions { config } => run_positions(&config),
        Command::Run { config, as_of } => run_all(&config, as_of),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, symbol } => run_info(&config, symbol.as_deref()),
    }
}

fn fail(e: &TradeSignalError) -> ExitCode {
    tracing::error!("{e}");
    e.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    tracing::debug!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path).map_err(|e| fail(&e))
}

fn load(path: &Path) -> Result<(FileConfigAdapter, Settings), ExitCode> {
    let config = load_config(path)?;
    let settings = load_settings(&config).map_err(|e| fail(&e))?;
    Ok((config, settings))
}

/// `--symbol` overrides the configured universe.
pub fn resolve_symbols(symbol_override: Option<&str>, settings: &Settings) -> Vec<String> {
    match symbol_override {
        Some(s) if !s.trim().is_empty() => vec![s.trim().to_uppercase()],
        _ => settings.symbols.clone(),
    }
}

pub fn build_sizer(portfolio: &PortfolioSettings) -> PositionSizer {
    PositionSizer::new(portfolio.value, portfolio.strategy, portfolio.risk)
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Opens the configured store and hands it to `f` as both ports.
fn with_store<F>(config: &dyn ConfigPort, f: F) -> ExitCode
where
    F: FnOnce(&dyn DataPort, &dyn IndicatorPort) -> ExitCode,
{
    #[cfg(feature = "sqlite")]
    {
        match open_store(config) {
            Ok(store) => f(&store, &store),
            Err(e) => fail(&e),
        }
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (config, f);
        tracing::error!("sqlite feature is required for this command");
        ExitCode::from(1)
    }
}

#[cfg(feature = "sqlite")]
fn open_store(
    config: &dyn ConfigPort,
) -> Result<crate::adapters::sqlite_adapter::SqliteAdapter, TradeSignalError> {
    let store = crate::adapters::sqlite_adapter::SqliteAdapter::from_config(config)?;
    store.initialize_schema()?;
    Ok(store)
}

fn csv_source(config: &dyn ConfigPort) -> Result<CsvAdapter, TradeSignalError> {
    let dir = config
        .get_string("csv", "dir")
        .ok_or_else(|| TradeSignalError::ConfigMissing {
            section: "csv".into(),
            key: "dir".into(),
        })?;
    Ok(CsvAdapter::new(PathBuf::from(dir)))
}

fn run_import(config_path: &Path, symbol: Option<&str>) -> ExitCode {
    let (config, settings) = match load(config_path) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };
    let source = match csv_source(&config) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let symbols = resolve_symbols(symbol, &settings);

    #[cfg(feature = "sqlite")]
    {
        let store = match open_store(&config) {
            Ok(s) => s,
            Err(e) => return fail(&e),
        };

        let mut imported = 0;
        for symbol in &symbols {
            match source.read_bars(symbol).and_then(|bars| store.insert_bars(&bars)) {
                Ok(count) => {
                    tracing::info!(symbol = %symbol, bars = count, "imported");
                    imported += 1;
                }
                Err(e) => tracing::error!(symbol = %symbol, error = %e, "import failed"),
            }
        }

        println!("Imported {} of {} symbols", imported, symbols.len());
        if imported == 0 {
            return ExitCode::from(5);
        }
        ExitCode::SUCCESS
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (source, symbols);
        tracing::error!("sqlite feature is required for import");
        ExitCode::from(1)
    }
}

/// Indicator stage over the given symbols.
pub fn calculate_indicators(
    data: &dyn DataPort,
    store: &dyn IndicatorPort,
    symbols: &[String],
    as_of: NaiveDate,
    lookback_days: i64,
) -> BatchReport {
    IndicatorService::new(data, store)
        .with_lookback_days(lookback_days)
        .calculate_for_symbols(symbols, as_of)
}

/// Signal stage pinned to `as_of`, so a past run never scores later bars.
pub fn generate_signals_as_of(
    data: &dyn DataPort,
    store: &dyn IndicatorPort,
    symbols: &[String],
    as_of: NaiveDate,
) -> Vec<Signal> {
    SignalGenerator::new(data, store)
        .with_as_of(as_of)
        .generate_signals(symbols)
}

fn batch_exit_code(batch: &BatchReport) -> ExitCode {
    match batch.failed.first() {
        Some((_, e)) if batch.completed.is_empty() => e.into(),
        _ => ExitCode::SUCCESS,
    }
}

fn run_indicators(config_path: &Path, symbol: Option<&str>, as_of: Option<NaiveDate>) -> ExitCode {
    let (config, settings) = match load(config_path) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };
    let symbols = resolve_symbols(symbol, &settings);
    let as_of = as_of.unwrap_or_else(today);

    with_store(&config, |data, store| {
        let batch = calculate_indicators(data, store, &symbols, as_of, settings.lookback_days);
        for report in &batch.completed {
            println!(
                "{}: {} bars, {} values stored",
                report.symbol,
                report.bars,
                report.points_stored()
            );
        }
        for (symbol, e) in &batch.failed {
            println!("{}: failed ({})", symbol, e);
        }
        batch_exit_code(&batch)
    })
}

fn run_summary(config_path: &Path, symbol: Option<&str>) -> ExitCode {
    let (config, settings) = match load(config_path) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };
    let symbols = resolve_symbols(symbol, &settings);

    with_store(&config, |_, store| {
        for symbol in &symbols {
            match IndicatorSummary::load(store, symbol) {
                Ok(Some(summary)) => println!("{}", console_report::format_summary(&summary)),
                Ok(None) => println!("{}: no indicators stored", symbol),
                Err(e) => tracing::error!(symbol = %symbol, error = %e, "failed to load summary"),
            }
        }
        ExitCode::SUCCESS
    })
}

fn print_signals(signals: &[Signal], top: usize) {
    print!("{}", console_report::format_signal_report(signals));
    print!("{}", console_report::format_top_buys(&top_buy_signals(signals, top)));
}

fn run_signals(config_path: &Path, symbol: Option<&str>, top: Option<usize>) -> ExitCode {
    let (config, settings) = match load(config_path) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };
    let symbols = resolve_symbols(symbol, &settings);
    let top = top.unwrap_or(settings.top_signals);

    with_store(&config, |data, store| {
        let signals = SignalGenerator::new(data, store).generate_signals(&symbols);
        print_signals(&signals, top);
        ExitCode::SUCCESS
    })
}

/// Sizes every tradeable signal, best score first. Skipped trades are
/// included with zero shares.
pub fn size_positions(sizer: &PositionSizer, signals: &[Signal]) -> Vec<PositionSize> {
    tradeable_signals(signals)
        .iter()
        .map(|signal| sizer.calculate_position_size(signal))
        .collect()
}

fn print_positions(portfolio: &PortfolioSettings, signals: &[Signal]) {
    let positions = size_positions(&build_sizer(portfolio), signals);
    if positions.is_empty() {
        println!("No tradeable signals at this time.");
        return;
    }
    tracing::info!(
        count = positions.len(),
        strategy = %portfolio.strategy,
        profile = %portfolio.profile,
        "sizing tradeable signals"
    );
    print!("{}", console_report::format_positions(portfolio.value, &positions));
}

fn run_positions(config_path: &Path) -> ExitCode {
    let (config, settings) = match load(config_path) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };

    with_store(&config, |data, store| {
        let signals = SignalGenerator::new(data, store).generate_signals(&settings.symbols);
        print_positions(&settings.portfolio, &signals);
        ExitCode::SUCCESS
    })
}

fn run_all(config_path: &Path, as_of: Option<NaiveDate>) -> ExitCode {
    let (config, settings) = match load(config_path) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };
    let as_of = as_of.unwrap_or_else(today);

    with_store(&config, |data, store| {
        let batch = calculate_indicators(data, store, &settings.symbols, as_of, settings.lookback_days);
        if batch.completed.is_empty() {
            return batch_exit_code(&batch);
        }

        let signals = generate_signals_as_of(data, store, &settings.symbols, as_of);
        print_signals(&signals, settings.top_signals);
        println!();
        print_positions(&settings.portfolio, &signals);
        ExitCode::SUCCESS
    })
}

fn run_validate(config_path: &Path) -> ExitCode {
    let (_, settings) = match load(config_path) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };

    println!("Configuration is valid.");
    println!("  symbols:   {}", settings.symbols.join(", "));
    println!("  lookback:  {} days", settings.lookback_days);
    println!(
        "  portfolio: {} ({}, {})",
        settings.portfolio.value, settings.portfolio.profile, settings.portfolio.strategy
    );
    println!("  top:       {}", settings.top_signals);
    ExitCode::SUCCESS
}

fn run_info(config_path: &Path, symbol: Option<&str>) -> ExitCode {
    let (config, settings) = match load(config_path) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };
    let symbols = resolve_symbols(symbol, &settings);

    with_store(&config, |data, _| {
        for symbol in &symbols {
            match data.get_data_range(symbol) {
                Ok(range) => println!("{}", console_report::format_data_range(symbol, range)),
                Err(e) => tracing::error!(symbol = %symbol, error = %e, "range lookup failed"),
            }
        }
        match validate_universe(data, symbols.clone()) {
            Ok(result) => {
                println!(
                    "{} of {} symbols have enough data to score",
                    result.universe.count(),
                    symbols.len()
                );
                ExitCode::SUCCESS
            }
            Err(e) => fail(&e),
        }
    })
}

//! CLI definition and dispatch.

use chrono::{DateTime, SecondsFormat};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{info, warn};

use crate::adapters::binance_adapter::{BinanceAccountType, BinanceSpotClient, Credentials};
use crate::adapters::csv_adapter::CsvCandleAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::instrument_file_adapter::InstrumentFileAdapter;
use crate::adapters::json_candle_adapter::JsonCandleAdapter;
use crate::adapters::replay_engine::ReplayEngine;
use crate::adapters::terminal_report::TerminalReportAdapter;
use crate::domain::backtest::{BacktestConfig, BacktestRun};
use crate::domain::bar::UnixNanos;
use crate::domain::bootstrap::bootstrap_instruments;
use crate::domain::config_validation::{validate_backtest_config, validate_report_config};
use crate::domain::error::SpotrunnerError;
use crate::domain::identifiers::{InstrumentId, Venue};
use crate::domain::instrument::{Instrument, InstrumentCatalog};
use crate::domain::report::Report;
use crate::domain::strategy::StrategyHandle;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::CandleSource;
use crate::ports::engine_port::BacktestEngine;
use crate::ports::exchange_port::ExchangePort;
use crate::ports::report_port::ReportPort;

pub const API_KEY_ENV: &str = "BINANCE_API_KEY";
pub const API_SECRET_ENV: &str = "BINANCE_API_SECRET";

#[derive(Parser, Debug)]
#[command(name = "spotrunner", about = "Spot market bar-replay backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Candle file, overrides [data] path
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Do not wait for Enter before running
        #[arg(short, long)]
        yes: bool,
    },
    /// Load and list exchange instruments
    Instruments {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        instrument: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest { config, data, yes } => run_backtest(&config, data.as_deref(), yes),
        Command::Instruments { config, instrument } => {
            run_instruments(&config, instrument.as_deref())
        }
        Command::Validate { config } => run_validate(&config),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, SpotrunnerError> {
    info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

/// Exchange connection settings from `[exchange]`.
#[derive(Debug, Clone)]
pub struct ExchangeSettings {
    pub venue: Venue,
    pub account_type: BinanceAccountType,
    pub credentials: Credentials,
    pub testnet: bool,
    pub timeout: Duration,
    pub instruments_file: Option<PathBuf>,
}

/// Credentials fall back to `env` when absent from the file. They are only
/// required when instruments come from the network.
pub fn build_exchange_settings(
    config: &dyn ConfigPort,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ExchangeSettings, SpotrunnerError> {
    let invalid = |key: &str, reason: String| SpotrunnerError::ConfigInvalid {
        section: "exchange".into(),
        key: key.into(),
        reason,
    };

    let venue = match config
        .get_non_empty("exchange", "venue")
        .or_else(|| config.get_non_empty("venue", "name"))
    {
        Some(v) => Venue::new(&v)?,
        None => Venue::new("BINANCE")?,
    };

    let account_type = match config.get_non_empty("exchange", "account_type") {
        Some(v) => v.parse()?,
        None => BinanceAccountType::Spot,
    };

    let timeout = match config.get_non_empty("exchange", "timeout_secs") {
        Some(v) => match v.parse::<u64>() {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => {
                return Err(invalid(
                    "timeout_secs",
                    format!("expected a positive number of seconds, got {:?}", v),
                ));
            }
        },
        None => crate::adapters::binance_adapter::DEFAULT_TIMEOUT,
    };

    let instruments_file = config
        .get_non_empty("exchange", "instruments_file")
        .map(PathBuf::from);

    let api_key = config
        .get_non_empty("exchange", "api_key")
        .or_else(|| env(API_KEY_ENV).filter(|v| !v.trim().is_empty()));
    let api_secret = config
        .get_non_empty("exchange", "api_secret")
        .or_else(|| env(API_SECRET_ENV).filter(|v| !v.trim().is_empty()));

    if instruments_file.is_none() {
        if api_key.is_none() {
            return Err(SpotrunnerError::ConfigMissing {
                section: "exchange".into(),
                key: "api_key".into(),
            });
        }
        if api_secret.is_none() {
            return Err(SpotrunnerError::ConfigMissing {
                section: "exchange".into(),
                key: "api_secret".into(),
            });
        }
    }

    Ok(ExchangeSettings {
        venue,
        account_type,
        credentials: Credentials {
            api_key: api_key.unwrap_or_default(),
            api_secret: api_secret.unwrap_or_default(),
        },
        testnet: config.get_bool("exchange", "testnet", false),
        timeout,
        instruments_file,
    })
}

/// Instruments are loaded for the exchange venue, so it must be the simulated one.
pub fn check_exchange_venue(
    settings: &ExchangeSettings,
    bt_config: &BacktestConfig,
) -> Result<(), SpotrunnerError> {
    if settings.venue != bt_config.venue.venue {
        return Err(SpotrunnerError::ConfigInvalid {
            section: "exchange".into(),
            key: "venue".into(),
            reason: format!(
                "exchange venue {} does not match [venue] name {}",
                settings.venue, bt_config.venue.venue
            ),
        });
    }
    Ok(())
}

/// Where instrument definitions come from.
pub enum InstrumentSource {
    Binance(BinanceSpotClient),
    File(InstrumentFileAdapter),
}

impl InstrumentSource {
    pub fn from_settings(settings: &ExchangeSettings) -> Self {
        match &settings.instruments_file {
            Some(path) => InstrumentSource::File(InstrumentFileAdapter::new(
                path.clone(),
                settings.venue.clone(),
            )),
            None => InstrumentSource::Binance(
                BinanceSpotClient::new(
                    settings.credentials.clone(),
                    settings.account_type,
                    settings.testnet,
                    settings.venue.clone(),
                )
                .with_timeout(settings.timeout),
            ),
        }
    }
}

impl ExchangePort for InstrumentSource {
    async fn connect(&mut self) -> Result<(), SpotrunnerError> {
        match self {
            InstrumentSource::Binance(c) => c.connect().await,
            InstrumentSource::File(f) => f.connect().await,
        }
    }

    async fn load_instruments(&mut self) -> Result<Vec<Instrument>, SpotrunnerError> {
        match self {
            InstrumentSource::Binance(c) => c.load_instruments().await,
            InstrumentSource::File(f) => f.load_instruments().await,
        }
    }

    async fn disconnect(&mut self) -> Result<(), SpotrunnerError> {
        match self {
            InstrumentSource::Binance(c) => c.disconnect().await,
            InstrumentSource::File(f) => f.disconnect().await,
        }
    }
}

/// `.csv` files are read as CSV, everything else as JSON.
pub fn candle_source_for(path: &Path) -> Box<dyn CandleSource> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        Box::new(CsvCandleAdapter::new(path.to_path_buf()))
    } else {
        Box::new(JsonCandleAdapter::new(path.to_path_buf()))
    }
}

fn load_catalog(settings: &ExchangeSettings) -> Result<InstrumentCatalog, SpotrunnerError> {
    let mut source = InstrumentSource::from_settings(settings);
    bootstrap_instruments(&mut source)
}

fn format_ts(ts: UnixNanos) -> String {
    let secs = (ts / 1_000_000_000) as i64;
    let nanos = (ts % 1_000_000_000) as u32;
    DateTime::from_timestamp(secs, nanos)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| ts.to_string())
}

fn wait_for_enter(input: &mut dyn BufRead) -> Result<(), SpotrunnerError> {
    eprint!("Press Enter to continue...");
    io::stderr().flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(())
}

fn run_backtest(config_path: &Path, data: Option<&Path>, yes: bool) -> Result<(), SpotrunnerError> {
    // Stage 1: load and validate config
    let adapter = load_config(config_path)?;
    let bt_config = validate_backtest_config(&adapter, data)?;
    let settings = build_exchange_settings(&adapter, |k| std::env::var(k).ok())?;
    check_exchange_venue(&settings, &bt_config)?;

    // Stage 2: instruments
    let catalog = load_catalog(&settings)?;

    // Stages 3-6: assemble the run
    let mut run = assemble_backtest(&bt_config, &catalog)?;

    if !yes {
        wait_for_enter(&mut io::stdin().lock())?;
    }

    // Stages 7-8: run, report, tear down
    let writer = TerminalReportAdapter::new(io::stdout(), bt_config.display);
    run_and_report(&mut run, &writer)
}

/// Run, write the reports, then reset and dispose.
///
/// Teardown happens even when the run fails. A run error takes precedence
/// over a teardown error.
pub fn run_and_report<E: BacktestEngine>(
    run: &mut BacktestRun<E>,
    output: &dyn ReportPort,
) -> Result<(), SpotrunnerError> {
    let outcome = run.run().and_then(|summary| {
        if let (Some(first), Some(last)) = (summary.first_ts, summary.last_ts) {
            info!(
                from = %format_ts(first),
                to = %format_ts(last),
                "replayed bars"
            );
        }
        output.write_all(&run.reports()?)
    });

    let teardown = run.reset().and_then(|()| run.dispose());

    match (outcome, teardown) {
        (Ok(()), Ok(())) => Ok(()),
        (Ok(()), Err(e)) | (Err(e), Ok(())) => Err(e),
        (Err(run_err), Err(teardown_err)) => {
            warn!(error = %teardown_err, "teardown failed after run error");
            Err(run_err)
        }
    }
}

/// Venue, instruments, data and strategy, ready to run.
pub fn assemble_backtest(
    bt_config: &BacktestConfig,
    catalog: &InstrumentCatalog,
) -> Result<BacktestRun<ReplayEngine>, SpotrunnerError> {
    let mut run = BacktestRun::new(ReplayEngine::new(bt_config.trader_id.clone()));
    run.add_venue(bt_config.venue.clone())?;
    run.add_instruments(catalog, std::slice::from_ref(&bt_config.instrument_id))?;

    let source = candle_source_for(&bt_config.data_path);
    run.load_data(source.as_ref(), &bt_config.bar_type, bt_config.record_policy)?;

    run.attach_strategy(Box::new(StrategyHandle::new(bt_config.strategy.clone())))?;
    Ok(run)
}

/// One row per instrument, sorted by id.
pub fn instruments_report(
    catalog: &InstrumentCatalog,
    only: Option<&InstrumentId>,
) -> Result<Report, SpotrunnerError> {
    let mut report = Report::new(
        "Instruments",
        &[
            "instrument_id",
            "base",
            "quote",
            "price_precision",
            "size_precision",
            "price_increment",
            "size_increment",
            "min_quantity",
            "min_notional",
        ],
    );

    let instruments: Vec<&Instrument> = match only {
        Some(id) => vec![catalog.get(id)?],
        None => catalog
            .ids()
            .into_iter()
            .filter_map(|id| catalog.find(id))
            .collect(),
    };

    for i in instruments {
        report.push_row(vec![
            i.id.to_string(),
            i.base_currency.code.clone(),
            i.quote_currency.code.clone(),
            i.price_precision.to_string(),
            i.size_precision.to_string(),
            i.price_increment.to_string(),
            i.size_increment.to_string(),
            i.min_quantity.map(|q| q.to_string()).unwrap_or_default(),
            i.min_notional.as_ref().map(|m| m.to_string()).unwrap_or_default(),
        ]);
    }
    Ok(report)
}

fn run_instruments(config_path: &Path, instrument: Option<&str>) -> Result<(), SpotrunnerError> {
    let adapter = load_config(config_path)?;
    let settings = build_exchange_settings(&adapter, |k| std::env::var(k).ok())?;
    let display = validate_report_config(&adapter)?;
    let only: Option<InstrumentId> = instrument.map(str::parse::<InstrumentId>).transpose()?;

    let catalog = load_catalog(&settings)?;
    let report = instruments_report(&catalog, only.as_ref())?;

    TerminalReportAdapter::new(io::stdout(), display).write(&report)
}

fn run_validate(config_path: &Path) -> Result<(), SpotrunnerError> {
    let adapter = load_config(config_path)?;
    let bt_config = validate_backtest_config(&adapter, None)?;
    let settings = build_exchange_settings(&adapter, |k| std::env::var(k).ok())?;

    check_exchange_venue(&settings, &bt_config)?;

    eprintln!("Configuration is valid");
    eprintln!("  Trader:     {}", bt_config.trader_id);
    eprintln!(
        "  Venue:      {} ({} / {})",
        bt_config.venue.venue,
        bt_config.venue.oms_type.as_str(),
        bt_config.venue.account_type.as_str()
    );
    eprintln!("  Instrument: {}", bt_config.instrument_id);
    eprintln!("  Bar type:   {}", bt_config.bar_type);
    eprintln!("  Data:       {}", bt_config.data_path.display());
    eprintln!("  Strategy:   {}", bt_config.strategy.strategy_id);
    match &settings.instruments_file {
        Some(path) => eprintln!("  Instruments from {}", path.display()),
        None => eprintln!(
            "  Instruments from Binance {}",
            if settings.testnet { "testnet" } else { "production" }
        ),
    }
    Ok(())
}

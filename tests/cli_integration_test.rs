//! CLI integration tests.
//!
//! Tests cover:
//! - Config validation with real INI files on disk
//! - Exchange settings and credential fallback
//! - Assembling a run from an offline instruments file and a data file
//! - Teardown after successful and failed runs
//! - Exit codes of the backtest, instruments and validate commands

mod common;

use clap::Parser;
use common::*;
use spotrunner::adapters::file_config_adapter::FileConfigAdapter;
use spotrunner::adapters::replay_engine::ReplayEngine;
use spotrunner::adapters::terminal_report::TerminalReportAdapter;
use spotrunner::cli::{self, Cli};
use spotrunner::domain::backtest::{BacktestRun, RunState};
use spotrunner::domain::bar::{Bar, BarType};
use spotrunner::domain::bootstrap::bootstrap_instruments;
use spotrunner::domain::candle::RecordPolicy;
use spotrunner::domain::config_validation::validate_backtest_config;
use spotrunner::domain::error::SpotrunnerError;
use spotrunner::domain::instrument::InstrumentCatalog;
use spotrunner::domain::report::DisplayOptions;
use spotrunner::ports::strategy_port::{Strategy, StrategyContext};
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

const EXCHANGE_INFO: &str = r#"{
  "timezone": "UTC",
  "serverTime": 1700000000000,
  "symbols": [
    {
      "symbol": "ETHUSDT",
      "status": "TRADING",
      "baseAsset": "ETH",
      "quoteAsset": "USDT",
      "filters": [
        {"filterType": "PRICE_FILTER", "minPrice": "0.01000000", "maxPrice": "1000000.00000000", "tickSize": "0.01000000"},
        {"filterType": "LOT_SIZE", "minQty": "0.00010000", "maxQty": "9000.00000000", "stepSize": "0.00010000"},
        {"filterType": "NOTIONAL", "minNotional": "5.00000000"}
      ]
    }
  ]
}"#;

const KLINES_JSON: &str = r#"[
  [1700000000000, "1800.12", "1805.00", "1795.50", "1801.75", 1700000059999, "12.345"],
  [1700000060000, "1801.75", "1803.00", "1800.00", "1802.50", 1700000119999, "8.5"]
]"#;

const KLINES_CSV: &str = "1700000000000,1800.12,1805.00,1795.50,1801.75,0,12.345\n\
                          1700000060000,1801.75,1803.00,1800.00,1802.50,0,8.5\n\
                          1700000120000,1802.50,1804.00,1801.00,1803.25,0,4.25\n";

fn write_temp(content: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    write_temp(content, ".ini")
}

fn ini(instruments_file: &Path, data_file: &Path) -> String {
    format!(
        r#"
[engine]
trader_id = BACKTESTER-001

[exchange]
venue = BINANCE
account_type = SPOT
testnet = true
instruments_file = {}

[venue]
name = BINANCE
oms_type = NETTING
account_type = CASH
base_currency = None
starting_balances = 1000000 USDT, 10 ETH

[data]
path = {}
bar_type = ETHUSDT.BINANCE-1-MINUTE-LAST-EXTERNAL
on_bad_record = fail

[strategy]
instrument_id = ETHUSDT.BINANCE
trade_size = 0.05
fast_ema_period = 10
slow_ema_period = 20
atr_period = 20
trailing_atr_multiple = 3.0
trailing_offset_type = PRICE
trigger_type = LAST

[report]
max_rows = 100
width = 300
"#,
        instruments_file.display(),
        data_file.display()
    )
}

/// Instruments file, JSON data file and INI referencing both.
struct Fixture {
    instruments: tempfile::NamedTempFile,
    data: tempfile::NamedTempFile,
    ini: tempfile::NamedTempFile,
}

impl Fixture {
    fn new() -> Self {
        Self::with_ini_edit(|s| s)
    }

    fn with_ini_edit(edit: impl Fn(String) -> String) -> Self {
        let instruments = write_temp(EXCHANGE_INFO, ".json");
        let data = write_temp(KLINES_JSON, ".json");
        let ini = write_temp_ini(&edit(ini(instruments.path(), data.path())));
        Self {
            instruments,
            data,
            ini,
        }
    }

    fn config(&self) -> FileConfigAdapter {
        FileConfigAdapter::from_file(self.ini.path()).unwrap()
    }

    fn ini_path(&self) -> &str {
        self.ini.path().to_str().unwrap()
    }
}

fn run_cli(args: &[&str]) -> ExitCode {
    let mut argv = vec!["spotrunner"];
    argv.extend_from_slice(args);
    cli::run(Cli::try_parse_from(argv).unwrap())
}

fn same_code(actual: ExitCode, expected: ExitCode) -> bool {
    // ExitCode doesn't implement PartialEq
    format!("{:?}", actual) == format!("{:?}", expected)
}

mod config_loading {
    use super::*;

    #[test]
    fn valid_ini_on_disk() {
        let fixture = Fixture::new();
        let bt = validate_backtest_config(&fixture.config(), None).unwrap();

        assert_eq!(bt.trader_id.as_str(), "BACKTESTER-001");
        assert_eq!(bt.bar_type, bar_type());
        assert_eq!(bt.record_policy, RecordPolicy::FailFast);
        assert_eq!(bt.data_path, fixture.data.path());
        assert_eq!(bt.venue, venue_config());
        assert_eq!(bt.strategy, strategy_config());
    }

    #[test]
    fn exchange_settings_use_instruments_file() {
        let fixture = Fixture::new();
        let settings = cli::build_exchange_settings(&fixture.config(), |_| None).unwrap();

        assert!(settings.testnet);
        assert_eq!(settings.venue, binance());
        assert_eq!(
            settings.instruments_file.as_deref(),
            Some(fixture.instruments.path())
        );
    }

    #[test]
    fn network_source_needs_credentials() {
        let fixture = Fixture::with_ini_edit(|s| {
            s.lines()
                .filter(|l| !l.starts_with("instruments_file"))
                .collect::<Vec<_>>()
                .join("\n")
        });
        let err = cli::build_exchange_settings(&fixture.config(), |_| None).unwrap_err();
        assert!(matches!(
            err,
            SpotrunnerError::ConfigMissing { ref key, .. } if key == "api_key"
        ));

        let settings = cli::build_exchange_settings(&fixture.config(), |k| match k {
            cli::API_KEY_ENV => Some("key".into()),
            cli::API_SECRET_ENV => Some("secret".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(settings.credentials.api_key, "key");
    }
}

mod assembled_run {
    use super::*;

    #[test]
    fn offline_instruments_and_json_data() {
        let fixture = Fixture::new();
        let config = fixture.config();
        let bt = validate_backtest_config(&config, None).unwrap();
        let settings = cli::build_exchange_settings(&config, |_| None).unwrap();

        let mut source = cli::InstrumentSource::from_settings(&settings);
        let catalog = bootstrap_instruments(&mut source).unwrap();
        assert_eq!(catalog.count(), 1);

        let mut run = cli::assemble_backtest(&bt, &catalog).unwrap();
        assert_eq!(run.state(), RunState::StrategyAttached);

        let summary = run.run().unwrap();
        assert_eq!(summary.iterations, 2);
        assert_eq!(summary.last_ts, Some(1_700_000_060_000_000_000));

        let reports = run.reports().unwrap();
        assert_eq!(reports[0].rows.len(), 2);
        run.reset().unwrap();
        run.dispose().unwrap();
    }

    #[test]
    fn csv_data_override() {
        let fixture = Fixture::new();
        let csv = write_temp(KLINES_CSV, ".csv");
        let config = fixture.config();
        let bt = validate_backtest_config(&config, Some(csv.path())).unwrap();
        let settings = cli::build_exchange_settings(&config, |_| None).unwrap();

        let catalog =
            bootstrap_instruments(&mut cli::InstrumentSource::from_settings(&settings)).unwrap();
        let mut run = cli::assemble_backtest(&bt, &catalog).unwrap();
        assert_eq!(run.run().unwrap().iterations, 3);
    }

    #[test]
    fn unknown_instrument_in_catalog() {
        let fixture = Fixture::with_ini_edit(|s| {
            s.replace("ETHUSDT.BINANCE", "SOLUSDT.BINANCE")
        });
        let config = fixture.config();
        let bt = validate_backtest_config(&config, None).unwrap();
        let settings = cli::build_exchange_settings(&config, |_| None).unwrap();
        let catalog =
            bootstrap_instruments(&mut cli::InstrumentSource::from_settings(&settings)).unwrap();

        assert!(matches!(
            cli::assemble_backtest(&bt, &catalog),
            Err(SpotrunnerError::InstrumentNotFound { .. })
        ));
    }

    /// Refuses to start, so the engine run fails.
    struct FailingStrategy {
        bar_type: BarType,
    }

    impl Strategy for FailingStrategy {
        fn id(&self) -> &str {
            "Failing-001"
        }

        fn bar_type(&self) -> &BarType {
            &self.bar_type
        }

        fn on_start(&mut self, _ctx: &StrategyContext<'_>) -> Result<(), SpotrunnerError> {
            Err(SpotrunnerError::Strategy {
                strategy: "Failing-001".into(),
                reason: "warmup data missing".into(),
            })
        }

        fn on_bar(&mut self, _bar: &Bar) {}

        fn on_stop(&mut self) {}

        fn on_reset(&mut self) {}
    }

    #[test]
    fn failed_run_is_still_torn_down() {
        let mut run = BacktestRun::new(ReplayEngine::new("BACKTESTER-001".parse().unwrap()));
        run.add_venue(venue_config()).unwrap();
        let catalog: InstrumentCatalog = [ethusdt()].into_iter().collect();
        run.add_instruments(&catalog, &[ethusdt().id]).unwrap();
        run.load_data(
            &MockCandleSource::new().with_records(vec![record_at(0, "1801.75")]),
            &bar_type(),
            RecordPolicy::FailFast,
        )
        .unwrap();
        run.attach_strategy(Box::new(FailingStrategy {
            bar_type: bar_type(),
        }))
        .unwrap();

        let output = TerminalReportAdapter::new(Vec::new(), DisplayOptions::default());
        let err = cli::run_and_report(&mut run, &output).unwrap_err();

        assert!(matches!(err, SpotrunnerError::Strategy { .. }));
        assert_eq!(run.state(), RunState::Disposed);
        assert!(run.engine().is_disposed());
        assert!(output.into_inner().is_empty());
    }

    #[test]
    fn successful_run_reports_then_disposes() {
        let fixture = Fixture::new();
        let config = fixture.config();
        let bt = validate_backtest_config(&config, None).unwrap();
        let settings = cli::build_exchange_settings(&config, |_| None).unwrap();
        let catalog =
            bootstrap_instruments(&mut cli::InstrumentSource::from_settings(&settings)).unwrap();
        let mut run = cli::assemble_backtest(&bt, &catalog).unwrap();

        let output = TerminalReportAdapter::new(Vec::new(), bt.display);
        cli::run_and_report(&mut run, &output).unwrap();

        assert_eq!(run.state(), RunState::Disposed);
        let text = String::from_utf8(output.into_inner()).unwrap();
        assert!(text.starts_with("Account report: BINANCE\n"));
    }

    #[test]
    fn instruments_report_lists_catalog() {
        let fixture = Fixture::new();
        let settings = cli::build_exchange_settings(&fixture.config(), |_| None).unwrap();
        let catalog =
            bootstrap_instruments(&mut cli::InstrumentSource::from_settings(&settings)).unwrap();

        let report = cli::instruments_report(&catalog, None).unwrap();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0][0], "ETHUSDT.BINANCE");
        assert_eq!(report.rows[0][3], "2");
        assert_eq!(report.rows[0][4], "4");
        assert_eq!(report.rows[0][8], "5.00000000 USDT");
    }
}

mod exit_codes {
    use super::*;

    #[test]
    fn backtest_succeeds() {
        let fixture = Fixture::new();
        let code = run_cli(&["backtest", "--config", fixture.ini_path(), "--yes"]);
        assert!(same_code(code, ExitCode::SUCCESS));
    }

    #[test]
    fn validate_succeeds() {
        let fixture = Fixture::new();
        let code = run_cli(&["validate", "--config", fixture.ini_path()]);
        assert!(same_code(code, ExitCode::SUCCESS));
    }

    #[test]
    fn missing_config_file_is_config_error() {
        let code = run_cli(&["validate", "--config", "/nonexistent/spotrunner.ini"]);
        assert!(same_code(code, ExitCode::from(2)));
    }

    #[test]
    fn invalid_config_is_config_error() {
        let fixture =
            Fixture::with_ini_edit(|s| s.replace("slow_ema_period = 20", "slow_ema_period = 5"));
        let code = run_cli(&["validate", "--config", fixture.ini_path()]);
        assert!(same_code(code, ExitCode::from(2)));
    }

    #[test]
    fn mismatched_exchange_venue_is_config_error() {
        let fixture =
            Fixture::with_ini_edit(|s| s.replace("venue = BINANCE", "venue = BYBIT"));
        let err = cli::check_exchange_venue(
            &cli::build_exchange_settings(&fixture.config(), |_| None).unwrap(),
            &validate_backtest_config(&fixture.config(), None).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SpotrunnerError::ConfigInvalid { ref key, .. } if key == "venue"
        ));

        let code = run_cli(&["backtest", "--config", fixture.ini_path(), "--yes"]);
        assert!(same_code(code, ExitCode::from(2)));

        let code = run_cli(&["validate", "--config", fixture.ini_path()]);
        assert!(same_code(code, ExitCode::from(2)));
    }

    #[test]
    fn unknown_instrument_is_exchange_error() {
        let fixture = Fixture::new();
        let code = run_cli(&[
            "instruments",
            "--config",
            fixture.ini_path(),
            "--instrument",
            "SOLUSDT.BINANCE",
        ]);
        assert!(same_code(code, ExitCode::from(3)));
    }

    #[test]
    fn instruments_lookup_succeeds() {
        let fixture = Fixture::new();
        let code = run_cli(&[
            "instruments",
            "--config",
            fixture.ini_path(),
            "--instrument",
            "ETHUSDT.BINANCE",
        ]);
        assert!(same_code(code, ExitCode::SUCCESS));
    }

    #[test]
    fn missing_data_file_is_data_error() {
        let fixture = Fixture::new();
        let code = run_cli(&[
            "backtest",
            "--config",
            fixture.ini_path(),
            "--data",
            "/nonexistent/klines.json",
            "--yes",
        ]);
        assert!(same_code(code, ExitCode::from(4)));
    }

    #[test]
    fn malformed_record_is_data_error() {
        let fixture = Fixture::new();
        let bad = write_temp("1700000000000,1800.12\n", ".csv");
        let code = run_cli(&[
            "backtest",
            "--config",
            fixture.ini_path(),
            "--data",
            bad.path().to_str().unwrap(),
            "--yes",
        ]);
        assert!(same_code(code, ExitCode::from(4)));
    }
}

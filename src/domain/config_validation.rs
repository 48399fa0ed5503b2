//! Configuration validation.
//!
//! Every section is checked and turned into typed config before any file or
//! network access happens.

use rust_decimal::Decimal;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::domain::backtest::BacktestConfig;
use crate::domain::bar::BarType;
use crate::domain::candle::RecordPolicy;
use crate::domain::error::SpotrunnerError;
use crate::domain::identifiers::{InstrumentId, TraderId, Venue};
use crate::domain::objects::{Currency, Money};
use crate::domain::report::DisplayOptions;
use crate::domain::strategy::{EmaCrossTrailingStopConfig, TrailingOffsetType, TriggerType};
use crate::domain::venue::{AccountType, OmsType, VenueConfig};
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_STRATEGY_ID: &str = "EMACrossTrailingStop-001";

fn missing(section: &str, key: &str) -> SpotrunnerError {
    SpotrunnerError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn invalid(section: &str, key: &str, reason: impl Display) -> SpotrunnerError {
    SpotrunnerError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn require(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, SpotrunnerError> {
    config
        .get_non_empty(section, key)
        .ok_or_else(|| missing(section, key))
}

/// Parse an optional key, falling back to `default` when absent or blank.
fn parse_or<T>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, SpotrunnerError>
where
    T: FromStr,
    T::Err: Display,
{
    match config.get_non_empty(section, key) {
        Some(value) => value.parse().map_err(|e| invalid(section, key, e)),
        None => Ok(default),
    }
}

fn parse_required<T>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<T, SpotrunnerError>
where
    T: FromStr,
    T::Err: Display,
{
    require(config, section, key)?
        .parse()
        .map_err(|e| invalid(section, key, e))
}

/// `none` (any case) means unlimited.
fn parse_limit(
    config: &dyn ConfigPort,
    key: &str,
    default: Option<usize>,
) -> Result<Option<usize>, SpotrunnerError> {
    match config.get_non_empty("report", key) {
        Some(v) if v.eq_ignore_ascii_case("none") => Ok(None),
        Some(v) => match v.parse::<usize>() {
            Ok(0) | Err(_) => Err(invalid(
                "report",
                key,
                format!("expected a positive integer or none, got {:?}", v),
            )),
            Ok(n) => Ok(Some(n)),
        },
        None => Ok(default),
    }
}

pub fn validate_engine_config(config: &dyn ConfigPort) -> Result<TraderId, SpotrunnerError> {
    parse_or(
        config,
        "engine",
        "trader_id",
        TraderId::from_str("BACKTESTER-001")?,
    )
}

/// Comma-separated `AMOUNT CURRENCY` entries, e.g. `1000000 USDT, 10 ETH`.
pub fn parse_starting_balances(value: &str) -> Result<Vec<Money>, SpotrunnerError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Money::from_str(s).map_err(|e| invalid("venue", "starting_balances", e)))
        .collect()
}

pub fn validate_venue_config(config: &dyn ConfigPort) -> Result<VenueConfig, SpotrunnerError> {
    let venue: Venue = parse_or(config, "venue", "name", Venue::new("BINANCE")?)?;
    let oms_type = parse_or(config, "venue", "oms_type", OmsType::Netting)?;
    let account_type = parse_or(config, "venue", "account_type", AccountType::Cash)?;

    let base_currency = match config.get_non_empty("venue", "base_currency") {
        Some(code) if code.eq_ignore_ascii_case("none") => None,
        Some(code) => Some(Currency::from_code(&code)),
        None => None,
    };

    let balances = require(config, "venue", "starting_balances")?;
    let venue_config = VenueConfig {
        venue,
        oms_type,
        account_type,
        base_currency,
        starting_balances: parse_starting_balances(&balances)?,
    };
    venue_config.validate()?;
    Ok(venue_config)
}

/// Data file location, bar type and bad-record policy.
///
/// `path_override` takes precedence over `[data] path`.
pub fn validate_data_config(
    config: &dyn ConfigPort,
    path_override: Option<&Path>,
) -> Result<(PathBuf, BarType, RecordPolicy), SpotrunnerError> {
    let path = match path_override {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(require(config, "data", "path")?),
    };
    let bar_type: BarType = parse_required(config, "data", "bar_type")?;

    let policy = match config.get_non_empty("data", "on_bad_record") {
        None => RecordPolicy::default(),
        Some(v) => match v.to_lowercase().as_str() {
            "fail" => RecordPolicy::FailFast,
            "skip" => RecordPolicy::SkipAndWarn,
            _ => {
                return Err(invalid(
                    "data",
                    "on_bad_record",
                    format!("expected fail or skip, got {:?}", v),
                ));
            }
        },
    };
    Ok((path, bar_type, policy))
}

/// `default_bar_type` is used when `[strategy] bar_type` is absent.
pub fn validate_strategy_config(
    config: &dyn ConfigPort,
    default_bar_type: Option<&BarType>,
) -> Result<EmaCrossTrailingStopConfig, SpotrunnerError> {
    let instrument_id: InstrumentId = parse_required(config, "strategy", "instrument_id")?;
    let bar_type = match (config.get_non_empty("strategy", "bar_type"), default_bar_type) {
        (Some(v), _) => v.parse().map_err(|e| invalid("strategy", "bar_type", e))?,
        (None, Some(bt)) => bt.clone(),
        (None, None) => return Err(missing("strategy", "bar_type")),
    };

    let strategy = EmaCrossTrailingStopConfig {
        strategy_id: config
            .get_non_empty("strategy", "strategy_id")
            .unwrap_or_else(|| DEFAULT_STRATEGY_ID.to_string()),
        instrument_id,
        bar_type,
        trade_size: parse_required::<Decimal>(config, "strategy", "trade_size")?,
        fast_ema_period: parse_or(config, "strategy", "fast_ema_period", 10)?,
        slow_ema_period: parse_or(config, "strategy", "slow_ema_period", 20)?,
        atr_period: parse_or(config, "strategy", "atr_period", 20)?,
        trailing_atr_multiple: parse_or(config, "strategy", "trailing_atr_multiple", 3.0)?,
        trailing_offset_type: parse_or(
            config,
            "strategy",
            "trailing_offset_type",
            TrailingOffsetType::Price,
        )?,
        trigger_type: parse_or(config, "strategy", "trigger_type", TriggerType::Last)?,
    };
    strategy.validate()?;
    Ok(strategy)
}

pub fn validate_report_config(config: &dyn ConfigPort) -> Result<DisplayOptions, SpotrunnerError> {
    let defaults = DisplayOptions::default();
    let width: usize = parse_or(config, "report", "width", defaults.width)?;
    if width == 0 {
        return Err(invalid("report", "width", "width must be positive"));
    }
    Ok(DisplayOptions {
        max_rows: parse_limit(config, "max_rows", defaults.max_rows)?,
        max_columns: parse_limit(config, "max_columns", defaults.max_columns)?,
        width,
    })
}

/// Validate every section a backtest needs and assemble them.
pub fn validate_backtest_config(
    config: &dyn ConfigPort,
    data_override: Option<&Path>,
) -> Result<BacktestConfig, SpotrunnerError> {
    let trader_id = validate_engine_config(config)?;
    let venue = validate_venue_config(config)?;
    let (data_path, bar_type, record_policy) = validate_data_config(config, data_override)?;
    let strategy = validate_strategy_config(config, Some(&bar_type))?;
    let display = validate_report_config(config)?;

    if strategy.instrument_id.venue != venue.venue {
        return Err(invalid(
            "strategy",
            "instrument_id",
            format!(
                "instrument venue {} does not match [venue] name {}",
                strategy.instrument_id.venue, venue.venue
            ),
        ));
    }
    if bar_type.instrument_id != strategy.instrument_id {
        return Err(invalid(
            "data",
            "bar_type",
            "bar type instrument does not match [strategy] instrument_id",
        ));
    }

    Ok(BacktestConfig {
        trader_id,
        venue,
        instrument_id: strategy.instrument_id.clone(),
        bar_type,
        data_path,
        record_policy,
        strategy,
        display,
    })
}

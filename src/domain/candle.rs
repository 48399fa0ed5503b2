//! Candle record parsing.
//!
//! A raw record is an ordered list of text fields
//! `[open_time_ms, open, high, low, close, <unused>, volume, ...]`.
//! Parsing is pure: the same record and instrument always give the same bar.

use tracing::warn;

use crate::domain::bar::{Bar, BarType, UnixNanos};
use crate::domain::error::{CandleError, SpotrunnerError};
use crate::domain::instrument::Instrument;
use crate::domain::objects::{Price, Quantity};

/// Milliseconds to nanoseconds.
pub const TIMESTAMP_SCALE: u64 = 1_000_000;

/// Fields read from each record; anything past `VOLUME_FIELD` is ignored.
pub const MIN_FIELDS: usize = 7;

const TIMESTAMP_FIELD: usize = 0;
const OPEN_FIELD: usize = 1;
const HIGH_FIELD: usize = 2;
const LOW_FIELD: usize = 3;
const CLOSE_FIELD: usize = 4;
const VOLUME_FIELD: usize = 6;

/// One raw candle line from a data file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandleRecord {
    pub fields: Vec<String>,
}

impl CandleRecord {
    pub fn new<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

/// What to do with a record that fails to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordPolicy {
    /// Abort the whole load at the first bad record.
    #[default]
    FailFast,
    /// Drop the record, log a warning, keep going.
    SkipAndWarn,
}

fn parse_timestamp(text: &str) -> Result<UnixNanos, CandleError> {
    let millis: u64 = text
        .trim()
        .parse()
        .map_err(|_| CandleError::InvalidTimestamp {
            value: text.to_string(),
        })?;
    millis
        .checked_mul(TIMESTAMP_SCALE)
        .ok_or(CandleError::TimestampOverflow { millis })
}

fn parse_float(field: &'static str, text: &str) -> Result<f64, CandleError> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CandleError::InvalidNumber {
            field,
            value: text.to_string(),
        })
}

fn parse_price(field: &'static str, text: &str, precision: u8) -> Result<Price, CandleError> {
    Price::new(parse_float(field, text)?, precision)
        .map_err(|source| CandleError::Value { field, source })
}

fn parse_quantity(field: &'static str, text: &str, precision: u8) -> Result<Quantity, CandleError> {
    Quantity::new(parse_float(field, text)?, precision)
        .map_err(|source| CandleError::Value { field, source })
}

/// Parse one record into a bar using the instrument's price and size precision.
pub fn parse_candle_record(
    record: &CandleRecord,
    bar_type: &BarType,
    instrument: &Instrument,
) -> Result<Bar, CandleError> {
    let fields = &record.fields;
    if fields.len() < MIN_FIELDS {
        return Err(CandleError::TooFewFields {
            found: fields.len(),
            required: MIN_FIELDS,
        });
    }

    let ts = parse_timestamp(&fields[TIMESTAMP_FIELD])?;
    let price_precision = instrument.price_precision;

    Ok(Bar {
        bar_type: bar_type.clone(),
        open: parse_price("open", &fields[OPEN_FIELD], price_precision)?,
        high: parse_price("high", &fields[HIGH_FIELD], price_precision)?,
        low: parse_price("low", &fields[LOW_FIELD], price_precision)?,
        close: parse_price("close", &fields[CLOSE_FIELD], price_precision)?,
        volume: parse_quantity("volume", &fields[VOLUME_FIELD], instrument.size_precision)?,
        ts_event: ts,
        ts_init: ts,
    })
}

/// Parse every record, preserving input order.
pub fn load_bars(
    records: &[CandleRecord],
    bar_type: &BarType,
    instrument: &Instrument,
    policy: RecordPolicy,
) -> Result<Vec<Bar>, SpotrunnerError> {
    let mut bars = Vec::with_capacity(records.len());
    let mut skipped = 0usize;

    for (index, record) in records.iter().enumerate() {
        match parse_candle_record(record, bar_type, instrument) {
            Ok(bar) => bars.push(bar),
            Err(source) => match policy {
                RecordPolicy::FailFast => {
                    return Err(SpotrunnerError::Candle { index, source });
                }
                RecordPolicy::SkipAndWarn => {
                    warn!(index, error = %source, "skipping candle record");
                    skipped += 1;
                }
            },
        }
    }

    if skipped > 0 {
        warn!(skipped, parsed = bars.len(), "candle records skipped");
    }
    Ok(bars)
}

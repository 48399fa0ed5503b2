//! Bar types and OHLCV bars.
//!
//! A bar type is written `INSTRUMENT_ID-STEP-AGGREGATION-PRICE_TYPE-SOURCE`,
//! for example `ETHUSDT.BINANCE-1-MINUTE-LAST-EXTERNAL`.

use std::fmt;
use std::str::FromStr;

use crate::domain::error::IdentifierError;
use crate::domain::identifiers::InstrumentId;
use crate::domain::objects::{Price, Quantity};

/// Nanoseconds since the Unix epoch.
pub type UnixNanos = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarAggregation {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl BarAggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            BarAggregation::Second => "SECOND",
            BarAggregation::Minute => "MINUTE",
            BarAggregation::Hour => "HOUR",
            BarAggregation::Day => "DAY",
            BarAggregation::Week => "WEEK",
            BarAggregation::Month => "MONTH",
        }
    }
}

impl FromStr for BarAggregation {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SECOND" => Ok(BarAggregation::Second),
            "MINUTE" => Ok(BarAggregation::Minute),
            "HOUR" => Ok(BarAggregation::Hour),
            "DAY" => Ok(BarAggregation::Day),
            "WEEK" => Ok(BarAggregation::Week),
            "MONTH" => Ok(BarAggregation::Month),
            _ => Err(IdentifierError::new(
                "bar aggregation",
                s,
                "expected SECOND, MINUTE, HOUR, DAY, WEEK or MONTH",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceType {
    Bid,
    Ask,
    Mid,
    Last,
}

impl PriceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceType::Bid => "BID",
            PriceType::Ask => "ASK",
            PriceType::Mid => "MID",
            PriceType::Last => "LAST",
        }
    }
}

impl FromStr for PriceType {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BID" => Ok(PriceType::Bid),
            "ASK" => Ok(PriceType::Ask),
            "MID" => Ok(PriceType::Mid),
            "LAST" => Ok(PriceType::Last),
            _ => Err(IdentifierError::new(
                "price type",
                s,
                "expected BID, ASK, MID or LAST",
            )),
        }
    }
}

/// Whether bars were built outside the engine (loaded data) or by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregationSource {
    External,
    Internal,
}

impl AggregationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationSource::External => "EXTERNAL",
            AggregationSource::Internal => "INTERNAL",
        }
    }
}

impl FromStr for AggregationSource {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "EXTERNAL" => Ok(AggregationSource::External),
            "INTERNAL" => Ok(AggregationSource::Internal),
            _ => Err(IdentifierError::new(
                "aggregation source",
                s,
                "expected EXTERNAL or INTERNAL",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BarSpecification {
    pub step: u32,
    pub aggregation: BarAggregation,
    pub price_type: PriceType,
}

impl fmt::Display for BarSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}",
            self.step,
            self.aggregation.as_str(),
            self.price_type.as_str()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BarType {
    pub instrument_id: InstrumentId,
    pub spec: BarSpecification,
    pub source: AggregationSource,
}

impl fmt::Display for BarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}",
            self.instrument_id,
            self.spec,
            self.source.as_str()
        )
    }
}

impl FromStr for BarType {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // Instrument ids may contain '-', so split from the right.
        let parts: Vec<&str> = s.rsplitn(5, '-').collect();
        let &[source, price_type, aggregation, step, instrument_id] = &parts[..] else {
            return Err(IdentifierError::new(
                "bar type",
                s,
                "expected INSTRUMENT_ID-STEP-AGGREGATION-PRICE_TYPE-SOURCE",
            ));
        };

        let step: u32 = step
            .parse()
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| IdentifierError::new("bar type", s, "step must be a positive integer"))?;

        Ok(BarType {
            instrument_id: instrument_id.parse()?,
            spec: BarSpecification {
                step,
                aggregation: aggregation.parse()?,
                price_type: price_type.parse()?,
            },
            source: source.parse()?,
        })
    }
}

/// One OHLCV candle.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub bar_type: BarType,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: Quantity,
    pub ts_event: UnixNanos,
    pub ts_init: UnixNanos,
}

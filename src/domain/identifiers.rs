//! String identifiers for venues, instruments and traders.

use std::fmt;
use std::str::FromStr;

use crate::domain::error::IdentifierError;

fn check_token(kind: &'static str, input: &str, value: &str) -> Result<(), IdentifierError> {
    if value.is_empty() {
        return Err(IdentifierError::new(kind, input, "empty component"));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(IdentifierError::new(kind, input, "contains whitespace"));
    }
    Ok(())
}

/// A trading venue, e.g. `BINANCE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Venue(String);

impl Venue {
    pub fn new(name: &str) -> Result<Self, IdentifierError> {
        let name = name.trim();
        check_token("venue", name, name)?;
        Ok(Self(name.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Venue {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// The venue-local ticker, e.g. `ETHUSDT`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(value: &str) -> Result<Self, IdentifierError> {
        let value = value.trim();
        check_token("symbol", value, value)?;
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `SYMBOL.VENUE`, e.g. `ETHUSDT.BINANCE`.
///
/// The split happens on the last `.` so symbols may themselves contain dots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrumentId {
    pub symbol: Symbol,
    pub venue: Venue,
}

impl InstrumentId {
    pub fn new(symbol: Symbol, venue: Venue) -> Self {
        Self { symbol, venue }
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.symbol, self.venue)
    }
}

impl FromStr for InstrumentId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (symbol, venue) = s
            .rsplit_once('.')
            .ok_or_else(|| IdentifierError::new("instrument id", s, "expected SYMBOL.VENUE"))?;
        check_token("instrument id", s, symbol)?;
        check_token("instrument id", s, venue)?;
        Ok(Self {
            symbol: Symbol::new(symbol)?,
            venue: Venue::new(venue)?,
        })
    }
}

/// Identifies the trader that owns a backtest run, e.g. `BACKTESTER-001`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraderId(String);

impl TraderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TraderId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, tag) = s
            .split_once('-')
            .ok_or_else(|| IdentifierError::new("trader id", s, "expected NAME-TAG"))?;
        check_token("trader id", s, name)?;
        check_token("trader id", s, tag)?;
        Ok(Self(s.to_string()))
    }
}

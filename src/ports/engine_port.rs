//! Backtest engine port trait.

use std::time::Duration;

use crate::domain::bar::{Bar, UnixNanos};
use crate::domain::error::SpotrunnerError;
use crate::domain::identifiers::Venue;
use crate::domain::instrument::Instrument;
use crate::domain::report::Report;
use crate::domain::venue::VenueConfig;
use crate::ports::strategy_port::Strategy;

/// Outcome of one `run` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub iterations: usize,
    pub first_ts: Option<UnixNanos>,
    pub last_ts: Option<UnixNanos>,
    pub elapsed: Duration,
}

/// The simulation engine a backtest is driven through.
pub trait BacktestEngine {
    fn add_venue(&mut self, config: VenueConfig) -> Result<(), SpotrunnerError>;

    /// The instrument's venue must already be registered.
    fn add_instrument(&mut self, instrument: Instrument) -> Result<(), SpotrunnerError>;

    /// Bulk-add bars for registered instruments.
    fn add_data(&mut self, bars: Vec<Bar>) -> Result<(), SpotrunnerError>;

    fn add_strategy(&mut self, strategy: Box<dyn Strategy>) -> Result<(), SpotrunnerError>;

    /// Process all data from first to last bar before returning.
    fn run(&mut self) -> Result<RunSummary, SpotrunnerError>;

    fn account_report(&self, venue: &Venue) -> Result<Report, SpotrunnerError>;

    fn fills_report(&self) -> Result<Report, SpotrunnerError>;

    fn positions_report(&self) -> Result<Report, SpotrunnerError>;

    /// Clear run state so data and strategies can be added again.
    fn reset(&mut self) -> Result<(), SpotrunnerError>;

    /// Release everything; the engine is unusable afterwards.
    fn dispose(&mut self);
}

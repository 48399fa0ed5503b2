//! In-process bar replay engine.
//!
//! Keeps the venue ledgers and instrument registry, merges bar data into a
//! single time-ordered feed, and replays it to the attached strategies.
//! It does not match orders, so fills and positions reports are always
//! empty and balances stay at their starting values.

use std::collections::HashMap;
use std::time::Instant;

use tracing::info;

use crate::domain::account::CashAccount;
use crate::domain::bar::Bar;
use crate::domain::error::SpotrunnerError;
use crate::domain::identifiers::{InstrumentId, TraderId, Venue};
use crate::domain::instrument::Instrument;
use crate::domain::report::Report;
use crate::domain::venue::VenueConfig;
use crate::ports::engine_port::{BacktestEngine, RunSummary};
use crate::ports::strategy_port::{Strategy, StrategyContext};

pub const ACCOUNT_COLUMNS: &[&str] = &[
    "currency",
    "total",
    "locked",
    "free",
    "account_type",
    "base_currency",
];

pub const FILLS_COLUMNS: &[&str] = &[
    "client_order_id",
    "instrument_id",
    "side",
    "quantity",
    "avg_px",
    "ts_last",
];

pub const POSITIONS_COLUMNS: &[&str] = &[
    "position_id",
    "instrument_id",
    "side",
    "quantity",
    "avg_px_open",
    "realized_pnl",
];

struct SimulatedVenue {
    config: VenueConfig,
    account: CashAccount,
}

pub struct ReplayEngine {
    trader_id: TraderId,
    venues: HashMap<Venue, SimulatedVenue>,
    instruments: HashMap<InstrumentId, Instrument>,
    data: Vec<Bar>,
    strategies: Vec<Box<dyn Strategy>>,
    last_run: Option<RunSummary>,
    disposed: bool,
}

impl ReplayEngine {
    pub fn new(trader_id: TraderId) -> Self {
        info!(trader_id = %trader_id, "engine created");
        Self {
            trader_id,
            venues: HashMap::new(),
            instruments: HashMap::new(),
            data: Vec::new(),
            strategies: Vec::new(),
            last_run: None,
            disposed: false,
        }
    }

    pub fn trader_id(&self) -> &TraderId {
        &self.trader_id
    }

    pub fn bar_count(&self) -> usize {
        self.data.len()
    }

    pub fn strategy_count(&self) -> usize {
        self.strategies.len()
    }

    pub fn last_run(&self) -> Option<&RunSummary> {
        self.last_run.as_ref()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn ensure_live(&self) -> Result<(), SpotrunnerError> {
        if self.disposed {
            return Err(SpotrunnerError::EngineDisposed);
        }
        Ok(())
    }

    fn venue(&self, venue: &Venue) -> Result<&SimulatedVenue, SpotrunnerError> {
        self.venues
            .get(venue)
            .ok_or_else(|| SpotrunnerError::UnknownVenue {
                venue: venue.to_string(),
            })
    }
}

impl BacktestEngine for ReplayEngine {
    fn add_venue(&mut self, config: VenueConfig) -> Result<(), SpotrunnerError> {
        self.ensure_live()?;
        if self.venues.contains_key(&config.venue) {
            return Err(SpotrunnerError::DuplicateVenue {
                venue: config.venue.to_string(),
            });
        }
        config.validate()?;

        let account = CashAccount::new(&config);
        self.venues
            .insert(config.venue.clone(), SimulatedVenue { config, account });
        Ok(())
    }

    fn add_instrument(&mut self, instrument: Instrument) -> Result<(), SpotrunnerError> {
        self.ensure_live()?;
        self.venue(&instrument.id.venue)?;
        self.instruments.insert(instrument.id.clone(), instrument);
        Ok(())
    }

    fn add_data(&mut self, bars: Vec<Bar>) -> Result<(), SpotrunnerError> {
        self.ensure_live()?;
        if let Some(bar) = bars
            .iter()
            .find(|b| !self.instruments.contains_key(&b.bar_type.instrument_id))
        {
            return Err(SpotrunnerError::UnknownInstrument {
                id: bar.bar_type.instrument_id.to_string(),
            });
        }

        self.data.extend(bars);
        self.data.sort_by_key(|b| b.ts_init);
        Ok(())
    }

    fn add_strategy(&mut self, strategy: Box<dyn Strategy>) -> Result<(), SpotrunnerError> {
        self.ensure_live()?;
        self.strategies.push(strategy);
        Ok(())
    }

    fn run(&mut self) -> Result<RunSummary, SpotrunnerError> {
        self.ensure_live()?;
        let started = Instant::now();

        let ctx = StrategyContext {
            instruments: &self.instruments,
        };
        for strategy in self.strategies.iter_mut() {
            strategy.on_start(&ctx)?;
        }

        for bar in &self.data {
            for strategy in self.strategies.iter_mut() {
                if strategy.bar_type() == &bar.bar_type {
                    strategy.on_bar(bar);
                }
            }
        }

        for strategy in self.strategies.iter_mut() {
            strategy.on_stop();
        }

        let summary = RunSummary {
            iterations: self.data.len(),
            first_ts: self.data.first().map(|b| b.ts_init),
            last_ts: self.data.last().map(|b| b.ts_init),
            elapsed: started.elapsed(),
        };
        info!(
            trader_id = %self.trader_id,
            iterations = summary.iterations,
            strategies = self.strategies.len(),
            "replay finished"
        );
        self.last_run = Some(summary.clone());
        Ok(summary)
    }

    fn account_report(&self, venue: &Venue) -> Result<Report, SpotrunnerError> {
        self.ensure_live()?;
        let sim = self.venue(venue)?;

        let base_currency = sim
            .account
            .base_currency
            .as_ref()
            .map(|c| c.code.clone())
            .unwrap_or_else(|| "None".to_string());

        let mut report = Report::new(format!("Account report: {}", venue), ACCOUNT_COLUMNS);
        for balance in sim.account.balances() {
            report.push_row(vec![
                balance.currency.code.clone(),
                balance.total.to_string(),
                balance.locked.to_string(),
                balance.free().to_string(),
                sim.config.account_type.as_str().to_string(),
                base_currency.clone(),
            ]);
        }
        Ok(report)
    }

    fn fills_report(&self) -> Result<Report, SpotrunnerError> {
        self.ensure_live()?;
        Ok(Report::new("Order fills", FILLS_COLUMNS))
    }

    fn positions_report(&self) -> Result<Report, SpotrunnerError> {
        self.ensure_live()?;
        Ok(Report::new("Positions", POSITIONS_COLUMNS))
    }

    fn reset(&mut self) -> Result<(), SpotrunnerError> {
        self.ensure_live()?;
        for strategy in self.strategies.iter_mut() {
            strategy.on_reset();
        }
        self.strategies.clear();
        self.data.clear();
        self.last_run = None;
        for sim in self.venues.values_mut() {
            sim.account.restore_starting_balances();
        }
        Ok(())
    }

    fn dispose(&mut self) {
        self.strategies.clear();
        self.data.clear();
        self.instruments.clear();
        self.venues.clear();
        self.last_run = None;
        self.disposed = true;
    }
}

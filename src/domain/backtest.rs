//! Backtest orchestration: the ordered assembly and execution of one run.
//!
//! [`BacktestRun`] drives a [`BacktestEngine`] through
//! venue -> instruments -> data -> strategy -> run -> reports -> reset -> dispose.
//! Calls made out of order fail with `InvalidTransition` and leave the
//! run untouched.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::domain::bar::BarType;
use crate::domain::candle::{RecordPolicy, load_bars};
use crate::domain::error::SpotrunnerError;
use crate::domain::identifiers::{InstrumentId, TraderId, Venue};
use crate::domain::instrument::{Instrument, InstrumentCatalog};
use crate::domain::report::{DisplayOptions, Report};
use crate::domain::strategy::EmaCrossTrailingStopConfig;
use crate::domain::venue::VenueConfig;
use crate::ports::data_port::CandleSource;
use crate::ports::engine_port::{BacktestEngine, RunSummary};
use crate::ports::strategy_port::Strategy;

/// Everything needed to assemble one backtest.
#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub trader_id: TraderId,
    pub venue: VenueConfig,
    pub instrument_id: InstrumentId,
    pub bar_type: BarType,
    pub data_path: PathBuf,
    pub record_policy: RecordPolicy,
    pub strategy: EmaCrossTrailingStopConfig,
    pub display: DisplayOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Unconfigured,
    VenueAdded,
    InstrumentsAdded,
    DataLoaded,
    StrategyAttached,
    Running,
    Completed,
    Reset,
    Disposed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Unconfigured => "unconfigured",
            RunState::VenueAdded => "venue added",
            RunState::InstrumentsAdded => "instruments added",
            RunState::DataLoaded => "data loaded",
            RunState::StrategyAttached => "strategy attached",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Reset => "reset",
            RunState::Disposed => "disposed",
        }
    }
}

pub struct BacktestRun<E: BacktestEngine> {
    engine: E,
    state: RunState,
    venue: Option<Venue>,
    instruments: Vec<Instrument>,
    last_summary: Option<RunSummary>,
}

impl<E: BacktestEngine> BacktestRun<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            state: RunState::Unconfigured,
            venue: None,
            instruments: Vec::new(),
            last_summary: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn last_summary(&self) -> Option<&RunSummary> {
        self.last_summary.as_ref()
    }

    fn require(&self, allowed: &[RunState], action: &'static str) -> Result<(), SpotrunnerError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SpotrunnerError::InvalidTransition {
                from: self.state.as_str(),
                to: action,
            })
        }
    }

    pub fn add_venue(&mut self, config: VenueConfig) -> Result<(), SpotrunnerError> {
        self.require(&[RunState::Unconfigured], "add venue")?;
        config.validate()?;

        let venue = config.venue.clone();
        info!(
            venue = %venue,
            oms_type = config.oms_type.as_str(),
            account_type = config.account_type.as_str(),
            balances = config.starting_balances.len(),
            "adding venue"
        );
        self.engine.add_venue(config)?;
        self.venue = Some(venue);
        self.state = RunState::VenueAdded;
        Ok(())
    }

    /// Resolve each id in the catalog and register the definition with the engine.
    pub fn add_instruments(
        &mut self,
        catalog: &InstrumentCatalog,
        ids: &[InstrumentId],
    ) -> Result<usize, SpotrunnerError> {
        self.require(&[RunState::VenueAdded], "add instruments")?;

        let resolved = ids
            .iter()
            .map(|id| catalog.get(id).cloned())
            .collect::<Result<Vec<_>, _>>()?;

        for instrument in &resolved {
            info!(instrument = %instrument.id, "adding instrument");
            self.engine.add_instrument(instrument.clone())?;
        }
        let count = resolved.len();
        self.instruments = resolved;
        self.state = RunState::InstrumentsAdded;
        Ok(count)
    }

    /// Read every record, parse them all, and hand the bars to the engine in one batch.
    pub fn load_data(
        &mut self,
        source: &dyn CandleSource,
        bar_type: &BarType,
        policy: RecordPolicy,
    ) -> Result<usize, SpotrunnerError> {
        self.require(&[RunState::InstrumentsAdded, RunState::Reset], "load data")?;

        let instrument = self
            .instruments
            .iter()
            .find(|i| i.id == bar_type.instrument_id)
            .ok_or_else(|| SpotrunnerError::UnknownInstrument {
                id: bar_type.instrument_id.to_string(),
            })?;

        let records = source.read_records()?;
        info!(source = %source.describe(), records = records.len(), "read candle records");

        let bars = load_bars(&records, bar_type, instrument, policy)?;
        let count = bars.len();
        if count == 0 {
            warn!(bar_type = %bar_type, "no bars loaded");
        }
        self.engine.add_data(bars)?;
        info!(bars = count, bar_type = %bar_type, "bars added");

        self.state = RunState::DataLoaded;
        Ok(count)
    }

    pub fn attach_strategy(&mut self, strategy: Box<dyn Strategy>) -> Result<(), SpotrunnerError> {
        self.require(&[RunState::DataLoaded], "attach strategy")?;
        info!(strategy = strategy.id(), bar_type = %strategy.bar_type(), "attaching strategy");
        self.engine.add_strategy(strategy)?;
        self.state = RunState::StrategyAttached;
        Ok(())
    }

    /// Run synchronously from the first bar to the last.
    ///
    /// A failed run still ends in `Completed` so the engine can be reset or disposed.
    pub fn run(&mut self) -> Result<RunSummary, SpotrunnerError> {
        self.require(&[RunState::StrategyAttached], "run")?;
        self.state = RunState::Running;

        let result = self.engine.run();
        self.state = RunState::Completed;

        let summary = result?;
        info!(
            iterations = summary.iterations,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "backtest run completed"
        );
        self.last_summary = Some(summary.clone());
        Ok(summary)
    }

    /// Account report for the venue, then the fills and positions reports.
    pub fn reports(&self) -> Result<Vec<Report>, SpotrunnerError> {
        self.require(&[RunState::Completed], "produce reports")?;
        let venue = self.venue.as_ref().ok_or_else(|| SpotrunnerError::InvalidTransition {
            from: self.state.as_str(),
            to: "produce reports",
        })?;
        Ok(vec![
            self.engine.account_report(venue)?,
            self.engine.fills_report()?,
            self.engine.positions_report()?,
        ])
    }

    pub fn reset(&mut self) -> Result<(), SpotrunnerError> {
        self.require(&[RunState::Completed], "reset")?;
        self.engine.reset()?;
        self.last_summary = None;
        self.state = RunState::Reset;
        info!("engine reset");
        Ok(())
    }

    pub fn dispose(&mut self) -> Result<(), SpotrunnerError> {
        self.require(&[RunState::Completed, RunState::Reset], "dispose")?;
        self.engine.dispose();
        self.instruments.clear();
        self.state = RunState::Disposed;
        info!("engine disposed");
        Ok(())
    }
}

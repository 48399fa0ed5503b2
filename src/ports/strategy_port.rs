//! Strategy port: what an engine calls on an attached strategy.

use std::collections::HashMap;

use crate::domain::bar::{Bar, BarType};
use crate::domain::error::SpotrunnerError;
use crate::domain::identifiers::InstrumentId;
use crate::domain::instrument::Instrument;

/// Engine state visible to a strategy when it starts.
pub struct StrategyContext<'a> {
    pub instruments: &'a HashMap<InstrumentId, Instrument>,
}

pub trait Strategy {
    fn id(&self) -> &str;

    /// The bar stream this strategy subscribes to.
    fn bar_type(&self) -> &BarType;

    fn on_start(&mut self, ctx: &StrategyContext<'_>) -> Result<(), SpotrunnerError>;

    fn on_bar(&mut self, bar: &Bar);

    fn on_stop(&mut self);

    /// Return to the state right after construction.
    fn on_reset(&mut self);
}

//! Instrument definitions and the catalog they are looked up in.

use std::collections::HashMap;

use crate::domain::error::SpotrunnerError;
use crate::domain::identifiers::{InstrumentId, Symbol};
use crate::domain::objects::{Currency, Money, Price, Quantity};

/// A spot currency pair as defined by the exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    pub id: InstrumentId,
    pub raw_symbol: Symbol,
    pub base_currency: Currency,
    pub quote_currency: Currency,
    pub price_precision: u8,
    pub size_precision: u8,
    pub price_increment: Price,
    pub size_increment: Quantity,
    pub min_quantity: Option<Quantity>,
    pub max_quantity: Option<Quantity>,
    pub min_notional: Option<Money>,
}

/// All instruments loaded from one exchange, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct InstrumentCatalog {
    instruments: HashMap<InstrumentId, Instrument>,
}

impl InstrumentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later definitions replace earlier ones with the same id.
    pub fn add(&mut self, instrument: Instrument) {
        self.instruments.insert(instrument.id.clone(), instrument);
    }

    pub fn find(&self, id: &InstrumentId) -> Option<&Instrument> {
        self.instruments.get(id)
    }

    /// Like [`find`](Self::find) but a miss is an error.
    pub fn get(&self, id: &InstrumentId) -> Result<&Instrument, SpotrunnerError> {
        self.find(id).ok_or_else(|| SpotrunnerError::InstrumentNotFound {
            id: id.to_string(),
            count: self.count(),
        })
    }

    pub fn get_str(&self, id: &str) -> Result<&Instrument, SpotrunnerError> {
        let id: InstrumentId = id.parse()?;
        self.get(&id)
    }

    pub fn count(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Instrument ids in sorted order.
    pub fn ids(&self) -> Vec<&InstrumentId> {
        let mut ids: Vec<_> = self.instruments.keys().collect();
        ids.sort();
        ids
    }
}

impl FromIterator<Instrument> for InstrumentCatalog {
    fn from_iter<T: IntoIterator<Item = Instrument>>(iter: T) -> Self {
        let mut catalog = Self::new();
        for instrument in iter {
            catalog.add(instrument);
        }
        catalog
    }
}

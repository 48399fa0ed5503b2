//! Offline instrument source: a saved `exchangeInfo` response on disk.

use std::fs;
use std::path::PathBuf;

use tracing::info;

use crate::adapters::binance_adapter::parse_exchange_info;
use crate::domain::error::SpotrunnerError;
use crate::domain::identifiers::Venue;
use crate::domain::instrument::Instrument;
use crate::ports::exchange_port::ExchangePort;

pub struct InstrumentFileAdapter {
    path: PathBuf,
    venue: Venue,
    body: Option<String>,
}

impl InstrumentFileAdapter {
    pub fn new(path: PathBuf, venue: Venue) -> Self {
        Self {
            path,
            venue,
            body: None,
        }
    }
}

impl ExchangePort for InstrumentFileAdapter {
    async fn connect(&mut self) -> Result<(), SpotrunnerError> {
        let body = fs::read_to_string(&self.path).map_err(|e| SpotrunnerError::Exchange {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;
        info!(path = %self.path.display(), "reading instruments from file");
        self.body = Some(body);
        Ok(())
    }

    async fn load_instruments(&mut self) -> Result<Vec<Instrument>, SpotrunnerError> {
        let body = self.body.as_deref().ok_or(SpotrunnerError::NotConnected)?;
        parse_exchange_info(body, &self.venue)
    }

    async fn disconnect(&mut self) -> Result<(), SpotrunnerError> {
        self.body = None;
        Ok(())
    }
}

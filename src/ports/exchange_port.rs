//! Exchange instrument-loading port trait.

use crate::domain::error::SpotrunnerError;
use crate::domain::instrument::Instrument;

/// A connection to an exchange that can list its instruments.
///
/// Callers pair every successful `connect` with a `disconnect`.
#[allow(async_fn_in_trait)]
pub trait ExchangePort {
    async fn connect(&mut self) -> Result<(), SpotrunnerError>;

    async fn load_instruments(&mut self) -> Result<Vec<Instrument>, SpotrunnerError>;

    async fn disconnect(&mut self) -> Result<(), SpotrunnerError>;
}

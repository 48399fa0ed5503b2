//! Candle data source port trait.

use crate::domain::candle::CandleRecord;
use crate::domain::error::SpotrunnerError;

pub trait CandleSource {
    /// Read every record, in file order.
    fn read_records(&self) -> Result<Vec<CandleRecord>, SpotrunnerError>;

    /// Human-readable origin for log lines, usually a path.
    fn describe(&self) -> String;
}

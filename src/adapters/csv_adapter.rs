//! Headerless CSV candle file adapter.
//!
//! Each row is one kline in exchange order, e.g. the files Binance publishes
//! for bulk download.

use crate::domain::candle::CandleRecord;
use crate::domain::error::SpotrunnerError;
use crate::ports::data_port::CandleSource;
use std::fs::File;
use std::path::PathBuf;

pub struct CsvCandleAdapter {
    path: PathBuf,
}

impl CsvCandleAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn source_error(&self, reason: impl ToString) -> SpotrunnerError {
        SpotrunnerError::DataSource {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl CandleSource for CsvCandleAdapter {
    fn read_records(&self) -> Result<Vec<CandleRecord>, SpotrunnerError> {
        let file = File::open(&self.path).map_err(|e| self.source_error(e))?;

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut records = Vec::new();
        for result in rdr.records() {
            let row = result.map_err(|e| self.source_error(format!("CSV parse error: {}", e)))?;
            records.push(CandleRecord::new(row.iter()));
        }
        Ok(records)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

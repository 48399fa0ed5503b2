//! JSON candle file adapter.
//!
//! The file holds one JSON array of klines, each itself an array, as returned
//! by the exchange's kline endpoint. String elements are taken verbatim;
//! numbers and other scalars use their JSON text.

use crate::domain::candle::CandleRecord;
use crate::domain::error::SpotrunnerError;
use crate::ports::data_port::CandleSource;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

pub struct JsonCandleAdapter {
    path: PathBuf,
}

impl JsonCandleAdapter {
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

fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Split a JSON document into raw candle records.
pub fn parse_candle_json(content: &str) -> Result<Vec<CandleRecord>, String> {
    let rows: Vec<Vec<Value>> =
        serde_json::from_str(content).map_err(|e| format!("invalid kline JSON: {}", e))?;
    Ok(rows
        .iter()
        .map(|row| CandleRecord::new(row.iter().map(field_text)))
        .collect())
}

impl CandleSource for JsonCandleAdapter {
    fn read_records(&self) -> Result<Vec<CandleRecord>, SpotrunnerError> {
        let content = fs::read_to_string(&self.path).map_err(|e| self.source_error(e))?;
        parse_candle_json(&content).map_err(|reason| self.source_error(reason))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use rust_decimal::Decimal;
use spotrunner::domain::bar::BarType;
use spotrunner::domain::candle::CandleRecord;
use spotrunner::domain::error::SpotrunnerError;
use spotrunner::domain::identifiers::{Symbol, Venue};
use spotrunner::domain::instrument::Instrument;
use spotrunner::domain::objects::{Currency, Price, Quantity};
use spotrunner::domain::strategy::{
    EmaCrossTrailingStopConfig, TrailingOffsetType, TriggerType,
};
use spotrunner::domain::venue::{AccountType, OmsType, VenueConfig};
use spotrunner::ports::data_port::CandleSource;
use spotrunner::ports::exchange_port::ExchangePort;

pub const BAR_TYPE: &str = "ETHUSDT.BINANCE-1-MINUTE-LAST-EXTERNAL";

/// The reference kline used throughout the tests.
pub const REFERENCE_RECORD: [&str; 7] = [
    "1700000000000",
    "1800.12",
    "1805.00",
    "1795.50",
    "1801.75",
    "0",
    "12.345",
];

pub fn binance() -> Venue {
    Venue::new("BINANCE").unwrap()
}

pub fn instrument(symbol: &str, base: &str, price_precision: u8, size_precision: u8) -> Instrument {
    let tick = 10f64.powi(-(price_precision as i32));
    let step = 10f64.powi(-(size_precision as i32));
    Instrument {
        id: format!("{}.BINANCE", symbol).parse().unwrap(),
        raw_symbol: Symbol::new(symbol).unwrap(),
        base_currency: Currency::from_code(base),
        quote_currency: Currency::from_code("USDT"),
        price_precision,
        size_precision,
        price_increment: Price::new(tick, price_precision).unwrap(),
        size_increment: Quantity::new(step, size_precision).unwrap(),
        min_quantity: None,
        max_quantity: None,
        min_notional: None,
    }
}

pub fn ethusdt() -> Instrument {
    instrument("ETHUSDT", "ETH", 2, 3)
}

pub fn bar_type() -> BarType {
    BAR_TYPE.parse().unwrap()
}

pub fn venue_config() -> VenueConfig {
    VenueConfig {
        venue: binance(),
        oms_type: OmsType::Netting,
        account_type: AccountType::Cash,
        base_currency: None,
        starting_balances: vec![
            "1000000 USDT".parse().unwrap(),
            "10 ETH".parse().unwrap(),
        ],
    }
}

pub fn strategy_config() -> EmaCrossTrailingStopConfig {
    EmaCrossTrailingStopConfig {
        strategy_id: "EMACrossTrailingStop-001".into(),
        instrument_id: "ETHUSDT.BINANCE".parse().unwrap(),
        bar_type: bar_type(),
        trade_size: Decimal::new(5, 2),
        fast_ema_period: 10,
        slow_ema_period: 20,
        atr_period: 20,
        trailing_atr_multiple: 3.0,
        trailing_offset_type: TrailingOffsetType::Price,
        trigger_type: TriggerType::Last,
    }
}

/// A kline one minute after `minute` minutes past the reference time.
pub fn record_at(minute: u64, close: &str) -> CandleRecord {
    let ts = 1_700_000_000_000u64 + minute * 60_000;
    CandleRecord::new([
        ts.to_string().as_str(),
        "1800.12",
        "1805.00",
        "1795.50",
        close,
        "0",
        "12.345",
    ])
}

pub struct MockCandleSource {
    pub records: Vec<CandleRecord>,
    pub error: Option<String>,
}

impl MockCandleSource {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            error: None,
        }
    }

    pub fn with_records(mut self, records: Vec<CandleRecord>) -> Self {
        self.records = records;
        self
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.error = Some(reason.to_string());
        self
    }
}

impl CandleSource for MockCandleSource {
    fn read_records(&self) -> Result<Vec<CandleRecord>, SpotrunnerError> {
        if let Some(reason) = &self.error {
            return Err(SpotrunnerError::DataSource {
                path: self.describe(),
                reason: reason.clone(),
            });
        }
        Ok(self.records.clone())
    }

    fn describe(&self) -> String {
        "mock".into()
    }
}

/// Exchange double that counts connections and can fail on load.
pub struct MockExchange {
    pub instruments: Vec<Instrument>,
    pub load_error: Option<String>,
    pub connected: Rc<Cell<bool>>,
    pub disconnects: Rc<Cell<usize>>,
}

impl MockExchange {
    pub fn new() -> Self {
        Self {
            instruments: Vec::new(),
            load_error: None,
            connected: Rc::new(Cell::new(false)),
            disconnects: Rc::new(Cell::new(0)),
        }
    }

    pub fn with_instruments(mut self, instruments: Vec<Instrument>) -> Self {
        self.instruments = instruments;
        self
    }

    pub fn with_load_error(mut self, reason: &str) -> Self {
        self.load_error = Some(reason.to_string());
        self
    }
}

impl ExchangePort for MockExchange {
    async fn connect(&mut self) -> Result<(), SpotrunnerError> {
        self.connected.set(true);
        Ok(())
    }

    async fn load_instruments(&mut self) -> Result<Vec<Instrument>, SpotrunnerError> {
        if !self.connected.get() {
            return Err(SpotrunnerError::NotConnected);
        }
        if let Some(reason) = &self.load_error {
            return Err(SpotrunnerError::ExchangeResponse {
                reason: reason.clone(),
            });
        }
        Ok(self.instruments.clone())
    }

    async fn disconnect(&mut self) -> Result<(), SpotrunnerError> {
        self.connected.set(false);
        self.disconnects.set(self.disconnects.get() + 1);
        Ok(())
    }
}

//! Binance spot REST adapter for loading instrument definitions.
//!
//! Only the public `ping` and `exchangeInfo` endpoints are used. Margin
//! accounts share the spot API.

use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::domain::error::SpotrunnerError;
use crate::domain::identifiers::{InstrumentId, Symbol, Venue};
use crate::domain::instrument::Instrument;
use crate::domain::objects::{Currency, Money, Price, Quantity, precision_from_increment};
use crate::ports::exchange_port::ExchangePort;

pub const PRODUCTION_URL: &str = "https://api.binance.com";
pub const TESTNET_URL: &str = "https://testnet.binance.vision";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const API_KEY_HEADER: &str = "X-MBX-APIKEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinanceAccountType {
    Spot,
    Margin,
}

impl FromStr for BinanceAccountType {
    type Err = SpotrunnerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SPOT" => Ok(BinanceAccountType::Spot),
            "MARGIN" => Ok(BinanceAccountType::Margin),
            _ => Err(SpotrunnerError::ConfigInvalid {
                section: "exchange".into(),
                key: "account_type".into(),
                reason: format!("expected SPOT or MARGIN, got {:?}", s),
            }),
        }
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    pub fn is_complete(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.api_secret.trim().is_empty()
    }
}

// Keep secrets out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"***")
            .field("api_secret", &"***")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    symbol: String,
    #[serde(default)]
    status: String,
    base_asset: String,
    quote_asset: String,
    #[serde(default)]
    filters: Vec<SymbolFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "filterType")]
enum SymbolFilter {
    #[serde(rename = "PRICE_FILTER", rename_all = "camelCase")]
    Price { tick_size: String },
    #[serde(rename = "LOT_SIZE", rename_all = "camelCase")]
    LotSize {
        min_qty: String,
        max_qty: String,
        step_size: String,
    },
    #[serde(rename = "NOTIONAL", rename_all = "camelCase")]
    Notional { min_notional: String },
    #[serde(rename = "MIN_NOTIONAL", rename_all = "camelCase")]
    MinNotional { min_notional: String },
    #[serde(other)]
    Other,
}

fn decimal(field: &str, text: &str) -> Result<Decimal, String> {
    Decimal::from_str(text.trim()).map_err(|e| format!("invalid {} {:?}: {}", field, text, e))
}

/// `None` when the value is zero, which Binance uses for "no limit".
fn optional_quantity(field: &str, text: &str, precision: u8) -> Result<Option<Quantity>, String> {
    let value = decimal(field, text)?;
    if value.is_zero() {
        return Ok(None);
    }
    Quantity::from_decimal(value, precision)
        .map(Some)
        .map_err(|e| e.to_string())
}

fn build_instrument(info: &SymbolInfo, venue: &Venue) -> Result<Instrument, String> {
    let mut tick_size = None;
    let mut lot = None;
    let mut min_notional = None;
    for filter in &info.filters {
        match filter {
            SymbolFilter::Price { tick_size: t } => tick_size = Some(t.as_str()),
            SymbolFilter::LotSize {
                min_qty,
                max_qty,
                step_size,
            } => lot = Some((min_qty.as_str(), max_qty.as_str(), step_size.as_str())),
            SymbolFilter::Notional { min_notional: n }
            | SymbolFilter::MinNotional { min_notional: n } => {
                min_notional.get_or_insert(n.as_str());
            }
            SymbolFilter::Other => {}
        }
    }

    let tick_size = tick_size.ok_or("missing PRICE_FILTER")?;
    let (min_qty, max_qty, step_size) = lot.ok_or("missing LOT_SIZE")?;

    let price_precision = precision_from_increment(tick_size)
        .ok_or_else(|| format!("unusable tick size {:?}", tick_size))?;
    let size_precision = precision_from_increment(step_size)
        .ok_or_else(|| format!("unusable step size {:?}", step_size))?;

    let quote_currency = Currency::from_code(&info.quote_asset);
    let min_notional = match min_notional {
        Some(n) => {
            let amount = decimal("minNotional", n)?;
            Some(Money::new(amount, quote_currency.clone()).map_err(|e| e.to_string())?)
        }
        None => None,
    };

    let symbol = Symbol::new(&info.symbol).map_err(|e| e.to_string())?;
    Ok(Instrument {
        id: InstrumentId::new(symbol.clone(), venue.clone()),
        raw_symbol: symbol,
        base_currency: Currency::from_code(&info.base_asset),
        quote_currency,
        price_precision,
        size_precision,
        price_increment: Price::from_decimal(decimal("tickSize", tick_size)?, price_precision)
            .map_err(|e| e.to_string())?,
        size_increment: Quantity::from_decimal(decimal("stepSize", step_size)?, size_precision)
            .map_err(|e| e.to_string())?,
        min_quantity: optional_quantity("minQty", min_qty, size_precision)?,
        max_quantity: optional_quantity("maxQty", max_qty, size_precision)?,
        min_notional,
    })
}

/// Turn an `exchangeInfo` body into instruments on `venue`.
///
/// Symbols that cannot be turned into an instrument are skipped with a warning.
pub fn parse_exchange_info(body: &str, venue: &Venue) -> Result<Vec<Instrument>, SpotrunnerError> {
    let info: ExchangeInfo =
        serde_json::from_str(body).map_err(|e| SpotrunnerError::ExchangeResponse {
            reason: format!("exchangeInfo: {}", e),
        })?;

    let mut instruments = Vec::with_capacity(info.symbols.len());
    for symbol in &info.symbols {
        match build_instrument(symbol, venue) {
            Ok(instrument) => instruments.push(instrument),
            Err(reason) => {
                warn!(symbol = %symbol.symbol, status = %symbol.status, %reason, "skipping symbol")
            }
        }
    }
    Ok(instruments)
}

/// HTTP client for the Binance spot API.
pub struct BinanceSpotClient {
    credentials: Credentials,
    account_type: BinanceAccountType,
    base_url: String,
    venue: Venue,
    timeout: Duration,
    client: Option<reqwest::Client>,
}

impl BinanceSpotClient {
    pub fn new(
        credentials: Credentials,
        account_type: BinanceAccountType,
        testnet: bool,
        venue: Venue,
    ) -> Self {
        let base_url = if testnet { TESTNET_URL } else { PRODUCTION_URL };
        Self {
            credentials,
            account_type,
            base_url: base_url.to_string(),
            venue,
            timeout: DEFAULT_TIMEOUT,
            client: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    async fn get(&self, client: &reqwest::Client, path: &str) -> Result<String, SpotrunnerError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "GET");

        let response = client
            .get(&url)
            .header(API_KEY_HEADER, &self.credentials.api_key)
            .send()
            .await
            .map_err(|e| SpotrunnerError::Exchange {
                reason: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| SpotrunnerError::Exchange {
            reason: e.to_string(),
        })?;
        if !status.is_success() {
            return Err(SpotrunnerError::ExchangeStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

impl ExchangePort for BinanceSpotClient {
    async fn connect(&mut self) -> Result<(), SpotrunnerError> {
        if !self.credentials.is_complete() {
            return Err(SpotrunnerError::Exchange {
                reason: "API key and secret are required".into(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| SpotrunnerError::Exchange {
                reason: e.to_string(),
            })?;

        self.get(&client, "/api/v3/ping").await?;
        info!(
            base_url = %self.base_url,
            account_type = ?self.account_type,
            "connected to Binance"
        );
        self.client = Some(client);
        Ok(())
    }

    async fn load_instruments(&mut self) -> Result<Vec<Instrument>, SpotrunnerError> {
        let client = self.client.as_ref().ok_or(SpotrunnerError::NotConnected)?;
        let body = self.get(client, "/api/v3/exchangeInfo").await?;
        parse_exchange_info(&body, &self.venue)
    }

    async fn disconnect(&mut self) -> Result<(), SpotrunnerError> {
        if self.client.take().is_some() {
            debug!("disconnected from Binance");
        }
        Ok(())
    }
}

//! Strategy configuration and the handle attached to the engine.

use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::info;

use crate::domain::bar::{Bar, BarType, UnixNanos};
use crate::domain::error::{IdentifierError, SpotrunnerError};
use crate::domain::identifiers::InstrumentId;
use crate::domain::objects::Price;
use crate::ports::strategy_port::{Strategy, StrategyContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailingOffsetType {
    Price,
    BasisPoints,
    Ticks,
}

impl FromStr for TrailingOffsetType {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PRICE" => Ok(TrailingOffsetType::Price),
            "BASIS_POINTS" => Ok(TrailingOffsetType::BasisPoints),
            "TICKS" => Ok(TrailingOffsetType::Ticks),
            _ => Err(IdentifierError::new(
                "trailing offset type",
                s,
                "expected PRICE, BASIS_POINTS or TICKS",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerType {
    Default,
    Last,
    BidAsk,
    Mid,
    Mark,
}

impl FromStr for TriggerType {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DEFAULT" => Ok(TriggerType::Default),
            "LAST" => Ok(TriggerType::Last),
            "BID_ASK" => Ok(TriggerType::BidAsk),
            "MID" => Ok(TriggerType::Mid),
            "MARK" => Ok(TriggerType::Mark),
            _ => Err(IdentifierError::new(
                "trigger type",
                s,
                "expected DEFAULT, LAST, BID_ASK, MID or MARK",
            )),
        }
    }
}

/// Parameters of an EMA-cross strategy with an ATR trailing stop.
#[derive(Debug, Clone, PartialEq)]
pub struct EmaCrossTrailingStopConfig {
    pub strategy_id: String,
    pub instrument_id: InstrumentId,
    pub bar_type: BarType,
    pub trade_size: Decimal,
    pub fast_ema_period: usize,
    pub slow_ema_period: usize,
    pub atr_period: usize,
    pub trailing_atr_multiple: f64,
    pub trailing_offset_type: TrailingOffsetType,
    pub trigger_type: TriggerType,
}

impl EmaCrossTrailingStopConfig {
    pub fn validate(&self) -> Result<(), SpotrunnerError> {
        let invalid = |key: &str, reason: &str| SpotrunnerError::ConfigInvalid {
            section: "strategy".into(),
            key: key.into(),
            reason: reason.into(),
        };

        if self.bar_type.instrument_id != self.instrument_id {
            return Err(invalid(
                "bar_type",
                "bar type instrument does not match instrument_id",
            ));
        }
        if self.trade_size <= Decimal::ZERO {
            return Err(invalid("trade_size", "trade_size must be positive"));
        }
        if self.fast_ema_period == 0 {
            return Err(invalid("fast_ema_period", "period must be positive"));
        }
        if self.slow_ema_period <= self.fast_ema_period {
            return Err(invalid(
                "slow_ema_period",
                "slow_ema_period must be greater than fast_ema_period",
            ));
        }
        if self.atr_period == 0 {
            return Err(invalid("atr_period", "period must be positive"));
        }
        if !(self.trailing_atr_multiple > 0.0 && self.trailing_atr_multiple.is_finite()) {
            return Err(invalid(
                "trailing_atr_multiple",
                "trailing_atr_multiple must be positive",
            ));
        }
        Ok(())
    }
}

/// A configured strategy as registered with the engine.
///
/// Order decisions belong to the engine side; the handle verifies its
/// instrument at start and records the bar stream delivered to it.
#[derive(Debug, Clone)]
pub struct StrategyHandle {
    config: EmaCrossTrailingStopConfig,
    bars_received: usize,
    first_ts: Option<UnixNanos>,
    last_ts: Option<UnixNanos>,
    last_close: Option<Price>,
}

impl StrategyHandle {
    pub fn new(config: EmaCrossTrailingStopConfig) -> Self {
        Self {
            config,
            bars_received: 0,
            first_ts: None,
            last_ts: None,
            last_close: None,
        }
    }

    pub fn config(&self) -> &EmaCrossTrailingStopConfig {
        &self.config
    }

    pub fn bars_received(&self) -> usize {
        self.bars_received
    }

    pub fn last_close(&self) -> Option<Price> {
        self.last_close
    }

    /// Bars needed before the slowest indicator has a value.
    pub fn warmup_bars(&self) -> usize {
        self.config.slow_ema_period.max(self.config.atr_period)
    }
}

impl Strategy for StrategyHandle {
    fn id(&self) -> &str {
        &self.config.strategy_id
    }

    fn bar_type(&self) -> &BarType {
        &self.config.bar_type
    }

    fn on_start(&mut self, ctx: &StrategyContext<'_>) -> Result<(), SpotrunnerError> {
        if !ctx.instruments.contains_key(&self.config.instrument_id) {
            return Err(SpotrunnerError::Strategy {
                strategy: self.config.strategy_id.clone(),
                reason: format!(
                    "could not find instrument {}",
                    self.config.instrument_id
                ),
            });
        }
        info!(
            strategy = %self.config.strategy_id,
            bar_type = %self.config.bar_type,
            "strategy started"
        );
        Ok(())
    }

    fn on_bar(&mut self, bar: &Bar) {
        self.bars_received += 1;
        self.first_ts.get_or_insert(bar.ts_init);
        self.last_ts = Some(bar.ts_init);
        self.last_close = Some(bar.close);
    }

    fn on_stop(&mut self) {
        if self.bars_received < self.warmup_bars() {
            info!(
                strategy = %self.config.strategy_id,
                bars = self.bars_received,
                warmup = self.warmup_bars(),
                "strategy stopped before indicators warmed up"
            );
        }
        info!(
            strategy = %self.config.strategy_id,
            bars = self.bars_received,
            first_ts = ?self.first_ts,
            last_ts = ?self.last_ts,
            "strategy stopped"
        );
    }

    fn on_reset(&mut self) {
        self.bars_received = 0;
        self.first_ts = None;
        self.last_ts = None;
        self.last_close = None;
    }
}

//! Concrete adapter implementations for ports.

pub mod binance_adapter;
pub mod csv_adapter;
pub mod file_config_adapter;
pub mod instrument_file_adapter;
pub mod json_candle_adapter;
pub mod replay_engine;
pub mod terminal_report;

//! Port traits.

pub mod config_port;
pub mod data_port;
pub mod engine_port;
pub mod exchange_port;
pub mod report_port;
pub mod strategy_port;

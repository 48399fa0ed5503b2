//! Core domain types and logic.

pub mod account;
pub mod backtest;
pub mod bar;
pub mod bootstrap;
pub mod candle;
pub mod config_validation;
pub mod error;
pub mod identifiers;
pub mod instrument;
pub mod objects;
pub mod report;
pub mod strategy;
pub mod venue;

//! Core domain types and logic.

pub mod analysis;
pub mod config;
pub mod config_validation;
pub mod error;
pub mod indicator;
pub mod ohlcv;
pub mod regression;
pub mod scanner;
pub mod signal;
pub mod signal_rule;
pub mod trade_plan;
pub mod universe;

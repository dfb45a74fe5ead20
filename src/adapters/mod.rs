//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod file_baseline_adapter;
pub mod file_config_adapter;
pub mod memory_baseline_adapter;

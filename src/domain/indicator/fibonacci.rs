//! Rolling Fibonacci retracement levels.
//!
//! Over the trailing `window` bars: swing high = max(high), swing low = min(low),
//! level(r) = high - (high - low) * r for r in 23.6%, 38.2%, 50%, 61.8%, 78.6%.
//! Warmup: first (window-1) rows are undefined.

use crate::domain::indicator::{Column, Values};
use crate::domain::ohlcv::Bar;

pub const DEFAULT_WINDOW: usize = 50;
pub const DEFAULT_TOLERANCE: f64 = 0.02;

pub const RETRACEMENTS: [(Column, f64); 5] = [
    (Column::Fib236, 0.236),
    (Column::Fib382, 0.382),
    (Column::Fib500, 0.5),
    (Column::Fib618, 0.618),
    (Column::Fib786, 0.786),
];

/// Retracement levels for one swing, highest first.
pub fn retracement_levels(high: f64, low: f64) -> Vec<(Column, f64)> {
    let range = high - low;
    let mut levels = Vec::with_capacity(RETRACEMENTS.len() + 2);
    levels.push((Column::FibHigh, high));
    for (column, ratio) in RETRACEMENTS {
        levels.push((column, high - range * ratio));
    }
    levels.push((Column::FibLow, low));
    levels
}

/// One column per level in `Column::FIB_LEVELS` order.
pub fn calculate_fibonacci(bars: &[Bar], window: usize) -> Vec<(Column, Values)> {
    let mut columns: Vec<(Column, Values)> = Column::FIB_LEVELS
        .iter()
        .map(|&c| (c, vec![None; bars.len()]))
        .collect();
    if window == 0 || bars.len() < window {
        return columns;
    }

    for end in (window - 1)..bars.len() {
        let slice = &bars[end + 1 - window..=end];
        let high = slice.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let low = slice.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        for (slot, (_, level)) in columns.iter_mut().zip(retracement_levels(high, low)) {
            slot.1[end] = Some(level);
        }
    }

    columns
}

//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Warmup: the line is defined from slow-1, signal and histogram from slow-1 + signal-1.

use crate::domain::indicator::{Values, calculate_ema, ema_values};
use crate::domain::ohlcv::Bar;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone)]
pub struct MacdColumns {
    pub line: Values,
    pub signal: Values,
    pub histogram: Values,
}

pub fn calculate_macd(bars: &[Bar], fast: usize, slow: usize, signal_period: usize) -> MacdColumns {
    let len = bars.len();
    let mut columns = MacdColumns {
        line: vec![None; len],
        signal: vec![None; len],
        histogram: vec![None; len],
    };
    if fast == 0 || slow == 0 || signal_period == 0 {
        return columns;
    }

    let ema_fast = calculate_ema(bars, fast);
    let ema_slow = calculate_ema(bars, slow);

    for i in 0..len {
        if let (Some(f), Some(s)) = (ema_fast[i], ema_slow[i]) {
            columns.line[i] = Some(f - s);
        }
    }

    // Once both EMAs are seeded the line stays defined, so the tail is contiguous.
    let Some(start) = columns.line.iter().position(Option::is_some) else {
        return columns;
    };
    let defined: Vec<f64> = columns.line[start..].iter().flatten().copied().collect();
    for (offset, value) in ema_values(&defined, signal_period).into_iter().enumerate() {
        columns.signal[start + offset] = value;
    }

    for i in start..len {
        if let (Some(line), Some(signal)) = (columns.line[i], columns.signal[i]) {
            columns.histogram[i] = Some(line - signal);
        }
    }

    columns
}

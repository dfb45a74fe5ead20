//! RSI (Relative Strength Index) indicator.
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of the changes over the first n bars
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100 (50 when there is no movement at all)
//!
//! The first bar has no prior close and contributes a zero change, so the
//! first defined value sits at index n-1.

use crate::domain::indicator::Values;
use crate::domain::ohlcv::Bar;

pub const DEFAULT_PERIOD: usize = 14;

pub fn calculate_rsi(bars: &[Bar], period: usize) -> Values {
    let mut values = vec![None; bars.len()];
    if period == 0 || bars.len() < period {
        return values;
    }

    let changes: Vec<f64> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| if i == 0 { 0.0 } else { bar.close - bars[i - 1].close })
        .collect();

    let n = period as f64;
    let mut avg_gain = changes[..period].iter().map(|&c| gain(c)).sum::<f64>() / n;
    let mut avg_loss = changes[..period].iter().map(|&c| loss(c)).sum::<f64>() / n;
    values[period - 1] = Some(rsi_from(avg_gain, avg_loss));

    for i in period..bars.len() {
        avg_gain = (avg_gain * (n - 1.0) + gain(changes[i])) / n;
        avg_loss = (avg_loss * (n - 1.0) + loss(changes[i])) / n;
        values[i] = Some(rsi_from(avg_gain, avg_loss));
    }

    values
}

fn gain(change: f64) -> f64 {
    change.max(0.0)
}

fn loss(change: f64) -> f64 {
    (-change).max(0.0)
}

fn rsi_from(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 { 50.0 } else { 100.0 }
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

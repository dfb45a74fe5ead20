//! Exponential Moving Average.
//!
//! k = 2/(n+1), seed with the first SMA, then EMA[i] = x[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) values are undefined.

use crate::domain::indicator::Values;
use crate::domain::ohlcv::Bar;

/// EMA of closing prices.
pub fn calculate_ema(bars: &[Bar], period: usize) -> Values {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    ema_values(&closes, period)
}

/// EMA over an arbitrary fully-defined input.
pub fn ema_values(input: &[f64], period: usize) -> Values {
    let mut values = vec![None; input.len()];
    if period == 0 || input.len() < period {
        return values;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = input[..period].iter().sum::<f64>() / period as f64;
    values[period - 1] = Some(ema);

    for i in period..input.len() {
        ema = input[i] * k + ema * (1.0 - k);
        values[i] = Some(ema);
    }

    values
}

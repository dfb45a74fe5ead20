//! Average True Range with Wilder's smoothing.
//!
//! TR[0] = high - low (no prior close); seed = mean of the first n true ranges,
//! then ATR[i] = (ATR[i-1] * (n-1) + TR[i]) / n.

use crate::domain::indicator::Values;
use crate::domain::ohlcv::Bar;

pub const DEFAULT_PERIOD: usize = 14;

pub fn calculate_atr(bars: &[Bar], period: usize) -> Values {
    let mut values = vec![None; bars.len()];
    if period == 0 || bars.len() < period {
        return values;
    }

    let tr_values: Vec<f64> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.high - bar.low
            } else {
                bar.true_range(bars[i - 1].close)
            }
        })
        .collect();

    let n = period as f64;
    let mut atr = tr_values[..period].iter().sum::<f64>() / n;
    values[period - 1] = Some(atr);

    for i in period..bars.len() {
        atr = (atr * (n - 1.0) + tr_values[i]) / n;
        values[i] = Some(atr);
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bar(day: u32, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 1000,
        }
    }

    #[test]
    fn atr_basic() {
        let bars: Vec<Bar> = (0..5).map(|i| make_bar(i + 1, 110.0, 90.0, 100.0)).collect();

        let values = calculate_atr(&bars, 3);
        assert_eq!(values.len(), 5);

        assert!(values[0].is_none());
        assert!(values[1].is_none());
        assert!(values[2].is_some());
        assert!(values[3].is_some());
        assert!(values[4].is_some());
    }

    #[test]
    fn atr_seed_is_average() {
        let bars = vec![
            make_bar(1, 110.0, 100.0, 105.0),
            make_bar(2, 115.0, 105.0, 110.0),
            make_bar(3, 120.0, 110.0, 115.0),
        ];

        let values = calculate_atr(&bars, 3);
        let expected = (10.0 + 10.0 + 10.0) / 3.0;
        assert!((values[2].unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn atr_wilder_smoothing() {
        let bars = vec![
            make_bar(1, 110.0, 100.0, 105.0),
            make_bar(2, 115.0, 105.0, 110.0),
            make_bar(3, 120.0, 110.0, 115.0),
            make_bar(4, 125.0, 115.0, 120.0),
        ];

        let values = calculate_atr(&bars, 3);
        let seed = 10.0;
        let expected = (seed * 2.0 + 10.0) / 3.0;
        assert!((values[3].unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn atr_insufficient_bars() {
        let bars: Vec<Bar> = (0..2).map(|i| make_bar(i + 1, 110.0, 90.0, 100.0)).collect();
        let values = calculate_atr(&bars, 5);
        assert_eq!(values, vec![None, None]);
    }

    #[test]
    fn atr_handles_gaps() {
        let bars = vec![
            make_bar(1, 110.0, 100.0, 105.0),
            make_bar(2, 130.0, 120.0, 125.0),
            make_bar(3, 120.0, 110.0, 115.0),
        ];

        let values = calculate_atr(&bars, 2);
        assert!(values[0].is_none());
        // TR[1] = max(10, |130-105|, |120-105|) = 25 → seed (10 + 25) / 2
        assert!((values[1].unwrap() - 17.5).abs() < 1e-9);
        assert!(values[2].is_some());
    }
}

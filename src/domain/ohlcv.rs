//! OHLCV bar representation.

use crate::domain::error::SwingscanError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl Bar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

/// Dates must be strictly increasing and every price finite.
pub fn validate_bars(bars: &[Bar]) -> Result<(), SwingscanError> {
    for (i, bar) in bars.iter().enumerate() {
        let prices = [bar.open, bar.high, bar.low, bar.close];
        if prices.iter().any(|p| !p.is_finite()) {
            return Err(SwingscanError::InvalidBars {
                reason: format!("non-finite price on {}", bar.date),
            });
        }
        if bar.low > bar.high {
            return Err(SwingscanError::InvalidBars {
                reason: format!("low above high on {}", bar.date),
            });
        }
        if i > 0 && bar.date <= bars[i - 1].date {
            return Err(SwingscanError::InvalidBars {
                reason: format!(
                    "dates not strictly increasing: {} follows {}",
                    bar.date,
                    bars[i - 1].date
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar(day: u32) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: 100.0,
            high: 110.0,
            low: 90.0,
            close: 105.0,
            volume: 50_000,
        }
    }

    #[test]
    fn true_range_hl_dominates() {
        let bar = sample_bar(15);
        // high-low=20, |high-100|=10, |low-100|=10 → 20
        assert!((bar.true_range(100.0) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let bar = sample_bar(15);
        // high-low=20, |110-70|=40, |90-70|=20 → 40
        assert!((bar.true_range(70.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_down() {
        let bar = sample_bar(15);
        assert!((bar.true_range(130.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn validate_accepts_increasing_dates() {
        let bars = vec![sample_bar(1), sample_bar(2), sample_bar(3)];
        assert!(validate_bars(&bars).is_ok());
        assert!(validate_bars(&[]).is_ok());
    }

    #[test]
    fn validate_rejects_duplicate_dates() {
        let bars = vec![sample_bar(1), sample_bar(2), sample_bar(2)];
        assert!(matches!(
            validate_bars(&bars),
            Err(SwingscanError::InvalidBars { .. })
        ));
    }

    #[test]
    fn validate_rejects_out_of_order() {
        let bars = vec![sample_bar(3), sample_bar(1)];
        assert!(validate_bars(&bars).is_err());
    }

    #[test]
    fn validate_rejects_nan_close() {
        let mut bar = sample_bar(1);
        bar.close = f64::NAN;
        assert!(validate_bars(&[bar]).is_err());
    }
}

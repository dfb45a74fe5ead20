//! ADX (Average Directional Index) with Wilder's smoothing.
//!
//! +DM = up-move when it exceeds the down-move (else 0), -DM symmetrically.
//! Smoothed TR/+DM/-DM are seeded with the sum of the first n movements, then
//! S[i] = S[i-1] - S[i-1]/n + x[i].
//! +DI = 100 * S(+DM) / S(TR), -DI likewise, DX = 100 * |+DI - -DI| / (+DI + -DI).
//! ADX is seeded with the mean of the first n DX values, then Wilder-smoothed.
//!
//! Warmup: +DI/-DI defined from index n, ADX from index 2n-1.

use crate::domain::indicator::Values;
use crate::domain::ohlcv::Bar;

pub const DEFAULT_PERIOD: usize = 14;

#[derive(Debug, Clone)]
pub struct AdxColumns {
    pub adx: Values,
    pub plus_di: Values,
    pub minus_di: Values,
}

pub fn calculate_adx(bars: &[Bar], period: usize) -> AdxColumns {
    let len = bars.len();
    let mut columns = AdxColumns {
        adx: vec![None; len],
        plus_di: vec![None; len],
        minus_di: vec![None; len],
    };
    if period == 0 || len <= period {
        return columns;
    }

    let mut tr = vec![0.0; len];
    let mut plus_dm = vec![0.0; len];
    let mut minus_dm = vec![0.0; len];
    for i in 1..len {
        tr[i] = bars[i].true_range(bars[i - 1].close);
        let up = bars[i].high - bars[i - 1].high;
        let down = bars[i - 1].low - bars[i].low;
        if up > down && up > 0.0 {
            plus_dm[i] = up;
        }
        if down > up && down > 0.0 {
            minus_dm[i] = down;
        }
    }

    let n = period as f64;
    let mut smooth_tr: f64 = tr[1..=period].iter().sum();
    let mut smooth_plus: f64 = plus_dm[1..=period].iter().sum();
    let mut smooth_minus: f64 = minus_dm[1..=period].iter().sum();

    let mut dx = vec![0.0; len];
    for i in period..len {
        if i > period {
            smooth_tr = smooth_tr - smooth_tr / n + tr[i];
            smooth_plus = smooth_plus - smooth_plus / n + plus_dm[i];
            smooth_minus = smooth_minus - smooth_minus / n + minus_dm[i];
        }

        let (plus_di, minus_di) = if smooth_tr > 0.0 {
            (100.0 * smooth_plus / smooth_tr, 100.0 * smooth_minus / smooth_tr)
        } else {
            (0.0, 0.0)
        };
        columns.plus_di[i] = Some(plus_di);
        columns.minus_di[i] = Some(minus_di);

        let di_sum = plus_di + minus_di;
        dx[i] = if di_sum > 0.0 {
            100.0 * (plus_di - minus_di).abs() / di_sum
        } else {
            0.0
        };
    }

    let first = 2 * period - 1;
    if len > first {
        let mut adx = dx[period..=first].iter().sum::<f64>() / n;
        columns.adx[first] = Some(adx);
        for i in (first + 1)..len {
            adx = (adx * (n - 1.0) + dx[i]) / n;
            columns.adx[i] = Some(adx);
        }
    }

    columns
}

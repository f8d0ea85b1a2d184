//! Price-range lookbacks.
//!
//! - `HIGH_OF(n)`: highest high over the last n bars, current bar included
//! - `LOW_OF(n)`: lowest low over the last n bars
//! - `RANGE_POSITION(n, skip)`: where the close sits inside the high/low
//!   range of the n bars ending `skip` bars ago, 0.0 at the low and 1.0 at
//!   the high (0.5 when the range is flat)

use crate::domain::context::DataContext;
use crate::domain::error::EvalError;
use crate::domain::indicator::{count_param, period_param, ResultSeries};
use crate::domain::market::Candle;

fn window_extremes(candles: &[Candle], end: usize, period: usize) -> (f64, f64) {
    let window = &candles[end + 1 - period..=end];
    let high = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    let low = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
    (high, low)
}

pub fn high_of(candles: &[Candle], period: usize) -> Vec<f64> {
    (0..candles.len())
        .map(|i| {
            if period == 0 || i + 1 < period {
                f64::NAN
            } else {
                window_extremes(candles, i, period).0
            }
        })
        .collect()
}

pub fn low_of(candles: &[Candle], period: usize) -> Vec<f64> {
    (0..candles.len())
        .map(|i| {
            if period == 0 || i + 1 < period {
                f64::NAN
            } else {
                window_extremes(candles, i, period).1
            }
        })
        .collect()
}

pub fn range_position(candles: &[Candle], period: usize, skip: usize) -> Vec<f64> {
    (0..candles.len())
        .map(|i| {
            if period == 0 || i + 1 < period.saturating_add(skip) {
                return f64::NAN;
            }
            let (high, low) = window_extremes(candles, i - skip, period);
            let range = high - low;
            if range == 0.0 {
                0.5
            } else {
                (candles[i].close - low) / range
            }
        })
        .collect()
}

pub fn compute_high_of(ctx: &DataContext<'_>, params: &[f64]) -> Result<ResultSeries, EvalError> {
    let period = period_param("HIGH_OF", params, 0)?;
    Ok(ResultSeries::Flat(high_of(ctx.candles, period)))
}

pub fn compute_low_of(ctx: &DataContext<'_>, params: &[f64]) -> Result<ResultSeries, EvalError> {
    let period = period_param("LOW_OF", params, 0)?;
    Ok(ResultSeries::Flat(low_of(ctx.candles, period)))
}

pub fn compute_range_position(
    ctx: &DataContext<'_>,
    params: &[f64],
) -> Result<ResultSeries, EvalError> {
    let period = period_param("RANGE_POSITION", params, 0)?;
    let skip = if params.len() > 1 {
        count_param("RANGE_POSITION", params, 1)?
    } else {
        0
    };
    Ok(ResultSeries::Flat(range_position(ctx.candles, period, skip)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::candle;
    use approx::assert_relative_eq;

    fn candles() -> Vec<Candle> {
        vec![
            candle(0, 10.0, 12.0, 9.0, 11.0, 1.0),
            candle(1, 11.0, 15.0, 10.0, 14.0, 1.0),
            candle(2, 14.0, 14.0, 8.0, 9.0, 1.0),
            candle(3, 9.0, 11.0, 9.0, 10.0, 1.0),
        ]
    }

    #[test]
    fn high_and_low_of() {
        let c = candles();
        let highs = high_of(&c, 2);
        let lows = low_of(&c, 2);
        assert!(highs[0].is_nan());
        assert_eq!(highs[1], 15.0);
        assert_eq!(highs[3], 14.0);
        assert_eq!(lows[2], 8.0);
        assert_eq!(lows[3], 8.0);
    }

    #[test]
    fn range_position_with_skip() {
        let c = candles();
        let current = range_position(&c, 2, 0);
        // bars 2..=3: high 14, low 8, close 10
        assert_relative_eq!(current[3], 2.0 / 6.0);

        let skipped = range_position(&c, 2, 1);
        assert!(skipped[1].is_nan());
        // bars 1..=2: high 15, low 8, close[3] 10
        assert_relative_eq!(skipped[3], 2.0 / 7.0);
    }

    #[test]
    fn range_position_flat_is_half() {
        let c: Vec<Candle> = (0..3).map(|i| candle(i, 5.0, 5.0, 5.0, 5.0, 1.0)).collect();
        assert_eq!(range_position(&c, 2, 0)[2], 0.5);
    }

    #[test]
    fn huge_skip_is_all_warm_up() {
        let out = range_position(&candles(), 2, usize::MAX);
        assert!(out.iter().all(|v| v.is_nan()));
    }
}

//! Average True Range with Wilder smoothing.
//!
//! TR[0] = high - low, TR[i] = max(H-L, |H-C[i-1]|, |L-C[i-1]|).
//! Seed: mean of the first n TRs, then ATR = (prev * (n-1) + TR) / n.

use crate::domain::context::DataContext;
use crate::domain::error::EvalError;
use crate::domain::indicator::{period_param, ResultSeries};
use crate::domain::market::Candle;

pub fn true_ranges(candles: &[Candle]) -> Vec<f64> {
    candles
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if i == 0 {
                c.range()
            } else {
                c.true_range(candles[i - 1].close)
            }
        })
        .collect()
}

pub fn atr(candles: &[Candle], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; candles.len()];
    if period == 0 || candles.len() < period {
        return out;
    }
    let tr = true_ranges(candles);
    let mut value = tr[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = value;
    for i in period..candles.len() {
        value = (value * (period - 1) as f64 + tr[i]) / period as f64;
        out[i] = value;
    }
    out
}

pub fn compute(ctx: &DataContext<'_>, params: &[f64]) -> Result<ResultSeries, EvalError> {
    let period = period_param("ATR", params, 0)?;
    Ok(ResultSeries::Flat(atr(ctx.candles, period)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::candle;
    use approx::assert_relative_eq;

    #[test]
    fn atr_warmup() {
        let candles: Vec<Candle> = (0..5).map(|i| candle(i, 100.0, 110.0, 90.0, 100.0, 1.0)).collect();
        let out = atr(&candles, 3);
        assert!(out[0].is_nan());
        assert!(out[1].is_nan());
        assert_relative_eq!(out[2], 20.0);
        assert_relative_eq!(out[4], 20.0);
    }

    #[test]
    fn atr_seed_is_average() {
        let candles = vec![
            candle(0, 105.0, 110.0, 100.0, 105.0, 1.0),
            candle(1, 110.0, 115.0, 105.0, 110.0, 1.0),
            candle(2, 115.0, 120.0, 110.0, 115.0, 1.0),
        ];
        let out = atr(&candles, 3);
        // TRs: 10, max(10, 10, 0) = 10, max(10, 10, 0) = 10
        assert_relative_eq!(out[2], 10.0);
    }

    #[test]
    fn true_range_uses_gap() {
        let candles = vec![
            candle(0, 100.0, 101.0, 99.0, 100.0, 1.0),
            candle(1, 110.0, 112.0, 108.0, 111.0, 1.0),
        ];
        let tr = true_ranges(&candles);
        assert_relative_eq!(tr[0], 2.0);
        assert_relative_eq!(tr[1], 12.0);
    }

    #[test]
    fn atr_wilder_step() {
        let candles = vec![
            candle(0, 10.0, 12.0, 10.0, 11.0, 1.0),
            candle(1, 11.0, 12.0, 10.0, 11.0, 1.0),
            candle(2, 11.0, 15.0, 11.0, 14.0, 1.0),
        ];
        let out = atr(&candles, 2);
        assert_relative_eq!(out[1], 2.0);
        assert_relative_eq!(out[2], (2.0 + 4.0) / 2.0);
    }
}

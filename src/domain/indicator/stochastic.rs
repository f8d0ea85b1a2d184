//! Stochastic oscillator.
//!
//! %K = (C - lowest low(k)) / (highest high(k) - lowest low(k)) * 100
//! %D = SMA(d) of %K. A flat window yields %K = 50.

use crate::domain::context::DataContext;
use crate::domain::error::EvalError;
use crate::domain::indicator::{period_param, sma, ResultSeries};
use crate::domain::market::Candle;

pub fn stochastic(candles: &[Candle], k_period: usize, d_period: usize) -> (Vec<f64>, Vec<f64>) {
    let mut k = vec![f64::NAN; candles.len()];
    if k_period > 0 {
        for i in (k_period - 1)..candles.len() {
            let window = &candles[i + 1 - k_period..=i];
            let high = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
            let low = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
            let range = high - low;
            k[i] = if range == 0.0 {
                50.0
            } else {
                (candles[i].close - low) / range * 100.0
            };
        }
    }
    let d = smooth(&k, d_period);
    (k, d)
}

/// SMA over the defined part of a series with leading NaN.
fn smooth(values: &[f64], period: usize) -> Vec<f64> {
    let start = values.iter().position(|v| !v.is_nan()).unwrap_or(values.len());
    let mut out = vec![f64::NAN; start];
    out.extend(sma(&values[start..], period));
    out
}

pub fn compute(ctx: &DataContext<'_>, params: &[f64]) -> Result<ResultSeries, EvalError> {
    let k_period = period_param("STOCHASTIC", params, 0)?;
    let d_period = if params.len() > 1 {
        period_param("STOCHASTIC", params, 1)?
    } else {
        3
    };
    let (k, d) = stochastic(ctx.candles, k_period, d_period);
    Ok(ResultSeries::Composite(vec![("k", k), ("d", d)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::candle;
    use approx::assert_relative_eq;

    #[test]
    fn stochastic_k_and_d() {
        let candles = vec![
            candle(0, 10.0, 12.0, 8.0, 10.0, 1.0),
            candle(1, 10.0, 14.0, 9.0, 13.0, 1.0),
            candle(2, 13.0, 15.0, 10.0, 11.0, 1.0),
            candle(3, 11.0, 13.0, 7.0, 12.0, 1.0),
        ];
        let (k, d) = stochastic(&candles, 2, 2);
        assert!(k[0].is_nan());
        // window 0..=1: high 14, low 8, close 13
        assert_relative_eq!(k[1], 5.0 / 6.0 * 100.0);
        // window 1..=2: high 15, low 9, close 11
        assert_relative_eq!(k[2], 2.0 / 6.0 * 100.0);
        assert!(d[1].is_nan());
        assert_relative_eq!(d[2], (k[1] + k[2]) / 2.0);
    }

    #[test]
    fn stochastic_flat_window_is_50() {
        let candles: Vec<Candle> = (0..3).map(|i| candle(i, 5.0, 5.0, 5.0, 5.0, 1.0)).collect();
        let (k, _) = stochastic(&candles, 2, 3);
        assert_relative_eq!(k[2], 50.0);
    }
}

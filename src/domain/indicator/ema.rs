//! Exponential Moving Average.
//!
//! k = 2/(n+1), seed with the first SMA, then EMA[i] = P[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) values are NaN. Leading NaN in the input (e.g. an
//! upstream warm-up) shifts the seed to the first n finite values.

use crate::domain::context::DataContext;
use crate::domain::error::EvalError;
use crate::domain::indicator::{closes, period_param, ResultSeries};

pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }
    let Some(start) = values.iter().position(|v| !v.is_nan()) else {
        return out;
    };

    let k = 2.0 / (period as f64 + 1.0);
    let mut sum = 0.0;
    let mut ema = 0.0;

    for (n, i) in (start..values.len()).enumerate() {
        let value = values[i];
        if n < period - 1 {
            sum += value;
        } else if n == period - 1 {
            sum += value;
            ema = sum / period as f64;
            out[i] = ema;
        } else {
            ema = value * k + ema * (1.0 - k);
            out[i] = ema;
        }
    }
    out
}

pub fn compute(ctx: &DataContext<'_>, params: &[f64]) -> Result<ResultSeries, EvalError> {
    let period = period_param("EMA", params, 0)?;
    Ok(ResultSeries::Flat(ema(&closes(ctx), period)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ema_warmup() {
        let out = ema(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);
        assert!(out[0].is_nan());
        assert!(out[1].is_nan());
        assert!(!out[2].is_nan());
        assert!(!out[4].is_nan());
    }

    #[test]
    fn ema_period_1() {
        let out = ema(&[10.0, 20.0, 30.0], 1);
        assert_relative_eq!(out[0], 10.0);
        assert_relative_eq!(out[1], 20.0);
        assert_relative_eq!(out[2], 30.0);
    }

    #[test]
    fn ema_seed_is_sma() {
        let out = ema(&[10.0, 20.0, 30.0], 3);
        assert_relative_eq!(out[2], 20.0);
    }

    #[test]
    fn ema_smoothing() {
        let out = ema(&[10.0, 20.0, 30.0, 40.0], 3);
        // seed 20, k = 0.5
        assert_relative_eq!(out[3], 40.0 * 0.5 + 20.0 * 0.5);
    }

    #[test]
    fn ema_skips_leading_nan() {
        let out = ema(&[f64::NAN, f64::NAN, 2.0, 4.0, 6.0], 2);
        assert!(out[2].is_nan());
        assert_relative_eq!(out[3], 3.0);
        assert_relative_eq!(out[4], 6.0 * (2.0 / 3.0) + 3.0 / 3.0);
    }
}

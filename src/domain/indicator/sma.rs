//! Simple Moving Average.
//!
//! SMA(n)[i] = mean(P[i-n+1..=i]), computed with a running sum.
//! Warmup: first (n-1) bars are NaN.

use crate::domain::context::DataContext;
use crate::domain::error::EvalError;
use crate::domain::indicator::{closes, period_param, ResultSeries};

pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }
    let mut sum = 0.0;
    for (i, value) in values.iter().enumerate() {
        sum += value;
        if i >= period {
            sum -= values[i - period];
        }
        if i + 1 >= period {
            out[i] = sum / period as f64;
        }
    }
    out
}

pub fn compute(ctx: &DataContext<'_>, params: &[f64]) -> Result<ResultSeries, EvalError> {
    let period = period_param("SMA", params, 0)?;
    Ok(ResultSeries::Flat(sma(&closes(ctx), period)))
}

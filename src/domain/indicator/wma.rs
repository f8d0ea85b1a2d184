//! Weighted Moving Average.
//!
//! O(n) sliding window using the running weighted-sum technique.
//! WMA(n) = (1*P[i-n+1] + 2*P[i-n+2] + ... + n*P[i]) / (n*(n+1)/2)
//! Warmup: first (n-1) bars are NaN.

use crate::domain::context::DataContext;
use crate::domain::error::EvalError;
use crate::domain::indicator::{closes, period_param, ResultSeries};

pub fn wma(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }
    let p = period as f64;
    let divisor = p * (p + 1.0) / 2.0;
    let mut weighted_sum = 0.0;
    let mut window_sum = 0.0;

    for (i, &value) in values.iter().enumerate() {
        if i < period {
            weighted_sum += (i + 1) as f64 * value;
            window_sum += value;
        } else {
            weighted_sum += period as f64 * value - window_sum;
            window_sum += value - values[i - period];
        }
        if i + 1 >= period {
            out[i] = weighted_sum / divisor;
        }
    }
    out
}

pub fn compute(ctx: &DataContext<'_>, params: &[f64]) -> Result<ResultSeries, EvalError> {
    let period = period_param("WMA", params, 0)?;
    Ok(ResultSeries::Flat(wma(&closes(ctx), period)))
}

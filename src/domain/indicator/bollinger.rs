//! Bollinger Bands.
//!
//! - Middle: SMA over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! StdDev is the population standard deviation (divides by N, not N-1).
//! Warmup: first (period-1) bars are NaN.

use crate::domain::context::DataContext;
use crate::domain::error::EvalError;
use crate::domain::indicator::stddev::stddev;
use crate::domain::indicator::{closes, period_param, positive_param, sma, ResultSeries};

pub struct Bands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

pub fn bollinger(values: &[f64], period: usize, multiplier: f64) -> Bands {
    let middle = sma(values, period);
    let deviation = stddev(values, period);
    let upper = middle
        .iter()
        .zip(&deviation)
        .map(|(m, d)| m + multiplier * d)
        .collect();
    let lower = middle
        .iter()
        .zip(&deviation)
        .map(|(m, d)| m - multiplier * d)
        .collect();
    Bands {
        upper,
        middle,
        lower,
    }
}

pub fn compute(ctx: &DataContext<'_>, params: &[f64]) -> Result<ResultSeries, EvalError> {
    let period = period_param("BBANDS", params, 0)?;
    let multiplier = positive_param("BBANDS", params, 1)?;
    let bands = bollinger(&closes(ctx), period, multiplier);
    Ok(ResultSeries::Composite(vec![
        ("upper", bands.upper),
        ("middle", bands.middle),
        ("lower", bands.lower),
    ]))
}

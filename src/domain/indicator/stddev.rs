//! Standard Deviation.
//!
//! Population standard deviation over n closing prices (divides by N).
//! Warmup: first (n-1) bars are NaN.

use crate::domain::context::DataContext;
use crate::domain::error::EvalError;
use crate::domain::indicator::{closes, period_param, rolling, ResultSeries};

pub fn population_stddev(window: &[f64]) -> f64 {
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let variance = window.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    variance.sqrt()
}

pub fn stddev(values: &[f64], period: usize) -> Vec<f64> {
    rolling(values, period, population_stddev)
}

pub fn compute(ctx: &DataContext<'_>, params: &[f64]) -> Result<ResultSeries, EvalError> {
    let period = period_param("STDDEV", params, 0)?;
    Ok(ResultSeries::Flat(stddev(&closes(ctx), period)))
}
